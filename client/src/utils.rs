use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use url::Url;

/// SHA-256 over the file name and size, cheap enough for multi-GB media.
pub fn compute_media_fingerprint<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid media file name: {}", path.display()))?;
    let size = std::fs::metadata(path)
        .with_context(|| format!("Cannot read media file {}", path.display()))?
        .len();

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(size.to_le_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Resolve `segment` under the base URL's path, keeping any prefix
/// (`http://h/watch` + `rooms` -> `http://h/watch/rooms`).
pub fn endpoint_url(base: &Url, segment: &str) -> Result<Url> {
    let mut dir = base.clone();
    dir.set_query(None);
    dir.set_fragment(None);
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir.join(segment)
        .with_context(|| format!("Cannot resolve {segment} against {base}"))
}

/// `http(s)://host[:port][/prefix]` to the server's `ws(s)://.../ws` endpoint
pub fn ws_url_from_http(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("Unsupported server scheme: {other}"),
    };

    let mut ws = endpoint_url(base, "ws")?;
    ws.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot switch {base} to {scheme}"))?;
    Ok(ws)
}

/// Format seconds into MM:SS or HH:MM:SS
pub fn format_time(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
