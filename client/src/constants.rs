use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3005";

/// Overrides `DEFAULT_SERVER_URL` when `--server` is not given
pub const SERVER_URL_ENV: &str = "TANDEM_SERVER";

pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(12);
