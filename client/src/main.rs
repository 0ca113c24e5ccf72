mod console;
mod constants;
mod player;
mod protocol;
mod sync;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use url::Url;

use console::{Args, ConsoleCommand, Mode};
use player::LocalPlayer;
use protocol::{CreateRoomRequest, CreatedRoom, ServerEvent};
use sync::SyncClient;
use utils::{compute_media_fingerprint, endpoint_url, format_time, ws_url_from_http};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tandem_client=debug,info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let base = Url::parse(&args.server)
        .with_context(|| format!("Invalid server URL: {}", args.server))?;

    let (room_id, as_host) = match args.mode {
        Mode::Create { media } => {
            let room_id = create_room(&base, &media).await?;
            println!("Room created: {room_id}");
            (room_id, true)
        }
        Mode::Join { room_id, as_host } => (room_id, as_host),
    };

    let player = Arc::new(Mutex::new(LocalPlayer::new()));
    let sync = SyncClient::new();

    let ws_url = ws_url_from_http(&base)?;
    let handler_player = Arc::clone(&player);
    let closed = sync
        .connect(ws_url.as_str(), move |event| {
            handle_server_event(&handler_player, event)
        })
        .await?;
    tracing::info!("Connected to {}", ws_url);

    sync.join_room(&room_id, as_host)?;
    run_console(&sync, &player, &room_id, closed).await
}

async fn create_room(base: &Url, media: &Path) -> Result<String> {
    let fingerprint = compute_media_fingerprint(media)?;
    let video = media
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let url = endpoint_url(base, "rooms")?;
    let created: CreatedRoom = reqwest::Client::new()
        .post(url)
        .json(&CreateRoomRequest {
            video,
            fingerprint: Some(fingerprint),
        })
        .send()
        .await
        .context("Room creation request failed")?
        .error_for_status()
        .context("Server refused to create a room")?
        .json()
        .await
        .context("Malformed room creation response")?;
    Ok(created.room_id)
}

fn handle_server_event(player: &Mutex<LocalPlayer>, event: ServerEvent) {
    let now = local_now_millis();
    let mut player = player.lock();
    match event {
        ServerEvent::Role { role } => {
            player.set_role(role);
            println!("Role: {role:?}");
        }
        ServerEvent::RoomError { message } => {
            println!("Room error: {message}");
        }
        ServerEvent::SyncState(snapshot) => {
            player.apply_snapshot(&snapshot, now);
            println!(
                "Synced: {} at {}",
                if player.is_playing() { "playing" } else { "paused" },
                format_time(player.position_at(now))
            );
        }
        ServerEvent::Control(control) => {
            player.apply_control(&control, now);
            println!(
                "{:?} -> {}",
                control.action,
                format_time(player.position_at(now))
            );
        }
    }
}

async fn run_console(
    sync: &SyncClient,
    player: &Mutex<LocalPlayer>,
    room_id: &str,
    mut closed: oneshot::Receiver<()>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = &mut closed => {
                println!("Disconnected from server");
                return Ok(());
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            ConsoleCommand::Control { action, at } => {
                if !player.lock().is_host() {
                    println!("Only the host controls playback; the server will ignore this");
                }
                let at = at.unwrap_or_else(|| player.lock().position_at(local_now_millis()));
                sync.control(room_id, action, at)?;
            }
            ConsoleCommand::Sync => sync.request_sync(room_id)?,
            ConsoleCommand::Status => print_status(sync, player),
            ConsoleCommand::Quit => return Ok(()),
        }
    }
}

fn print_status(sync: &SyncClient, player: &Mutex<LocalPlayer>) {
    let player = player.lock();
    let stats = sync.stats_snapshot();
    println!(
        "{:?} | {} at {} | host {} | clock offset {} ms | rtt {} | {} msgs ({} B) in / {} msgs ({} B) out | up {:.0}s, last message {:.1}s ago",
        player.role(),
        if player.is_playing() { "playing" } else { "paused" },
        format_time(player.position_at(local_now_millis())),
        player.host_id().unwrap_or("-"),
        player.clock_offset_ms().unwrap_or(0),
        stats
            .last_rtt_ms
            .map(|ms| format!("{ms:.0} ms"))
            .unwrap_or_else(|| "-".into()),
        stats.messages_in,
        stats.bytes_in,
        stats.messages_out,
        stats.bytes_out,
        stats.connected_duration.unwrap_or(0.0),
        stats.last_message_age.unwrap_or(0.0),
    );
}

fn local_now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
