//! Operator console on stdin.
//!
//! A privileged frontend over the relay registry: read-only snapshot
//! queries (counts, room listings, stats), the process-wide quiet toggle,
//! and the same message/disable operations a client packet could trigger,
//! aimed at arbitrary sessions. Replies go straight to stdout; the console
//! is interactive, not a log stream.

use crate::stats::FileStats;
use relay_server::{Relay, SessionId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

const HELP: &str = "Available commands:
help: Show this help message
stats: Print server stats
quiet: Toggle quiet mode
roomCount: Show the number of rooms
clientCount: Show the number of clients
list: List all rooms and clients
stop: Stop the server
message <clientId> <message>: Send a message to a client
messageAll <message>: Send a message to all clients
disable <clientId> <message>: Disable anchor on a client
disableAll <message>: Disable anchor on all clients";

/// Spawns the console task reading operator commands from stdin.
pub fn spawn_console(relay: Arc<Relay>, stats: Arc<FileStats>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => handle_command(line.trim(), &relay, &stats).await,
                // stdin closed: the server keeps running without a console
                Ok(None) => return,
                Err(e) => warn!("error reading from stdin: {e}"),
            }
        }
    })
}

async fn handle_command(line: &str, relay: &Arc<Relay>, stats: &Arc<FileStats>) {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return;
    };

    match command {
        "roomCount" => println!("Room count: {}", relay.room_count().await),
        "clientCount" => println!("Client count: {}", relay.session_count().await),
        "quiet" => println!("Quiet mode: {}", relay.toggle_quiet_mode()),
        "stats" => {
            let snapshot = stats.snapshot();
            println!("Current Stats:");
            println!("    lastStatsHeartbeat: {}", snapshot.last_stats_heartbeat);
            println!("    onlineCount: {}", snapshot.online_count);
            println!("    gamesCompleted: {}", snapshot.games_completed);
            println!("    pid: {}", snapshot.pid);
        }
        "list" => {
            for room in relay.rooms_snapshot().await {
                println!("Room {}:", room.id());
                for member in room.members_snapshot().await {
                    let data = Value::Object(member.data_snapshot().await);
                    println!("  Client {}: {}", member.id(), data);
                }
            }
        }
        "message" => match parse_target(&mut parts) {
            Some(target) => {
                let message = remainder(parts);
                if relay.message_session(target, &message).await {
                    println!("[Server] SERVER_MESSAGE packet -> {target}");
                } else {
                    println!("Client {target} not found");
                }
            }
            None => println!("Usage: message <clientId> <message>"),
        },
        "messageAll" => {
            println!("[Server] SERVER_MESSAGE packet -> All");
            relay.message_all(&remainder(parts)).await;
        }
        "disable" => match parse_target(&mut parts) {
            Some(target) => {
                let message = remainder(parts);
                if relay.disable_session(target, &message).await {
                    println!("[Server] DISABLE_ANCHOR packet -> {target}");
                } else {
                    println!("Client {target} not found");
                }
            }
            None => println!("Usage: disable <clientId> <message>"),
        },
        "disableAll" => {
            println!("[Server] DISABLE_ANCHOR packet -> All");
            relay.disable_all(&remainder(parts)).await;
        }
        "stop" => {
            relay.message_all("Server restarting. Check back in a bit!").await;
            stats.reset_online();
            if let Err(e) = stats.persist().await {
                warn!("error writing stats file: {e}");
            }
            // Give the outbound notices a moment to reach the sockets.
            tokio::time::sleep(Duration::from_millis(250)).await;
            std::process::exit(0);
        }
        _ => println!("{HELP}"),
    }
}

fn parse_target<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Option<SessionId> {
    parts.next()?.parse().ok()
}

fn remainder<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}
