//! File-backed statistics persistence.
//!
//! Implements the relay core's [`StatsSink`] with process-wide counters
//! persisted as pretty-printed JSON. Counter persistence is best-effort:
//! only the periodic heartbeat and the operator `stop` command write the
//! file, so a crash loses at most one interval of counter movement.

use relay_server::StatsSink;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// The on-disk shape of the statistics file. Key casing is part of the
/// format and kept compatible with existing tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsSnapshot {
    /// Unix timestamp of the last persistence heartbeat
    pub last_stats_heartbeat: u64,
    /// Distinct origin fingerprints seen, in first-seen order
    #[serde(rename = "clientSHAs")]
    pub client_shas: Vec<String>,
    /// Sessions currently online
    pub online_count: u64,
    /// Total completed games reported by clients
    pub games_completed: u64,
    /// Process id of the server that wrote the file
    pub pid: u32,
}

/// Aggregate statistics with JSON file persistence.
///
/// Counters are plain atomics so the relay's hot paths never block on the
/// sink; the fingerprint list takes a short std mutex.
#[derive(Debug)]
pub struct FileStats {
    path: PathBuf,
    online: AtomicI64,
    games_completed: AtomicU64,
    client_shas: Mutex<Vec<String>>,
}

impl FileStats {
    /// Creates a sink backed by `path`, seeding the cumulative counters
    /// from an existing file when one is readable. The online count always
    /// starts at zero: it describes this process, not the previous one.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seed = read_snapshot(&path).unwrap_or_default();
        Self {
            path,
            online: AtomicI64::new(0),
            games_completed: AtomicU64::new(seed.games_completed),
            client_shas: Mutex::new(seed.client_shas),
        }
    }

    /// The current counters, stamped with the time and this process's pid.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            last_stats_heartbeat: current_timestamp(),
            client_shas: self.client_shas.lock().unwrap().clone(),
            online_count: self.online.load(Ordering::SeqCst).max(0) as u64,
            games_completed: self.games_completed.load(Ordering::SeqCst),
            pid: std::process::id(),
        }
    }

    /// Writes the current snapshot to the statistics file.
    pub async fn persist(&self) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&self.path, bytes).await
    }

    /// Zeroes the online count, used on shutdown so a restart does not
    /// inherit phantom sessions.
    pub fn reset_online(&self) {
        self.online.store(0, Ordering::SeqCst);
    }

    /// Spawns the persistence heartbeat: writes the file on a fixed
    /// interval for the lifetime of the process.
    pub fn spawn_heartbeat(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let stats = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = stats.persist().await {
                    warn!("error writing stats file {}: {e}", stats.path.display());
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}

impl StatsSink for FileStats {
    fn record_connect(&self) {
        self.online.fetch_add(1, Ordering::SeqCst);
    }

    fn record_disconnect(&self) {
        self.online.fetch_sub(1, Ordering::SeqCst);
    }

    fn record_game_complete(&self) {
        self.games_completed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_origin(&self, fingerprint: &str) {
        let mut shas = self.client_shas.lock().unwrap();
        if !shas.iter().any(|s| s == fingerprint) {
            shas.push(fingerprint.to_string());
        }
    }
}

fn read_snapshot(path: &Path) -> Option<StatsSnapshot> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("error reading stats file {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("error parsing stats file {}: {e}", path.display());
            None
        }
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
