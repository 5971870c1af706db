//! Debounced metadata write-back.
//!
//! Every control-plane mutation marks its theme dirty; the saver task
//! coalesces marks so each theme's metadata.json is written at most once per
//! second no matter how fast a UI slider fires.

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, warn};

use crate::registry::ThemeRegistry;

/// Delay between the first mark and the actual write.
const DEBOUNCE: Duration = Duration::from_millis(1000);

/// Poll granularity of the saver loop.
const TICK: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct MetadataSaver {
    tx: mpsc::UnboundedSender<String>,
}

impl MetadataSaver {
    /// Spawns the saver task over a registry.
    ///
    /// With `enabled = false` (config `audio.persist_metadata: false`) marks
    /// are accepted and dropped, which keeps call sites unconditional.
    pub fn spawn(registry: Arc<ThemeRegistry>, enabled: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        if enabled {
            tokio::spawn(run(registry, rx));
        }
        Self { tx }
    }

    /// Marks a theme's metadata dirty.
    pub fn mark(&self, theme_id: &str) {
        // Send only fails when the saver is disabled or shutting down.
        let _ = self.tx.send(theme_id.to_string());
    }
}

async fn run(registry: Arc<ThemeRegistry>, mut rx: mpsc::UnboundedReceiver<String>) {
    let mut pending: HashMap<String, Instant> = HashMap::new();

    loop {
        tokio::select! {
            mark = rx.recv() => {
                match mark {
                    Some(theme_id) => {
                        // First mark sets the deadline; repeats within the
                        // window do not push it back.
                        pending
                            .entry(theme_id)
                            .or_insert_with(|| Instant::now() + DEBOUNCE);
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(TICK), if !pending.is_empty() => {}
        }

        let now = Instant::now();
        let due: Vec<String> = pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for theme_id in due {
            pending.remove(&theme_id);
            let registry = registry.clone();
            let id = theme_id.clone();
            let result =
                tokio::task::spawn_blocking(move || registry.write_metadata(&id)).await;
            match result {
                Ok(Ok(())) => debug!(theme = %theme_id, "Persisted metadata.json"),
                Ok(Err(err)) => {
                    warn!(theme = %theme_id, error = %err, "Metadata write-back failed")
                }
                Err(err) => warn!(theme = %theme_id, error = %err, "Metadata writer panicked"),
            }
        }
    }

    // Channel closed: flush whatever is still pending.
    for (theme_id, _) in pending {
        if let Err(err) = registry.write_metadata(&theme_id) {
            warn!(theme = %theme_id, error = %err, "Final metadata write-back failed");
        }
    }
}
