//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - Reloads go through the same loader and validation as startup
//! - A reload equal to the running config is dropped; editors often emit
//!   several events per save
//! - Settings bound at startup are reported when they change, the running
//!   server keeps their old values

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Watches the relay config file and forwards accepted reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    /// Last configuration handed to the server.
    current: RelayConfig,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration the server starts with.
    pub fn new(path: &Path, current: RelayConfig) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive for updates
    /// to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let new_config = match load_config(&path) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::error!(error = %e, "Config reload rejected, keeping current configuration");
                            return;
                        }
                    };
                    if new_config == current {
                        tracing::debug!(path = ?path, "Config file touched without changes");
                        return;
                    }

                    let pending = restart_required(&current, &new_config);
                    if !pending.is_empty() {
                        tracing::warn!(
                            settings = ?pending,
                            "Reloaded settings only take effect after a restart"
                        );
                    }

                    current = new_config.clone();
                    if update_tx.send(new_config).is_err() {
                        tracing::debug!("Server stopped, dropping config reload");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

/// Settings that differ between `old` and `new` but are fixed once the
/// server runs: the bound listener, the timeout layer, the origin client
/// and the installed subscriber and exporter.
pub fn restart_required(old: &RelayConfig, new: &RelayConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if old.listener != new.listener {
        changed.push("listener");
    }
    if old.server.request_timeout_secs != new.server.request_timeout_secs {
        changed.push("server.request_timeout_secs");
    }
    if old.download != new.download {
        changed.push("download");
    }
    if old.observability != new.observability {
        changed.push("observability");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn live_sections_need_no_restart() {
        let old = RelayConfig::default();
        let mut new = old.clone();
        new.server.path_prefix = "/img".into();
        new.server.base_url = "https://cdn.example.com/".into();
        new.cookies.passthrough = true;
        new.cache.ttl_secs = 60;

        assert!(restart_required(&old, &new).is_empty());
    }

    #[test]
    fn startup_sections_are_reported() {
        let old = RelayConfig::default();
        let mut new = old.clone();
        new.listener.bind_address = "127.0.0.1:9999".into();
        new.server.request_timeout_secs = 5;
        new.download.max_redirects = 0;
        new.observability.log_level = "debug".into();

        assert_eq!(
            restart_required(&old, &new),
            vec!["listener", "server.request_timeout_secs", "download", "observability"]
        );
    }

    #[tokio::test]
    async fn forwards_changed_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nttl_secs = 60").unwrap();
        let initial = load_config(file.path()).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(file.path(), initial);
        let _handle = watcher.run().unwrap();

        std::fs::write(file.path(), "[cache]\nttl_secs = 120\n").unwrap();

        // A save can surface as several events, some seeing a partial file.
        let reloaded = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(config) = updates.recv().await {
                if config.cache.ttl_secs == 120 {
                    return Some(config);
                }
            }
            None
        })
        .await
        .unwrap();

        assert_eq!(reloaded.unwrap().cache.ttl_secs, 120);
    }
}
