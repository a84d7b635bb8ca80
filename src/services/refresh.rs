//! Refresh cycle service
//!
//! Runs load -> probe -> select on a fixed interval and publishes the result
//! for the rendering side. Cycles never overlap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use crate::models::CycleSummary;
use crate::node::{loader, RotationSelector};

/// Refresh service configuration
#[derive(Clone, Debug)]
pub struct RefreshServiceConfig {
    /// Time between cycle starts
    pub interval: Duration,
    /// Descriptor list read at the start of every cycle
    pub nodes_file: PathBuf,
}

impl Default for RefreshServiceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            nodes_file: PathBuf::from("nodes.txt"),
        }
    }
}

/// Refresh cycle driver
pub struct RefreshService {
    selector: Arc<RotationSelector>,
    config: RefreshServiceConfig,
    publisher: watch::Sender<Option<CycleSummary>>,
}

impl RefreshService {
    pub fn new(selector: Arc<RotationSelector>, config: RefreshServiceConfig) -> Self {
        let (publisher, _) = watch::channel(None);
        Self {
            selector,
            config,
            publisher,
        }
    }

    /// Receiver of each cycle's published summary
    pub fn subscribe(&self) -> watch::Receiver<Option<CycleSummary>> {
        self.publisher.subscribe()
    }

    /// Run cycles until shutdown; the first cycle starts immediately
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting refresh service with {}s interval",
            self.config.interval.as_secs()
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_once().await;
                    info!(
                        "Refresh cycle done, next in {}s",
                        self.config.interval.as_secs()
                    );
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Refresh service shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run a single cycle and publish its outcome
    ///
    /// The cycle runs in its own task; if it panics the failure is logged,
    /// nothing is published and `None` is returned.
    pub async fn refresh_once(&self) -> Option<CycleSummary> {
        let selector = self.selector.clone();
        let nodes_file = self.config.nodes_file.clone();

        let cycle = tokio::spawn(async move {
            let source = loader::load(&nodes_file).await;
            selector.run_cycle(source).await
        });

        match cycle.await {
            Ok(outcome) => {
                let summary = CycleSummary {
                    outcome: outcome.as_str().to_string(),
                    record: outcome.display_record(Local::now()),
                };
                info!(
                    outcome = %outcome,
                    "Publishing {}",
                    summary.record.server_address
                );
                self.publisher.send_replace(Some(summary.clone()));
                Some(summary)
            }
            Err(e) => {
                error!("Refresh cycle aborted: {}", e);
                None
            }
        }
    }
}

/// Handle for managing the refresh service
pub struct RefreshHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl RefreshHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::rotation::MemoryStateStore;
    use crate::node::ReachabilityOracle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const TROJAN_A: &str = "trojan://pw@a.example.org:443#A";
    const TROJAN_B: &str = "trojan://pw@b.example.org:443#B";

    struct AlwaysReachable;

    #[async_trait]
    impl ReachabilityOracle for AlwaysReachable {
        async fn probe(&self, _host: &str, _port: u16) -> bool {
            true
        }
    }

    /// Panics on the first probe, answers normally afterwards
    #[derive(Default)]
    struct PanicsOnce {
        tripped: AtomicBool,
    }

    #[async_trait]
    impl ReachabilityOracle for PanicsOnce {
        async fn probe(&self, _host: &str, _port: u16) -> bool {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("oracle exploded");
            }
            true
        }
    }

    fn service(
        oracle: Arc<dyn ReachabilityOracle>,
        nodes_file: PathBuf,
    ) -> RefreshService {
        let selector = RotationSelector::new(
            oracle,
            Arc::new(MemoryStateStore::new()),
            Duration::ZERO,
        );
        RefreshService::new(
            Arc::new(selector),
            RefreshServiceConfig {
                interval: Duration::from_secs(60),
                nodes_file,
            },
        )
    }

    #[test]
    fn test_config_default() {
        let config = RefreshServiceConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.nodes_file, PathBuf::from("nodes.txt"));
    }

    #[tokio::test]
    async fn test_refresh_once_publishes_selection() {
        let dir = tempfile::tempdir().unwrap();
        let nodes = dir.path().join("nodes.txt");
        tokio::fs::write(&nodes, format!("{}\n{}\n", TROJAN_A, TROJAN_B))
            .await
            .unwrap();

        let service = service(Arc::new(AlwaysReachable), nodes);
        let mut rx = service.subscribe();
        assert!(rx.borrow().is_none());

        let first = service.refresh_once().await.unwrap();
        assert_eq!(first.outcome, "selected");
        assert_eq!(first.record.server_address, "a.example.org");
        assert_eq!(first.record.qr_content, TROJAN_A);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&first));

        let second = service.refresh_once().await.unwrap();
        assert_eq!(second.record.server_address, "b.example.org");
    }

    #[tokio::test]
    async fn test_refresh_once_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(Arc::new(AlwaysReachable), dir.path().join("absent.txt"));

        let summary = service.refresh_once().await.unwrap();
        assert_eq!(summary.outcome, "no_source_file");
        assert_eq!(summary.record.qr_content, "nodes.txt not found");
    }

    #[tokio::test]
    async fn test_panicking_cycle_does_not_stop_service() {
        let dir = tempfile::tempdir().unwrap();
        let nodes = dir.path().join("nodes.txt");
        tokio::fs::write(&nodes, TROJAN_A).await.unwrap();

        let service = service(Arc::new(PanicsOnce::default()), nodes);
        let rx = service.subscribe();

        assert!(service.refresh_once().await.is_none());
        assert!(rx.borrow().is_none());

        let summary = service.refresh_once().await.unwrap();
        assert_eq!(summary.outcome, "selected");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(service(
            Arc::new(AlwaysReachable),
            dir.path().join("nodes.txt"),
        ));
        let mut rx = service.subscribe();
        let (handle, shutdown) = RefreshHandle::new();

        let task = {
            let service = service.clone();
            tokio::spawn(async move { service.run(shutdown).await })
        };

        // first cycle runs immediately
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().as_ref().map(|s| s.outcome.as_str()),
            Some("no_source_file")
        );

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("refresh service did not stop")
            .unwrap();
    }
}
