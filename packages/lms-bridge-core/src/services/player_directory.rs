//! Player discovery and reconciliation.
//!
//! Each discovery cycle issues one `players 0 <page_size>` request and hands
//! every player the registry does not know yet to
//! [`DeviceRegistry::register`]. A cycle that finds no new players performs
//! no RPC beyond the list call and no host side effects.
//!
//! Only one page is requested. When the server reports more players than
//! the page holds, the cycle logs a warning and the extra players stay
//! unmanaged until `page_size` is raised.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::device_registry::{DeviceRegistry, RegistryError};
use crate::error::LmsResult;
use crate::lms::commands::{self, PlayersPage};
use crate::lms::LmsRpc;
use crate::protocol_constants::SERVER_TARGET;
use crate::runtime::TaskSpawner;

/// Outcome of one discovery cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Usable players in the server's reply.
    pub seen: usize,
    /// Entries dropped for lacking an id or a name.
    pub skipped: usize,
    /// Players registered by this cycle.
    pub registered: usize,
    /// The server knows more players than the page returned.
    pub truncated: bool,
}

/// Periodically lists players and registers the new ones.
pub struct PlayerDirectory {
    rpc: Arc<dyn LmsRpc>,
    registry: Arc<DeviceRegistry>,
    page_size: u32,
}

impl PlayerDirectory {
    pub fn new(rpc: Arc<dyn LmsRpc>, registry: Arc<DeviceRegistry>, page_size: u32) -> Self {
        Self {
            rpc,
            registry,
            page_size,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Fetches the current player list.
    pub async fn discover(&self) -> LmsResult<PlayersPage> {
        let response = self
            .rpc
            .invoke(SERVER_TARGET, &commands::players(0, self.page_size))
            .await?;
        let page = commands::parse_players(&response)?;

        if page.is_truncated() {
            log::warn!(
                "[Directory] Server reports {} players but only {} were requested; raise page_size to manage the rest",
                page.total.unwrap_or_default(),
                self.page_size
            );
        }
        Ok(page)
    }

    /// Runs one discovery cycle.
    ///
    /// # Errors
    ///
    /// Returns the list call's error. Registration failures never fail the
    /// cycle.
    pub async fn run_cycle(&self) -> LmsResult<DiscoveryReport> {
        let page = self.discover().await?;
        let mut report = DiscoveryReport {
            seen: page.players.len(),
            skipped: page.skipped,
            registered: 0,
            truncated: page.is_truncated(),
        };

        if page.skipped > 0 {
            log::debug!(
                "[Directory] Skipped {} player entries without id or name",
                page.skipped
            );
        }

        for snapshot in &page.players {
            if self.registry.contains(&snapshot.player_id) {
                continue;
            }

            match self.registry.register(snapshot) {
                Ok(_) => report.registered += 1,
                // Lost a race with a concurrent cycle; the other one owns it.
                Err(RegistryError::AlreadyRegistered(id)) => {
                    log::debug!("[Directory] {} registered concurrently", id);
                }
                Err(RegistryError::ShuttingDown) => {
                    log::debug!("[Directory] Registry shutting down, ending cycle");
                    break;
                }
            }
        }

        if report.registered > 0 {
            log::info!(
                "[Directory] Discovered {} new player(s), {} managed",
                report.registered,
                self.registry.len()
            );
        }
        Ok(report)
    }

    /// One cycle with failures logged and swallowed.
    async fn cycle_logged(&self) {
        if let Err(e) = self.run_cycle().await {
            log::error!("[Directory] Discovery failed: {}", e);
        }
    }

    /// Runs discovery cycles until `cancel_token` fires. The first cycle runs
    /// immediately; cycles never overlap.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("[Directory] Discovering players every {:?}", interval);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    log::info!("[Directory] Shutting down discovery loop");
                    break;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = self.cycle_logged() => {}
            }
        }
    }

    /// Spawns [`PlayerDirectory::run`] and returns the handle that aborts it.
    pub fn start(
        self: &Arc<Self>,
        interval: Duration,
        spawner: &dyn TaskSpawner,
        cancel_token: CancellationToken,
    ) -> AbortHandle {
        spawner.spawn(Box::pin(Arc::clone(self).run(interval, cancel_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::host::{DeviceHost, LoggingHost};
    use crate::lms::test_fixtures::{
        response, MockLms, PLAYERS_KITCHEN, PLAYERS_TWO, STATUS_PLAYING,
    };
    use crate::lms::{LocalIdentity, PlayerId, RpcError};
    use crate::runtime::TokioSpawner;

    const DISCOVERY: Duration = Duration::from_secs(15);
    const POLL: Duration = Duration::from_secs(5);

    struct Fixture {
        host: Arc<LoggingHost>,
        mock: Arc<MockLms>,
        directory: Arc<PlayerDirectory>,
    }

    fn fixture(mock: MockLms, page_size: u32) -> Fixture {
        let host = Arc::new(LoggingHost::new());
        let mock = Arc::new(mock);
        let registry = Arc::new(DeviceRegistry::new(
            Arc::clone(&host) as Arc<dyn DeviceHost>,
            Arc::clone(&mock) as Arc<dyn LmsRpc>,
            Arc::new(TokioSpawner::current()),
            POLL,
            CancellationToken::new(),
        ));
        let directory = Arc::new(PlayerDirectory::new(
            Arc::clone(&mock) as Arc<dyn LmsRpc>,
            registry,
            page_size,
        ));
        Fixture {
            host,
            mock,
            directory,
        }
    }

    #[tokio::test]
    async fn cycle_registers_named_players_and_skips_the_rest() {
        let f = fixture(MockLms::serving(PLAYERS_TWO, STATUS_PLAYING), 50);

        let report = f.directory.run_cycle().await.unwrap();

        assert_eq!(
            report,
            DiscoveryReport {
                seen: 2,
                skipped: 1,
                registered: 2,
                truncated: false,
            }
        );
        assert_eq!(f.host.registrations(), 2);
        assert!(f
            .directory
            .registry()
            .contains(&PlayerId::parse("aa:bb:cc:dd:ee:01").unwrap()));
        assert!(f.mock.calls().contains(&(
            String::new(),
            vec![json!("players"), json!(0), json!(50)]
        )));
        f.directory.registry().shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn second_cycle_is_a_no_op() {
        let f = fixture(MockLms::serving(PLAYERS_KITCHEN, STATUS_PLAYING), 50);

        f.directory.run_cycle().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let calls_after_first = f.mock.calls().len();

        let report = f.directory.run_cycle().await.unwrap();

        assert_eq!(report.registered, 0);
        assert_eq!(f.host.registrations(), 1);
        // Exactly one extra call: the list itself.
        let calls = f.mock.calls();
        assert_eq!(calls.len(), calls_after_first + 1);
        assert_eq!(calls.last().unwrap().1[0], json!("players"));
        f.directory.registry().shutdown();
    }

    #[tokio::test]
    async fn list_failure_ends_cycle_without_side_effects() {
        let f = fixture(MockLms::timing_out(), 50);

        let err = f.directory.run_cycle().await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(f.host.registrations(), 0);
        assert!(f.directory.registry().is_empty());
    }

    #[tokio::test]
    async fn missing_players_loop_is_a_protocol_error() {
        let f = fixture(
            MockLms::new(|_, _| Ok(response(r#"{"result":{"count":2}}"#))),
            50,
        );

        assert!(f.directory.run_cycle().await.is_err());
        assert_eq!(f.host.registrations(), 0);
    }

    #[tokio::test]
    async fn empty_server_is_not_an_error() {
        let f = fixture(
            MockLms::new(|_, _| Ok(response(r#"{"result":{"count":0}}"#))),
            50,
        );

        let report = f.directory.run_cycle().await.unwrap();
        assert_eq!(report, DiscoveryReport::default());
    }

    #[tokio::test]
    async fn truncated_page_is_reported() {
        let f = fixture(
            MockLms::new(|_, _| {
                Ok(response(
                    r#"{"result":{"count":5,"players_loop":[{"playerid":"aa:01","name":"One"}]}}"#,
                ))
            }),
            1,
        );

        let report = f.directory.run_cycle().await.unwrap();

        assert!(report.truncated);
        assert_eq!(report.registered, 1);
        assert!(f
            .mock
            .calls()
            .contains(&(String::new(), vec![json!("players"), json!(0), json!(1)])));
        f.directory.registry().shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_players_are_kept() {
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let f = fixture(
            MockLms::new(move |player_id, command| {
                if player_id.is_empty() && command[0] == json!("players") {
                    let n = seen_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    if n == 0 {
                        Ok(response(PLAYERS_KITCHEN))
                    } else {
                        Ok(response(r#"{"result":{"count":0}}"#))
                    }
                } else {
                    Ok(response(STATUS_PLAYING))
                }
            }),
            50,
        );

        f.directory.run_cycle().await.unwrap();
        f.directory.run_cycle().await.unwrap();

        let record = f
            .directory
            .registry()
            .get(&PlayerId::parse("aa:bb").unwrap())
            .unwrap();
        assert!(record.is_polling());
        assert_eq!(f.directory.registry().len(), 1);
        f.directory.registry().shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_loop_recovers_after_failures() {
        let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        let f = fixture(
            MockLms::new(move |player_id, _| {
                if !player_id.is_empty() {
                    return Ok(response(STATUS_PLAYING));
                }
                let n = attempts_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Err(RpcError::Unreachable("connection refused".into()))
                } else {
                    Ok(response(PLAYERS_KITCHEN))
                }
            }),
            50,
        );
        let cancel = CancellationToken::new();

        f.directory
            .start(DISCOVERY, &TokioSpawner::current(), cancel.clone());

        // Cycles at 0 (fails), 15, 30.
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(f.mock.count("", "players"), 3);
        assert_eq!(f.host.registrations(), 1);

        let identity = LocalIdentity::derive(PlayerId::parse("aa:bb").unwrap());
        assert!(f.host.restore_cached_device(&identity).is_some());

        cancel.cancel();
        f.directory.registry().shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap() {
        let f = fixture(
            MockLms::serving(PLAYERS_KITCHEN, STATUS_PLAYING)
                .with_delay("", Duration::from_secs(20)),
            50,
        );
        let cancel = CancellationToken::new();

        f.directory
            .start(DISCOVERY, &TokioSpawner::current(), cancel.clone());

        // List calls start at 0, 20 and 40; overlapping cycles would have
        // started a fourth at 45.
        tokio::time::sleep(Duration::from_secs(50)).await;

        assert_eq!(f.mock.count("", "players"), 3);
        assert_eq!(f.host.registrations(), 1);

        cancel.cancel();
        f.directory.registry().shutdown();
    }
}
