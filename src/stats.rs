//! External stats service.
//!
//! Requests run on short-lived worker threads and report back over a channel,
//! so the event loop keeps processing toggles and window moves while a request
//! is in flight. Results can therefore arrive in any order relative to later
//! state changes.

use crate::catalog::HeroDescriptor;
use crate::error::FetchError;
use crossbeam::channel::{unbounded, Receiver, Sender};
use reqwest::blocking::Client;
use reqwest::Url;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Read-only view of the stats service
pub trait StatsSource: Send + Sync {
    /// `GET /players/{id}/summary`, payload returned verbatim
    fn player_summary(&self, player_id: &str) -> Result<Value, FetchError>;
    /// `GET /heroes?role=tank`, in service order
    fn tank_heroes(&self) -> Result<Vec<HeroDescriptor>, FetchError>;
}

/// BattleTags use `#`, the service path segment uses `-`
pub fn normalize_player_id(username: &str) -> String {
    username.trim().replace('#', "-")
}

pub struct HttpStatsClient {
    client: Client,
    base_url: Url,
}

impl HttpStatsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::Transport(format!("invalid base url {}: {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tankwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpStatsClient { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn player_summary_url(&self, player_id: &str) -> Result<Url, FetchError> {
        self.endpoint(&["players", player_id, "summary"])
    }

    pub fn tank_heroes_url(&self) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["heroes"])?;
        url.query_pairs_mut().append_pair("role", "tank");
        Ok(url)
    }
}

impl StatsSource for HttpStatsClient {
    fn player_summary(&self, player_id: &str) -> Result<Value, FetchError> {
        let url = self.player_summary_url(player_id)?;
        tracing::debug!("GET {}", url);
        let payload: Value = self.client.get(url).send()?.error_for_status()?.json()?;
        if !payload.is_object() {
            return Err(FetchError::Malformed("player summary is not an object".to_string()));
        }
        Ok(payload)
    }

    fn tank_heroes(&self) -> Result<Vec<HeroDescriptor>, FetchError> {
        let url = self.tank_heroes_url()?;
        tracing::debug!("GET {}", url);
        Ok(self.client.get(url).send()?.error_for_status()?.json()?)
    }
}

/// A finished request
#[derive(Debug)]
pub enum FetchOutcome {
    Player {
        player_id: String,
        result: Result<Value, FetchError>,
    },
    TankHeroes {
        result: Result<Vec<HeroDescriptor>, FetchError>,
    },
}

/// Runs requests off the event loop thread
pub struct FetchWorker {
    source: Arc<dyn StatsSource>,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
}

impl FetchWorker {
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        let (tx, rx) = unbounded();
        FetchWorker { source, tx, rx }
    }

    pub fn fetch_player(&self, player_id: String) {
        let source = Arc::clone(&self.source);
        self.spawn(move || {
            let result = guarded(|| source.player_summary(&player_id));
            FetchOutcome::Player { player_id, result }
        });
    }

    pub fn fetch_tank_heroes(&self) {
        let source = Arc::clone(&self.source);
        self.spawn(move || FetchOutcome::TankHeroes {
            result: guarded(|| source.tank_heroes()),
        });
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> FetchOutcome + Send + 'static,
    {
        let tx = self.tx.clone();
        let spawned = std::thread::Builder::new()
            .name("stats-fetch".to_string())
            .spawn(move || {
                // Receiver gone means we are shutting down
                let _ = tx.send(job());
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to start stats request: {}", e);
        }
    }

    /// Next finished request, if any
    pub fn try_recv(&self) -> Option<FetchOutcome> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// A panicking request is reported as a failed request
fn guarded<T>(request: impl FnOnce() -> Result<T, FetchError>) -> Result<T, FetchError> {
    catch_unwind(AssertUnwindSafe(request))
        .unwrap_or_else(|_| Err(FetchError::Transport("stats request panicked".to_string())))
}


#[cfg(test)]
mod tests {
    use super::fake::FakeStats;
    use super::*;
    use crate::catalog::hero;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_normalize_player_id() {
        assert_eq!(normalize_player_id("Foo#1234"), "Foo-1234");
        assert_eq!(normalize_player_id("  Bar#99 "), "Bar-99");
        assert_eq!(normalize_player_id("NoTag"), "NoTag");
    }

    #[test]
    fn test_urls() {
        let client = HttpStatsClient::new("https://stats.example.com/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.player_summary_url("Foo-1234").unwrap().as_str(),
            "https://stats.example.com/players/Foo-1234/summary"
        );
        assert_eq!(
            client.tank_heroes_url().unwrap().as_str(),
            "https://stats.example.com/heroes?role=tank"
        );
    }

    #[test]
    fn test_player_id_is_one_path_segment() {
        let client = HttpStatsClient::new("https://stats.example.com/api", Duration::from_secs(1)).unwrap();
        let url = client.player_summary_url("a/b c").unwrap();
        assert_eq!(url.as_str(), "https://stats.example.com/api/players/a%2Fb%20c/summary");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpStatsClient::new("not a url", Duration::from_secs(1)),
            Err(FetchError::Transport(_))
        ));
    }

    #[test]
    fn test_worker_reports_player_result() {
        let worker = FetchWorker::new(Arc::new(FakeStats::default()));
        worker.fetch_player("Foo-1234".to_string());

        match worker.recv_timeout(WAIT) {
            Some(FetchOutcome::Player { player_id, result }) => {
                assert_eq!(player_id, "Foo-1234");
                assert_eq!(result.unwrap()["username"], "Foo-1234");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_worker_reports_failures() {
        let source = FakeStats {
            fail_heroes: true,
            heroes: vec![hero("dva", "D.Va")],
            ..FakeStats::default()
        };
        let worker = FetchWorker::new(Arc::new(source));
        worker.fetch_tank_heroes();

        match worker.recv_timeout(WAIT) {
            Some(FetchOutcome::TankHeroes { result }) => assert!(result.is_err()),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(worker.try_recv().is_none());
    }

    #[test]
    fn test_panicking_request_is_an_error() {
        let result: Result<(), FetchError> = guarded(|| panic!("boom"));
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
