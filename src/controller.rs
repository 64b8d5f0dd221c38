//! View-state controller.
//!
//! Owns the query text and the latest forecast result and drives the three
//! user actions. Network work runs on spawned tasks; each completion comes back
//! over a channel as an [`Update`] and is applied with a single whole-value
//! replacement, so a draw never sees a half-applied result.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::WeatherBackend;
use crate::config::{SearchOrdering, IMAGE_FILE_NAME};
use crate::error::WxError;
use crate::forecast::{Forecast, ForecastResult, ResolvedLocation, StorePayload, StoreReceipt};

pub const STORE_OK: &str = "Weather data stored successfully!";
pub const STORE_FAILED: &str = "Failed to store weather data.";

/// Transient message shown on the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Failure(String),
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    query: String,
    forecast: ForecastResult,
    notice: Option<Notice>,
}

impl ViewState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn forecast(&self) -> &ForecastResult {
        &self.forecast
    }

    /// Always derived from the held forecast, never stored separately.
    pub fn location(&self) -> Option<ResolvedLocation> {
        self.forecast.location()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

/// Completion of an action, delivered back to the controller.
#[derive(Debug)]
pub enum Update {
    Searched {
        seq: u64,
        outcome: Result<Forecast, WxError>,
    },
    Stored(Result<StoreReceipt, WxError>),
    Downloaded(Result<PathBuf, WxError>),
}

pub struct Controller<B> {
    backend: Arc<B>,
    state: ViewState,
    ordering: SearchOrdering,
    download_dir: PathBuf,
    last_search: u64,
    updates_tx: UnboundedSender<Update>,
    updates_rx: UnboundedReceiver<Update>,
}

impl<B> Controller<B>
where
    B: WeatherBackend + 'static,
{
    pub fn new(backend: B, download_dir: impl Into<PathBuf>, ordering: SearchOrdering) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            backend: Arc::new(backend),
            state: ViewState::default(),
            ordering,
            download_dir: download_dir.into(),
            last_search: 0,
            updates_tx,
            updates_rx,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.state.query = text.into();
    }

    pub fn dismiss_notice(&mut self) {
        self.state.notice = None;
    }

    /// Look up the current query. Empty queries are forwarded as-is.
    pub fn search(&mut self) -> JoinHandle<()> {
        self.last_search += 1;
        let seq = self.last_search;
        let query = self.state.query.clone();
        let backend = Arc::clone(&self.backend);
        let tx = self.updates_tx.clone();

        info!(%query, seq, "search dispatched");
        tokio::spawn(async move {
            let outcome = backend.lookup(&query).await;
            let _ = tx.send(Update::Searched { seq, outcome });
        })
    }

    /// Persist the current forecast. Returns `None` without touching the
    /// network unless a forecast is loaded.
    pub fn store_current_forecast(&self) -> Option<JoinHandle<()>> {
        let Some(forecast) = self.state.forecast.as_data() else {
            debug!("no forecast loaded, store skipped");
            return None;
        };

        let payload = StorePayload::new(forecast, Utc::now());
        let backend = Arc::clone(&self.backend);
        let tx = self.updates_tx.clone();

        info!(city = %payload.city, "store dispatched");
        Some(tokio::spawn(async move {
            let outcome = backend.store(&payload).await;
            let _ = tx.send(Update::Stored(outcome));
        }))
    }

    pub fn download_static_image(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let dir = self.download_dir.clone();
        let tx = self.updates_tx.clone();

        info!(dir = %dir.display(), "download dispatched");
        tokio::spawn(async move {
            let outcome = match backend.fetch_image().await {
                Ok(bytes) => save_image(&dir, bytes).await,
                Err(err) => Err(err),
            };
            let _ = tx.send(Update::Downloaded(outcome));
        })
    }

    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Searched { seq, outcome } => {
                if self.ordering == SearchOrdering::LatestOnly && seq < self.last_search {
                    warn!(seq, latest = self.last_search, "superseded search response dropped");
                    return;
                }
                self.state.forecast = match outcome {
                    Ok(forecast) => {
                        info!(seq, city = %forecast.primary().address, "forecast loaded");
                        ForecastResult::Data(forecast)
                    }
                    Err(err) => {
                        warn!(seq, error = %err, "search failed");
                        ForecastResult::Error
                    }
                };
            }
            Update::Stored(Ok(receipt)) => {
                let message = receipt.message.unwrap_or_else(|| STORE_OK.to_string());
                self.state.notice = Some(Notice::Info(message));
            }
            Update::Stored(Err(err)) => {
                error!(error = %err, "error storing weather data");
                self.state.notice = Some(Notice::Failure(STORE_FAILED.to_string()));
            }
            Update::Downloaded(Ok(path)) => {
                self.state.notice = Some(Notice::Info(format!("Saved {}", path.display())));
            }
            Update::Downloaded(Err(err)) => {
                error!(error = %err, "error downloading image");
            }
        }
    }

    /// Apply every completion that has already arrived. Returns whether any did.
    pub fn apply_pending(&mut self) -> bool {
        let mut applied = false;
        while let Ok(update) = self.updates_rx.try_recv() {
            self.apply(update);
            applied = true;
        }
        applied
    }

    /// Wait for the next completion and apply it.
    pub async fn apply_next(&mut self) {
        if let Some(update) = self.updates_rx.recv().await {
            self.apply(update);
        }
    }
}

async fn save_image(dir: &Path, bytes: Vec<u8>) -> Result<PathBuf, WxError> {
    let dir = dir.to_path_buf();
    let target = dir.join(IMAGE_FILE_NAME);
    let join_target = target.clone();

    tokio::task::spawn_blocking(move || write_staged(&dir, &bytes, target))
        .await
        .map_err(|err| WxError::Io {
            path: join_target,
            source: io::Error::other(err),
        })?
}

/// Write into a uniquely named temp file beside `target`, then rename it into
/// place. An unpersisted temp file is deleted when it drops.
fn write_staged(dir: &Path, bytes: &[u8], target: PathBuf) -> Result<PathBuf, WxError> {
    let mut staged = NamedTempFile::new_in(dir).map_err(|source| WxError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    staged.write_all(bytes).map_err(|source| WxError::Io {
        path: staged.path().to_path_buf(),
        source,
    })?;
    staged.persist(&target).map_err(|err| WxError::Io {
        path: target.clone(),
        source: err.error,
    })?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockWeatherBackend;
    use crate::forecast::ForecastRecord;
    use reqwest::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;

    fn forecast_for(city: &str, country: &str) -> Forecast {
        let records: Vec<ForecastRecord> = serde_json::from_value(json!([{
            "address": city,
            "country": country,
            "days_day": [20, 21],
            "days_night": [10, 11],
            "humidity": [50, 55]
        }]))
        .unwrap();
        Forecast::new(records).unwrap()
    }

    fn controller(mock: MockWeatherBackend, dir: &TempDir) -> Controller<MockWeatherBackend> {
        Controller::new(mock, dir.path(), SearchOrdering::AsArrived)
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn location(city: &str, country: &str) -> Option<ResolvedLocation> {
        Some(ResolvedLocation {
            city: city.into(),
            country: country.into(),
        })
    }

    #[tokio::test]
    async fn test_initial_state() {
        let dir = TempDir::new().unwrap();
        let c = controller(MockWeatherBackend::new(), &dir);

        assert_eq!(c.state().query(), "");
        assert_eq!(c.state().forecast(), &ForecastResult::Empty);
        assert_eq!(c.state().location(), None);
        assert_eq!(c.state().notice(), None);
    }

    #[tokio::test]
    async fn test_search_success_sets_forecast_and_location() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .withf(|city| city == "London")
            .times(1)
            .returning(|_| Ok(forecast_for("London", "UK")));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.set_query("London");
        c.search().await.unwrap();
        c.apply_next().await;

        assert_eq!(
            c.state().forecast(),
            &ForecastResult::Data(forecast_for("London", "UK"))
        );
        assert_eq!(c.state().location(), location("London", "UK"));
        assert_eq!(c.state().query(), "London");
    }

    #[tokio::test]
    async fn test_search_failure_clears_location() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .times(1)
            .returning(|_| Err(WxError::Status(StatusCode::NOT_FOUND)));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.set_query("Atlantis");
        c.search().await.unwrap();
        c.apply_next().await;

        assert_eq!(c.state().forecast(), &ForecastResult::Error);
        assert_eq!(c.state().location(), location("", ""));
    }

    #[tokio::test]
    async fn test_empty_result_takes_error_path() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .returning(|_| Err(WxError::EmptyResult));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.search().await.unwrap();
        c.apply_next().await;

        assert_eq!(c.state().forecast(), &ForecastResult::Error);
        assert_eq!(c.state().location(), location("", ""));
    }

    #[tokio::test]
    async fn test_empty_query_is_forwarded() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .withf(|city| city.is_empty())
            .times(1)
            .returning(|_| Err(WxError::Status(StatusCode::NOT_FOUND)));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.search().await.unwrap();
        c.apply_next().await;

        assert_eq!(c.state().forecast(), &ForecastResult::Error);
    }

    #[tokio::test]
    async fn test_failure_after_success_replaces_both() {
        let mut mock = MockWeatherBackend::new();
        let mut calls = 0;
        mock.expect_lookup().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(forecast_for("London", "UK"))
            } else {
                Err(WxError::EmptyResult)
            }
        });

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.search().await.unwrap();
        c.apply_next().await;
        assert_eq!(c.state().location(), location("London", "UK"));

        c.search().await.unwrap();
        c.apply_next().await;
        assert_eq!(c.state().forecast(), &ForecastResult::Error);
        assert_eq!(c.state().location(), location("", ""));
    }

    #[tokio::test]
    async fn test_repeated_search_is_idempotent() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .times(2)
            .returning(|_| Ok(forecast_for("London", "UK")));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.set_query("London");

        c.search().await.unwrap();
        c.apply_next().await;
        let first = c.state().forecast().clone();

        c.search().await.unwrap();
        c.apply_next().await;
        assert_eq!(c.state().forecast(), &first);
    }

    async fn two_searches(ordering: SearchOrdering) -> ViewState {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .returning(|city| Ok(forecast_for(city, "Somewhere")));

        let dir = TempDir::new().unwrap();
        let mut c = Controller::new(mock, dir.path(), ordering);

        c.set_query("Paris");
        c.search().await.unwrap();
        c.set_query("Rome");
        c.search().await.unwrap();

        let mut updates = vec![
            c.updates_rx.recv().await.unwrap(),
            c.updates_rx.recv().await.unwrap(),
        ];
        // deliver the newer response first
        updates.sort_by_key(|u| match u {
            Update::Searched { seq, .. } => std::cmp::Reverse(*seq),
            _ => std::cmp::Reverse(0),
        });
        for update in updates {
            c.apply(update);
        }
        c.state().clone()
    }

    #[tokio::test]
    async fn test_out_of_order_responses_apply_as_arrived() {
        let state = two_searches(SearchOrdering::AsArrived).await;
        assert_eq!(state.location(), location("Paris", "Somewhere"));
    }

    #[tokio::test]
    async fn test_latest_only_drops_superseded_response() {
        let state = two_searches(SearchOrdering::LatestOnly).await;
        assert_eq!(state.location(), location("Rome", "Somewhere"));
    }

    #[tokio::test]
    async fn test_store_is_noop_without_data() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_store().never();
        mock.expect_lookup()
            .returning(|_| Err(WxError::EmptyResult));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        assert!(c.store_current_forecast().is_none());

        c.search().await.unwrap();
        c.apply_next().await;
        assert_eq!(c.state().forecast(), &ForecastResult::Error);
        assert!(c.store_current_forecast().is_none());
        assert!(!c.apply_pending());
        assert_eq!(c.state().notice(), None);
    }

    #[tokio::test]
    async fn test_store_shows_server_message() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .returning(|_| Ok(forecast_for("London", "UK")));
        mock.expect_store()
            .withf(|payload| {
                payload.city == "London"
                    && payload.country == "UK"
                    && payload.daily_weather == forecast_for("London", "UK")
                    && payload.timestamp.ends_with('Z')
            })
            .times(1)
            .returning(|_| {
                Ok(StoreReceipt {
                    message: Some("Stored London".into()),
                })
            });

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.search().await.unwrap();
        c.apply_next().await;

        c.store_current_forecast().unwrap().await.unwrap();
        c.apply_next().await;
        assert_eq!(
            c.state().notice(),
            Some(&Notice::Info("Stored London".into()))
        );
    }

    #[tokio::test]
    async fn test_store_defaults_message() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .returning(|_| Ok(forecast_for("London", "UK")));
        mock.expect_store()
            .returning(|_| Ok(StoreReceipt::default()));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.search().await.unwrap();
        c.apply_next().await;

        c.store_current_forecast().unwrap().await.unwrap();
        c.apply_next().await;
        assert_eq!(c.state().notice(), Some(&Notice::Info(STORE_OK.into())));
    }

    #[tokio::test]
    async fn test_store_failure_shows_generic_notice() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .returning(|_| Ok(forecast_for("London", "UK")));
        mock.expect_store()
            .returning(|_| Err(WxError::Status(StatusCode::INTERNAL_SERVER_ERROR)));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.search().await.unwrap();
        c.apply_next().await;

        c.store_current_forecast().unwrap().await.unwrap();
        c.apply_next().await;
        assert_eq!(
            c.state().notice(),
            Some(&Notice::Failure(STORE_FAILED.into()))
        );

        c.dismiss_notice();
        assert_eq!(c.state().notice(), None);
    }

    #[tokio::test]
    async fn test_download_saves_image() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_fetch_image()
            .times(1)
            .returning(|| Ok(b"\xff\xd8\xff jpeg".to_vec()));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.download_static_image().await.unwrap();
        c.apply_next().await;

        let saved = dir.path().join(IMAGE_FILE_NAME);
        assert_eq!(std::fs::read(&saved).unwrap(), b"\xff\xd8\xff jpeg");
        assert_eq!(entries(&dir), vec![IMAGE_FILE_NAME.to_string()]);
        assert_eq!(
            c.state().notice(),
            Some(&Notice::Info(format!("Saved {}", saved.display())))
        );
    }

    #[tokio::test]
    async fn test_download_failure_is_silent() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_fetch_image()
            .returning(|| Err(WxError::Status(StatusCode::FORBIDDEN)));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.download_static_image().await.unwrap();
        c.apply_next().await;

        assert_eq!(c.state().notice(), None);
        assert!(!dir.path().join(IMAGE_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_failed_save_releases_staging_file() {
        let dir = TempDir::new().unwrap();
        // a directory in the way makes the final rename fail
        std::fs::create_dir(dir.path().join(IMAGE_FILE_NAME)).unwrap();

        let err = save_image(dir.path(), b"bytes".to_vec()).await.unwrap_err();
        assert!(matches!(err, WxError::Io { .. }));
        assert_eq!(entries(&dir), vec![IMAGE_FILE_NAME.to_string()]);
        assert!(dir.path().join(IMAGE_FILE_NAME).is_dir());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_saves_both_succeed() {
        let dir = TempDir::new().unwrap();
        for _ in 0..50 {
            let (a, b) = tokio::join!(
                save_image(dir.path(), b"first".to_vec()),
                save_image(dir.path(), b"second".to_vec()),
            );
            assert!(a.is_ok(), "{a:?}");
            assert!(b.is_ok(), "{b:?}");

            let saved = std::fs::read(dir.path().join(IMAGE_FILE_NAME)).unwrap();
            assert!(saved == b"first" || saved == b"second");
            assert_eq!(entries(&dir), vec![IMAGE_FILE_NAME.to_string()]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_search_store_and_downloads_in_flight_together() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_lookup()
            .times(2)
            .returning(|city| Ok(forecast_for(city, "Somewhere")));
        mock.expect_store()
            .withf(|payload| payload.city == "London")
            .times(1)
            .returning(|_| Ok(StoreReceipt::default()));
        mock.expect_fetch_image()
            .times(2)
            .returning(|| Ok(b"sky".to_vec()));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.set_query("London");
        c.search().await.unwrap();
        c.apply_next().await;

        // nothing below is applied until every action has been dispatched
        c.set_query("Paris");
        let handles = vec![
            c.search(),
            c.store_current_forecast().unwrap(),
            c.download_static_image(),
            c.download_static_image(),
        ];
        for handle in handles {
            handle.await.unwrap();
        }

        let mut stored = 0;
        let mut saved = 0;
        for _ in 0..4 {
            let update = c.updates_rx.recv().await.unwrap();
            match &update {
                Update::Searched { outcome, .. } => assert!(outcome.is_ok()),
                Update::Stored(outcome) => {
                    assert!(outcome.is_ok());
                    stored += 1;
                }
                Update::Downloaded(outcome) => {
                    assert!(outcome.is_ok(), "{outcome:?}");
                    saved += 1;
                }
            }
            c.apply(update);
        }

        assert_eq!((stored, saved), (1, 2));
        assert_eq!(c.state().location(), location("Paris", "Somewhere"));
        assert_eq!(std::fs::read(dir.path().join(IMAGE_FILE_NAME)).unwrap(), b"sky");
        assert_eq!(entries(&dir), vec![IMAGE_FILE_NAME.to_string()]);
        assert!(matches!(c.state().notice(), Some(Notice::Info(_))));
        assert!(!c.apply_pending());
    }

    #[tokio::test]
    async fn test_download_does_not_touch_forecast() {
        let mut mock = MockWeatherBackend::new();
        mock.expect_fetch_image()
            .returning(|| Err(WxError::Status(StatusCode::FORBIDDEN)));

        let dir = TempDir::new().unwrap();
        let mut c = controller(mock, &dir);
        c.download_static_image().await.unwrap();
        c.apply_next().await;

        assert_eq!(c.state().forecast(), &ForecastResult::Empty);
    }
}
