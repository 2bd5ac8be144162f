//! Batch scheduler: walks the location list from the cursor until a budget runs out

use crate::campaign::checkpoint::Checkpointer;
use crate::campaign::fetch::{FetchAndClassify, FetchOutcome};
use crate::config::BudgetConfig;
use crate::locations::LocationTarget;
use crate::output::{LocationFailure, OutputSink, RunSummary};
use crate::state::{Cursor, CursorStore, DedupLedger, SchedulerState};
use crate::storage::{RunCounters, RunStatus};
use crate::{HiveError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The location list was empty
    NoWork,

    /// The wall-clock budget ran out
    TimeBudget,

    /// The configured number of locations was processed
    CountBudget,

    /// A time-budgeted run visited every location once
    FullPass,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoWork => "no work",
            Self::TimeBudget => "time budget",
            Self::CountBudget => "location budget",
            Self::FullPass => "full pass",
        };
        f.write_str(text)
    }
}

/// The single stop condition governing a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBudget {
    Time(Duration),
    Count(u32),
}

impl StopBudget {
    /// A configured time budget takes precedence over the location count
    pub fn from_config(config: &BudgetConfig) -> Self {
        match config.time_budget_secs {
            Some(secs) => Self::Time(Duration::from_secs(secs)),
            None => Self::Count(config.max_locations),
        }
    }

    /// Checked before each location
    fn reached(&self, elapsed: Duration, processed: u32, total: usize) -> Option<StopReason> {
        match *self {
            Self::Time(budget) if elapsed >= budget => Some(StopReason::TimeBudget),
            Self::Time(_) if processed as usize >= total => Some(StopReason::FullPass),
            Self::Time(_) => None,
            Self::Count(limit) if processed >= limit => Some(StopReason::CountBudget),
            Self::Count(_) => None,
        }
    }
}

/// What happened to one location
#[derive(Debug)]
enum LocationResult {
    Accepted { new_ids: Vec<String> },
    Unresolvable,
    Failed,
}

/// Estimated time to finish the current pass at the running average
pub fn full_pass_eta(cursor: &Cursor, average: Duration) -> Duration {
    let completed = if cursor.next_index == 0 {
        cursor.total_count
    } else {
        cursor.next_index
    };
    let remaining = cursor.total_count.saturating_sub(completed);
    average.saturating_mul(remaining as u32)
}

/// Formats a duration as `H:MM:SS`
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Drives fetch, dedup, output and cursor updates for one run
///
/// Locations are handled strictly one at a time: the sink write, ledger
/// append and cursor save for location `i` all finish before location
/// `i + 1` is fetched.
pub struct BatchScheduler {
    state: SchedulerState,
    fetcher: FetchAndClassify,
    ledger: DedupLedger,
    cursor_store: CursorStore,
    sink: Box<dyn OutputSink>,
    checkpointer: Option<Checkpointer>,
    budget: StopBudget,
    location_pause: Duration,
    run_label: String,
    output_dir: Option<PathBuf>,
}

impl BatchScheduler {
    pub fn new(
        fetcher: FetchAndClassify,
        ledger: DedupLedger,
        cursor_store: CursorStore,
        sink: Box<dyn OutputSink>,
        budget: StopBudget,
    ) -> Self {
        Self {
            state: SchedulerState::Idle,
            fetcher,
            ledger,
            cursor_store,
            sink,
            checkpointer: None,
            budget,
            location_pause: Duration::ZERO,
            run_label: "local".to_string(),
            output_dir: None,
        }
    }

    pub fn with_checkpointer(mut self, checkpointer: Checkpointer) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Pause inserted between two locations
    pub fn with_location_pause(mut self, pause: Duration) -> Self {
        self.location_pause = pause;
        self
    }

    /// Run identification carried into the summary
    pub fn with_run_label(mut self, label: impl Into<String>, output_dir: Option<PathBuf>) -> Self {
        self.run_label = label.into();
        self.output_dir = output_dir;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn checkpointer(&self) -> Option<&Checkpointer> {
        self.checkpointer.as_ref()
    }

    fn transition(&mut self, next: SchedulerState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HiveError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Scheduler {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Processes locations from the persisted cursor until the budget is reached
    ///
    /// A location that fails on its own still advances the cursor; only state
    /// that cannot be persisted ends the run early.
    ///
    /// # Arguments
    ///
    /// * `targets` - The full location list; its length validates the saved cursor
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Counters, failures and the stop reason
    /// * `Err(HiveError)` - Output, ledger, cursor or checkpoint state could not be persisted
    pub async fn run(&mut self, targets: &[LocationTarget]) -> Result<RunSummary> {
        self.transition(SchedulerState::Loading)?;

        let total = targets.len();
        let mut summary = RunSummary::new(self.run_label.clone(), total);
        summary.output_dir = self.output_dir.clone();
        summary.ledger_size = self.ledger.len();

        if total == 0 {
            tracing::info!("Location list is empty; nothing to do");
            self.transition(SchedulerState::Stopped)?;
            return Ok(summary);
        }

        let mut cursor = self.cursor_store.load(total);
        tracing::info!(
            "Total locations: {}. Starting at index: {}. Ledger holds {} ids",
            total,
            cursor.next_index,
            self.ledger.len()
        );

        self.transition(SchedulerState::Running)?;
        let started = Instant::now();
        let result = self
            .run_locations(targets, &mut cursor, &mut summary, started)
            .await;

        summary.elapsed = started.elapsed();
        summary.next_index = cursor.next_index;
        summary.ledger_size = self.ledger.len();

        let status = if result.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        let counters = RunCounters {
            locations_processed: u64::from(summary.locations_processed),
            new_records: summary.new_records as u64,
            failed_locations: summary.failed_count() as u64,
        };
        let mut finish_error = None;
        if let Some(checkpointer) = self.checkpointer.as_mut() {
            if let Err(e) = checkpointer.finish(&cursor, &counters, status) {
                if result.is_ok() {
                    finish_error = Some(e);
                } else {
                    tracing::warn!("Could not record failed run: {}", e);
                }
            }
        }

        self.transition(SchedulerState::Stopped)?;
        result?;
        if let Some(e) = finish_error {
            return Err(e);
        }

        tracing::info!(
            "Run stopped ({}): {} locations, {} new records, next index {}",
            summary.stop_reason,
            summary.locations_processed,
            summary.new_records,
            summary.next_index
        );
        Ok(summary)
    }

    async fn run_locations(
        &mut self,
        targets: &[LocationTarget],
        cursor: &mut Cursor,
        summary: &mut RunSummary,
        started: Instant,
    ) -> Result<()> {
        let total = targets.len();
        let mut busy = Duration::ZERO;

        loop {
            if let Some(reason) =
                self.budget
                    .reached(started.elapsed(), summary.locations_processed, total)
            {
                summary.stop_reason = reason;
                return Ok(());
            }

            if summary.locations_processed > 0 && !self.location_pause.is_zero() {
                tokio::time::sleep(self.location_pause).await;
            }

            let index = cursor.next_index;
            let target = &targets[index];
            tracing::info!(
                "=== [{}/{}] {} ({} mi) ===",
                index + 1,
                total,
                target.query,
                target.radius_miles
            );

            let tick = Instant::now();
            let result = self.process_location(index, target, summary).await?;

            cursor.advance();
            self.cursor_store.save(cursor)?;
            summary.locations_processed += 1;

            let new_ids = match &result {
                LocationResult::Accepted { new_ids } => new_ids.as_slice(),
                LocationResult::Unresolvable | LocationResult::Failed => &[][..],
            };
            self.checkpoint_if_due(new_ids, cursor)?;

            busy += tick.elapsed();
            let average = busy / summary.locations_processed;
            tracing::info!(
                "Progress: {:.2}% | Avg/loc: {:.1}s | ETA for full pass: {}",
                summary_percent(cursor),
                average.as_secs_f64(),
                format_hms(full_pass_eta(cursor, average))
            );
        }
    }

    /// Fetches one location, writes its unseen records and marks them seen
    async fn process_location(
        &mut self,
        index: usize,
        target: &LocationTarget,
        summary: &mut RunSummary,
    ) -> Result<LocationResult> {
        let fetched = match self.fetcher.run(target).await {
            Ok(FetchOutcome::Resolved(fetched)) => fetched,
            Ok(FetchOutcome::Unresolvable { degraded }) => {
                tracing::warn!("No coordinate for '{}'; skipping", target.query);
                summary.unresolvable += 1;
                if degraded {
                    summary.degraded_calls += 1;
                }
                return Ok(LocationResult::Unresolvable);
            }
            Err(e) => {
                tracing::error!("Location '{}' failed: {}", target.query, e);
                summary.failures.push(LocationFailure {
                    index,
                    query: target.query.clone(),
                    message: e.to_string(),
                });
                return Ok(LocationResult::Failed);
            }
        };

        summary.degraded_calls += fetched.degraded_calls;
        let found = fetched.provider_ids.len();
        let (unseen, skipped) = self
            .ledger
            .partition_unseen(fetched.records, |r| r.provider_id.as_str());

        // Written even when every record was seen, so each location gets its files
        if let Err(e) = self.sink.write_location(target, &unseen) {
            if !e.is_location_specific() {
                return Err(e.into());
            }
            tracing::error!("Could not write output for '{}': {}", target.query, e);
            summary.failures.push(LocationFailure {
                index,
                query: target.query.clone(),
                message: e.to_string(),
            });
            return Ok(LocationResult::Failed);
        }

        let new_ids: Vec<String> = unseen.iter().map(|r| r.provider_id.clone()).collect();
        self.ledger.append(&new_ids)?;

        summary.new_records += new_ids.len();
        summary.duplicates_skipped += skipped;
        tracing::info!(
            "'{}': {} found, {} new, {} already seen",
            target.query,
            found,
            new_ids.len(),
            skipped
        );

        Ok(LocationResult::Accepted { new_ids })
    }

    fn checkpoint_if_due(&mut self, new_ids: &[String], cursor: &Cursor) -> Result<()> {
        let due = match self.checkpointer.as_mut() {
            Some(checkpointer) => {
                checkpointer.record(new_ids);
                checkpointer.is_due(Instant::now())
            }
            None => false,
        };
        if !due {
            return Ok(());
        }

        self.transition(SchedulerState::Checkpointing)?;
        if let Some(checkpointer) = self.checkpointer.as_mut() {
            checkpointer.flush(cursor)?;
        }
        self.transition(SchedulerState::Running)
    }
}

/// Pass progress where a wrapped cursor counts as 100%
fn summary_percent(cursor: &Cursor) -> f64 {
    if cursor.next_index == 0 && cursor.total_count > 0 {
        100.0
    } else {
        cursor.progress_percent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{EstablishmentRecord, RetryPolicy};
    use crate::classify::OsmTagClassifier;
    use crate::config::CheckpointConfig;
    use crate::output::{OutputError, OutputResult, SinkReceipt};
    use crate::provider::{Candidate, Coordinate, ProviderError, SearchProvider, TagFilter};
    use crate::storage::SqliteCheckpointStore;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// In-memory provider keyed by location query
    #[derive(Default)]
    struct StubProvider {
        places: HashMap<String, Vec<Candidate>>,
        forbidden: Vec<String>,
    }

    impl StubProvider {
        fn with_place(mut self, query: &str, candidates: Vec<Candidate>) -> Self {
            self.places.insert(query.to_string(), candidates);
            self
        }

        fn with_forbidden(mut self, query: &str) -> Self {
            self.forbidden.push(query.to_string());
            self
        }
    }

    impl StubProvider {
        /// Known queries geocode to `(position, 0.0)` in sorted query order
        fn sorted_queries(&self) -> Vec<&String> {
            let mut queries: Vec<&String> = self.places.keys().collect();
            queries.sort();
            queries
        }
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        async fn geocode(&self, query: &str) -> std::result::Result<Option<Coordinate>, ProviderError> {
            if self.forbidden.iter().any(|q| q == query) {
                return Err(ProviderError::Fatal {
                    status: 403,
                    url: "https://geo.example.com".to_string(),
                });
            }
            Ok(self
                .sorted_queries()
                .iter()
                .position(|q| q.as_str() == query)
                .map(|i| Coordinate::new(i as f64, 0.0)))
        }

        async fn search(
            &self,
            center: Coordinate,
            _radius_meters: u32,
            _tags: &[TagFilter],
        ) -> std::result::Result<Vec<Candidate>, ProviderError> {
            let queries = self.sorted_queries();
            Ok(queries
                .get(center.latitude as usize)
                .and_then(|q| self.places.get(*q))
                .cloned()
                .unwrap_or_default())
        }
    }

    /// Sink that records what it was given and how big the ledger file was at the time
    #[derive(Clone, Default)]
    struct RecordingSink {
        writes: Arc<Mutex<Vec<(String, Vec<String>, usize)>>>,
        ledger_path: Option<PathBuf>,
    }

    impl OutputSink for RecordingSink {
        fn write_location(
            &mut self,
            target: &LocationTarget,
            records: &[EstablishmentRecord],
        ) -> OutputResult<SinkReceipt> {
            let ledger_lines = self
                .ledger_path
                .as_ref()
                .and_then(|p| std::fs::read_to_string(p).ok())
                .map(|s| s.lines().count())
                .unwrap_or(0);
            let ids = records.iter().map(|r| r.provider_id.clone()).collect();
            self.writes
                .lock()
                .unwrap()
                .push((target.query.clone(), ids, ledger_lines));
            Ok(SinkReceipt {
                retail: records.len(),
                wholesale: 0,
                files: vec![],
            })
        }
    }

    /// Sink that rejects one location, either as that location's fault or the disk's
    struct RejectingSink {
        query: String,
        location_specific: bool,
    }

    impl OutputSink for RejectingSink {
        fn write_location(
            &mut self,
            target: &LocationTarget,
            _records: &[EstablishmentRecord],
        ) -> OutputResult<SinkReceipt> {
            if target.query != self.query {
                return Ok(SinkReceipt::default());
            }
            if self.location_specific {
                Err(OutputError::Target {
                    path: PathBuf::from("run/NH Suppliers - Bad-Name NH.csv"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
            } else {
                Err(OutputError::Io(std::io::Error::from(
                    std::io::ErrorKind::PermissionDenied,
                )))
            }
        }
    }

    fn shop(id: &str, name: &str, value: &str) -> Candidate {
        let mut tags = BTreeMap::new();
        tags.insert("name".to_string(), name.to_string());
        tags.insert("shop".to_string(), value.to_string());
        Candidate::new(id, tags)
    }

    struct Harness {
        dir: TempDir,
        sink: RecordingSink,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let sink = RecordingSink {
                writes: Arc::default(),
                ledger_path: Some(dir.path().join("state_dedupe.jsonl")),
            };
            Self { dir, sink }
        }

        fn ledger_path(&self) -> PathBuf {
            self.dir.path().join("state_dedupe.jsonl")
        }

        fn cursor_store(&self) -> CursorStore {
            CursorStore::new(self.dir.path().join("cursor.json"))
        }

        fn scheduler(&self, provider: StubProvider, budget: StopBudget) -> BatchScheduler {
            self.scheduler_with_sink(provider, budget, Box::new(self.sink.clone()))
        }

        fn scheduler_with_sink(
            &self,
            provider: StubProvider,
            budget: StopBudget,
            sink: Box<dyn OutputSink>,
        ) -> BatchScheduler {
            let fetcher = FetchAndClassify::new(
                Box::new(provider),
                Box::new(OsmTagClassifier::new()),
                RetryPolicy::new(2, Duration::ZERO, Duration::ZERO),
            );
            BatchScheduler::new(
                fetcher,
                DedupLedger::open(self.ledger_path()).unwrap(),
                self.cursor_store(),
                sink,
                budget,
            )
        }

        fn writes(&self) -> Vec<(String, Vec<String>, usize)> {
            self.sink.writes.lock().unwrap().clone()
        }
    }

    fn targets(queries: &[&str]) -> Vec<LocationTarget> {
        queries
            .iter()
            .map(|q| LocationTarget::new(*q, 10.0))
            .collect()
    }

    #[tokio::test]
    async fn test_single_supermarket_location() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("Northwood, NH", vec![shop("n_1", "Hannaford", "supermarket")]);
        let mut scheduler = h.scheduler(provider, StopBudget::Count(1));

        let summary = scheduler.run(&targets(&["Northwood, NH"])).await.unwrap();

        assert_eq!(summary.locations_processed, 1);
        assert_eq!(summary.new_records, 1);
        assert_eq!(summary.next_index, 0);
        assert_eq!(summary.stop_reason, StopReason::CountBudget);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(scheduler.ledger().contains("n_1"));

        let writes = h.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, vec!["n_1".to_string()]);
    }

    #[tokio::test]
    async fn test_unresolvable_location_still_advances() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("Dover, NH", vec![shop("n_2", "Market", "grocery")]);
        let mut scheduler = h.scheduler(provider, StopBudget::Count(1));

        let summary = scheduler
            .run(&targets(&["Nowhere, ZZ", "Dover, NH"]))
            .await
            .unwrap();

        assert_eq!(summary.locations_processed, 1);
        assert_eq!(summary.unresolvable, 1);
        assert_eq!(summary.new_records, 0);
        assert_eq!(summary.next_index, 1);
        assert!(h.writes().is_empty());
        assert_eq!(h.cursor_store().load(2).next_index, 1);
    }

    #[tokio::test]
    async fn test_already_seen_id_is_not_written() {
        let h = Harness::new();
        DedupLedger::restore(h.ledger_path(), ["n_1"]).unwrap();

        let provider = StubProvider::default()
            .with_place("Northwood, NH", vec![shop("n_1", "Hannaford", "supermarket")]);
        let mut scheduler = h.scheduler(provider, StopBudget::Count(1));
        let summary = scheduler.run(&targets(&["Northwood, NH"])).await.unwrap();

        assert_eq!(summary.new_records, 0);
        assert_eq!(summary.duplicates_skipped, 1);
        // The sink is still called so the location gets its (header-only) files
        assert_eq!(h.writes(), vec![("Northwood, NH".to_string(), vec![], 1)]);
        assert_eq!(DedupLedger::open(h.ledger_path()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_never_emits_twice() {
        let h = Harness::new();
        let list = targets(&["Northwood, NH", "Dover, NH"]);
        let provider = || {
            StubProvider::default()
                .with_place("Northwood, NH", vec![shop("n_1", "Hannaford", "supermarket")])
                .with_place(
                    "Dover, NH",
                    vec![
                        shop("n_1", "Hannaford", "supermarket"),
                        shop("w_2", "Dover Co-op", "grocery"),
                    ],
                )
        };

        h.scheduler(provider(), StopBudget::Count(2))
            .run(&list)
            .await
            .unwrap();
        let second = h
            .scheduler(provider(), StopBudget::Count(2))
            .run(&list)
            .await
            .unwrap();
        assert_eq!(second.new_records, 0);

        let mut emitted: Vec<String> = h.writes().into_iter().flat_map(|w| w.1).collect();
        let total = emitted.len();
        emitted.sort();
        emitted.dedup();
        assert_eq!(emitted.len(), total);
        assert_eq!(emitted, vec!["n_1".to_string(), "w_2".to_string()]);
    }

    #[tokio::test]
    async fn test_list_length_change_resets_cursor() {
        let h = Harness::new();
        DedupLedger::restore(h.ledger_path(), ["x_1", "x_2"]).unwrap();
        h.cursor_store()
            .save(&Cursor {
                next_index: 2,
                total_count: 3,
            })
            .unwrap();

        let mut scheduler = h.scheduler(StubProvider::default(), StopBudget::Count(1));
        let summary = scheduler
            .run(&targets(&["A, NH", "B, NH", "C, NH", "D, NH"]))
            .await
            .unwrap();

        // Started over at 0, processed one location
        assert_eq!(summary.next_index, 1);
        assert_eq!(summary.ledger_size, 2);
    }

    #[tokio::test]
    async fn test_full_pass_visits_each_location_once() {
        let h = Harness::new();
        h.cursor_store()
            .save(&Cursor {
                next_index: 2,
                total_count: 4,
            })
            .unwrap();

        let provider = StubProvider::default()
            .with_place("A, NH", vec![shop("n_a", "A", "grocery")])
            .with_place("B, NH", vec![shop("n_b", "B", "grocery")])
            .with_place("C, NH", vec![shop("n_c", "C", "grocery")])
            .with_place("D, NH", vec![shop("n_d", "D", "grocery")]);
        let mut scheduler = h.scheduler(provider, StopBudget::Count(4));
        let summary = scheduler
            .run(&targets(&["A, NH", "B, NH", "C, NH", "D, NH"]))
            .await
            .unwrap();

        let order: Vec<String> = h.writes().into_iter().map(|w| w.0).collect();
        assert_eq!(order, vec!["C, NH", "D, NH", "A, NH", "B, NH"]);
        assert_eq!(summary.next_index, 2);
    }

    #[tokio::test]
    async fn test_fatal_failure_advances_without_touching_ledger() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("Dover, NH", vec![shop("n_2", "Market", "grocery")])
            .with_forbidden("Bad, NH");
        let mut scheduler = h.scheduler(provider, StopBudget::Count(2));

        let summary = scheduler
            .run(&targets(&["Bad, NH", "Dover, NH"]))
            .await
            .unwrap();

        assert_eq!(summary.locations_processed, 2);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.failures[0].query, "Bad, NH");
        assert_eq!(summary.new_records, 1);
        assert_eq!(scheduler.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_location_is_a_failure_not_an_abort() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("Bad/Name, NH", vec![shop("n_1", "Hannaford", "supermarket")])
            .with_place("Dover, NH", vec![shop("n_2", "Market", "grocery")]);
        let sink = RejectingSink {
            query: "Bad/Name, NH".to_string(),
            location_specific: true,
        };
        let mut scheduler = h.scheduler_with_sink(provider, StopBudget::Count(2), Box::new(sink));

        let summary = scheduler
            .run(&targets(&["Bad/Name, NH", "Dover, NH"]))
            .await
            .unwrap();

        assert_eq!(summary.locations_processed, 2);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.failures[0].index, 0);
        assert!(summary.failures[0].message.contains("cannot create"));
        assert_eq!(summary.new_records, 1);
        assert!(!scheduler.ledger().contains("n_1"));
        assert!(scheduler.ledger().contains("n_2"));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_disk_failure_aborts_before_cursor_moves() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("A, NH", vec![shop("n_a", "A", "grocery")])
            .with_place("B, NH", vec![shop("n_b", "B", "grocery")])
            .with_place("C, NH", vec![shop("n_c", "C", "grocery")]);
        let sink = RejectingSink {
            query: "B, NH".to_string(),
            location_specific: false,
        };
        let mut scheduler = h.scheduler_with_sink(provider, StopBudget::Count(3), Box::new(sink));

        let result = scheduler.run(&targets(&["A, NH", "B, NH", "C, NH"])).await;

        assert!(matches!(result, Err(HiveError::Output(_))));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(h.cursor_store().load(3).next_index, 1);
        assert!(!scheduler.ledger().contains("n_b"));
    }

    #[tokio::test]
    async fn test_empty_list_is_no_work() {
        let h = Harness::new();
        let mut scheduler = h.scheduler(StubProvider::default(), StopBudget::Count(5));
        let summary = scheduler.run(&[]).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::NoWork);
        assert_eq!(summary.locations_processed, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(!Path::new(h.cursor_store().path()).exists());
    }

    #[tokio::test]
    async fn test_zero_time_budget_processes_nothing() {
        let h = Harness::new();
        let mut scheduler = h.scheduler(StubProvider::default(), StopBudget::Time(Duration::ZERO));
        let summary = scheduler.run(&targets(&["A, NH"])).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::TimeBudget);
        assert_eq!(summary.locations_processed, 0);
    }

    #[tokio::test]
    async fn test_time_budget_stops_after_full_pass() {
        let h = Harness::new();
        let mut scheduler =
            h.scheduler(StubProvider::default(), StopBudget::Time(Duration::from_secs(600)));
        let summary = scheduler.run(&targets(&["A, NH", "B, NH"])).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::FullPass);
        assert_eq!(summary.locations_processed, 2);
    }

    #[tokio::test]
    async fn test_ledger_is_updated_before_next_location() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("A, NH", vec![shop("n_a", "A", "grocery")])
            .with_place(
                "B, NH",
                vec![shop("n_b1", "B1", "grocery"), shop("n_b2", "B2", "grocery")],
            )
            .with_place("C, NH", vec![shop("n_c", "C", "grocery")]);
        let mut scheduler = h.scheduler(provider, StopBudget::Count(3));
        scheduler
            .run(&targets(&["A, NH", "B, NH", "C, NH"]))
            .await
            .unwrap();

        // Ledger size seen by the sink at each write: everything before it, nothing after
        let sizes: Vec<usize> = h.writes().into_iter().map(|w| w.2).collect();
        assert_eq!(sizes, vec![0, 1, 3]);
    }

    #[tokio::test]
    async fn test_checkpoint_flushes_ledger_and_cursor() {
        let h = Harness::new();
        let provider = StubProvider::default()
            .with_place("A, NH", vec![shop("n_a", "A", "grocery")])
            .with_place("B, NH", vec![shop("n_b", "B", "grocery")]);
        let config = CheckpointConfig {
            database_path: ":memory:".to_string(),
            every_locations: Some(1),
            every_secs: None,
        };
        let store = SqliteCheckpointStore::new_in_memory().unwrap();
        let checkpointer = Checkpointer::begin(Box::new(store), "hash", &config).unwrap();

        let mut scheduler = h
            .scheduler(provider, StopBudget::Count(2))
            .with_checkpointer(checkpointer);
        scheduler
            .run(&targets(&["A, NH", "B, NH"]))
            .await
            .unwrap();

        let checkpointer = scheduler.checkpointer().unwrap();
        let store = checkpointer.store();
        assert_eq!(store.count_ledger().unwrap(), 2);
        assert_eq!(store.load_cursor().unwrap(), Some(Cursor::start(2)));

        let run = store.get_run(checkpointer.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.counters.locations_processed, 2);
        assert_eq!(run.counters.new_records, 2);
    }

    #[test]
    fn test_budget_from_config_prefers_time() {
        let config = BudgetConfig {
            max_locations: 5,
            time_budget_secs: Some(60),
        };
        assert_eq!(
            StopBudget::from_config(&config),
            StopBudget::Time(Duration::from_secs(60))
        );

        let config = BudgetConfig {
            max_locations: 5,
            time_budget_secs: None,
        };
        assert_eq!(StopBudget::from_config(&config), StopBudget::Count(5));
    }

    #[test]
    fn test_full_pass_eta() {
        let cursor = Cursor {
            next_index: 3,
            total_count: 10,
        };
        assert_eq!(
            full_pass_eta(&cursor, Duration::from_secs(2)),
            Duration::from_secs(14)
        );
        assert_eq!(full_pass_eta(&Cursor::start(10), Duration::from_secs(2)), Duration::ZERO);
        assert_eq!(full_pass_eta(&Cursor::start(0), Duration::from_secs(2)), Duration::ZERO);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_hms(Duration::from_secs(3725)), "1:02:05");
    }
}
