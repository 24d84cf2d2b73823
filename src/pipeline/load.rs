//! Full-replace and upsert strategies for the warehouse table.

use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::domain::demo_data::{full_load_final_state, incoming_data, initial_warehouse};
use crate::domain::Record;
use crate::error::AcademyError;
use crate::observability::LOADS;
use crate::scheduler::{lock, TimerTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    Full,
    Incremental,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStrategy::Full => f.write_str("full"),
            LoadStrategy::Incremental => f.write_str("incremental"),
        }
    }
}

impl FromStr for LoadStrategy {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "truncate" => Ok(LoadStrategy::Full),
            "incremental" | "upsert" => Ok(LoadStrategy::Incremental),
            other => Err(AcademyError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Destructive replace: the result is exactly `final_state`, order preserved.
pub fn full_load(final_state: &[Record]) -> Vec<Record> {
    final_state.to_vec()
}

/// Upsert `incoming` into `warehouse`. Matching ids are replaced in place,
/// unknown ids are appended in incoming order.
pub fn incremental_load(warehouse: &[Record], incoming: &[Record]) -> Vec<Record> {
    let mut rows = warehouse.to_vec();
    let mut positions: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();

    for record in incoming {
        match positions.get(&record.id) {
            Some(&i) => rows[i] = record.clone(),
            None => {
                positions.insert(record.id.clone(), rows.len());
                rows.push(record.clone());
            }
        }
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadActivity {
    Idle,
    Full,
    Incremental,
}

/// A load waiting for its completion delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLoad {
    pub generation: u64,
    pub strategy: LoadStrategy,
}

/// The destination table together with its seed and current load activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warehouse {
    #[serde(skip)]
    seed: Vec<Record>,
    rows: Vec<Record>,
    activity: LoadActivity,
    #[serde(skip)]
    generation: u64,
}

impl Default for Warehouse {
    fn default() -> Self {
        Self::new(initial_warehouse().to_vec())
    }
}

impl Warehouse {
    pub fn new(seed: Vec<Record>) -> Self {
        Self {
            rows: seed.clone(),
            seed,
            activity: LoadActivity::Idle,
            generation: 0,
        }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn activity(&self) -> LoadActivity {
        self.activity
    }

    pub fn is_idle(&self) -> bool {
        self.activity == LoadActivity::Idle
    }

    /// Start a load. A full load truncates immediately so the empty table is
    /// observable until completion. Returns `None` while another load runs.
    pub fn begin(&mut self, strategy: LoadStrategy) -> Option<PendingLoad> {
        if !self.is_idle() {
            return None;
        }
        self.generation += 1;
        match strategy {
            LoadStrategy::Full => {
                self.activity = LoadActivity::Full;
                self.rows.clear();
            }
            LoadStrategy::Incremental => self.activity = LoadActivity::Incremental,
        }
        Some(PendingLoad {
            generation: self.generation,
            strategy,
        })
    }

    /// Finish a pending load. `final_state` is used by full loads, `incoming`
    /// by incremental ones. Stale completions are ignored.
    pub fn complete(&mut self, pending: PendingLoad, final_state: &[Record], incoming: &[Record]) -> bool {
        if pending.generation != self.generation || self.is_idle() {
            return false;
        }
        self.rows = match pending.strategy {
            LoadStrategy::Full => full_load(final_state),
            LoadStrategy::Incremental => incremental_load(&self.rows, incoming),
        };
        self.activity = LoadActivity::Idle;
        true
    }

    /// Back to the seed rows; any pending completion becomes stale.
    pub fn reset(&mut self) {
        self.rows = self.seed.clone();
        self.activity = LoadActivity::Idle;
        self.generation += 1;
    }

    /// Highlight rule: idle, id present in `incoming` and amount equal to the
    /// incoming record's amount.
    pub fn is_fresh(&self, row: &Record, incoming: &[Record]) -> bool {
        self.is_idle()
            && incoming
                .iter()
                .find(|i| i.id == row.id)
                .is_some_and(|i| i.amount == row.amount)
    }
}

/// Snapshot served to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseView {
    pub activity: LoadActivity,
    pub rows: Vec<WarehouseRow>,
    pub incoming: Vec<Record>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseRow {
    #[serde(flatten)]
    pub record: Record,
    pub fresh: bool,
}

/// Hosts a [`Warehouse`] and completes loads after the configured delay.
pub struct WarehouseLoader {
    warehouse: Arc<Mutex<Warehouse>>,
    timers: Mutex<TimerTable>,
    tx: Arc<watch::Sender<LoadActivity>>,
    incoming: Arc<Vec<Record>>,
    final_state: Arc<Vec<Record>>,
    delay: Duration,
}

impl WarehouseLoader {
    pub fn new(warehouse: Warehouse, incoming: Vec<Record>, final_state: Vec<Record>, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(warehouse.activity());
        Self {
            warehouse: Arc::new(Mutex::new(warehouse)),
            timers: Mutex::new(TimerTable::new("warehouse_loader")),
            tx: Arc::new(tx),
            incoming: Arc::new(incoming),
            final_state: Arc::new(final_state),
            delay,
        }
    }

    /// Loader over the demo seed, incoming queue and full-load final state.
    pub fn demo(delay: Duration) -> Self {
        Self::new(
            Warehouse::default(),
            incoming_data().to_vec(),
            full_load_final_state(),
            delay,
        )
    }

    pub fn snapshot(&self) -> Warehouse {
        lock(&self.warehouse).clone()
    }

    pub fn view(&self) -> WarehouseView {
        let warehouse = lock(&self.warehouse);
        let rows = warehouse
            .rows()
            .iter()
            .map(|r| WarehouseRow {
                record: r.clone(),
                fresh: warehouse.is_fresh(r, &self.incoming),
            })
            .collect();
        WarehouseView {
            activity: warehouse.activity(),
            rows,
            incoming: self.incoming.to_vec(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadActivity> {
        self.tx.subscribe()
    }

    /// Kick off a load. Returns `false` while another load is in flight.
    #[instrument(skip(self))]
    pub fn begin(&self, strategy: LoadStrategy) -> bool {
        let mut timers = lock(&self.timers);
        let pending = {
            let mut warehouse = lock(&self.warehouse);
            match warehouse.begin(strategy) {
                Some(p) => {
                    self.tx.send_replace(warehouse.activity());
                    p
                }
                None => {
                    debug!("Ignoring {} load while warehouse is busy", strategy);
                    return false;
                }
            }
        };

        let shared = self.warehouse.clone();
        let tx = self.tx.clone();
        let incoming = self.incoming.clone();
        let final_state = self.final_state.clone();
        timers.schedule(self.delay, move || {
            let mut warehouse = lock(&shared);
            if warehouse.complete(pending, &final_state, &incoming) {
                info!(rows = warehouse.rows().len(), "✅ {} load complete", pending.strategy);
                tx.send_replace(warehouse.activity());
            }
        });

        counter!(LOADS, "strategy" => strategy.to_string()).increment(1);
        info!("📤 {} load started", strategy);
        true
    }

    #[instrument(skip(self))]
    pub fn reset(&self) {
        let mut timers = lock(&self.timers);
        timers.cancel_all();
        let mut warehouse = lock(&self.warehouse);
        warehouse.reset();
        self.tx.send_replace(warehouse.activity());
        info!("🔄 Warehouse reset to seed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, RecordStatus};

    fn ids(rows: &[Record]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_incremental_load_demo() {
        let merged = incremental_load(initial_warehouse(), incoming_data());
        assert_eq!(ids(&merged), vec!["U1", "U2", "U3", "U4"]);
        assert_eq!(merged[1].amount, Amount::Number(200.0));
        assert_eq!(merged[1].status, RecordStatus::Updated);
        assert_eq!(merged[0], initial_warehouse()[0]);
        assert_eq!(merged[3].status, RecordStatus::New);
    }

    #[test]
    fn test_incremental_matches_hand_assembled_full_state() {
        let merged = incremental_load(initial_warehouse(), incoming_data());
        assert_eq!(merged, full_load(&full_load_final_state()));
    }

    #[test]
    fn test_incremental_into_empty_warehouse_appends_in_order() {
        let merged = incremental_load(&[], incoming_data());
        assert_eq!(ids(&merged), vec!["U2", "U4"]);
    }

    #[test]
    fn test_full_load_truncates_then_replaces() {
        let mut warehouse = Warehouse::default();
        let pending = warehouse.begin(LoadStrategy::Full).unwrap();
        assert!(warehouse.rows().is_empty());
        assert_eq!(warehouse.activity(), LoadActivity::Full);

        assert!(warehouse.complete(pending, &full_load_final_state(), incoming_data()));
        assert_eq!(warehouse.rows(), full_load_final_state().as_slice());
        assert!(warehouse.is_idle());
    }

    #[test]
    fn test_busy_warehouse_rejects_second_load() {
        let mut warehouse = Warehouse::default();
        assert!(warehouse.begin(LoadStrategy::Incremental).is_some());
        assert!(warehouse.begin(LoadStrategy::Full).is_none());
        assert_eq!(warehouse.rows().len(), 3);
    }

    #[test]
    fn test_reset_discards_pending_completion() {
        let mut warehouse = Warehouse::default();
        let pending = warehouse.begin(LoadStrategy::Full).unwrap();
        warehouse.reset();
        assert!(!warehouse.complete(pending, &full_load_final_state(), incoming_data()));
        assert_eq!(warehouse.rows(), initial_warehouse());
    }

    #[test]
    fn test_fresh_rows_after_upsert() {
        let mut warehouse = Warehouse::default();
        let pending = warehouse.begin(LoadStrategy::Incremental).unwrap();
        warehouse.complete(pending, &[], incoming_data());
        let fresh: Vec<_> = warehouse
            .rows()
            .iter()
            .filter(|r| warehouse.is_fresh(r, incoming_data()))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(fresh, vec!["U2", "U4"]);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("upsert".parse::<LoadStrategy>().unwrap(), LoadStrategy::Incremental);
        assert_eq!("FULL".parse::<LoadStrategy>().unwrap(), LoadStrategy::Full);
        assert!("merge".parse::<LoadStrategy>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_full_load_shows_empty_transient() {
        let loader = WarehouseLoader::demo(Duration::from_millis(800));
        assert!(loader.begin(LoadStrategy::Full));
        assert!(loader.snapshot().rows().is_empty());
        assert!(!loader.begin(LoadStrategy::Incremental));

        tokio::time::sleep(Duration::from_millis(900)).await;
        let warehouse = loader.snapshot();
        assert_eq!(ids(warehouse.rows()), vec!["U1", "U2", "U3", "U4"]);
        assert!(warehouse.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_reset_cancels_pending_load() {
        let loader = WarehouseLoader::demo(Duration::from_millis(800));
        loader.begin(LoadStrategy::Incremental);
        loader.reset();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(loader.snapshot().rows(), initial_warehouse());
        assert!(loader.view().rows.iter().all(|r| !r.fresh));
    }
}
