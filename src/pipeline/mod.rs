//! The three ETL stages as lessons, plus the end-to-end run simulator.

pub mod extract;
pub mod load;
pub mod simulator;
pub mod transform;

pub use extract::{Extractor, SourceKind, StagingArea};
pub use load::{incremental_load, full_load, LoadActivity, LoadStrategy, Warehouse, WarehouseLoader};
pub use simulator::{OverviewView, PhaseTimings, PipelinePhase, PipelineSimulator, SimulatorState};
pub use transform::{transform, Rule, TransformRules};
