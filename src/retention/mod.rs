//! Re-execution retention
//!
//! Decides, per journey, which executions are worth persisting under the
//! configured strategy. Decisions are returned to the caller, which applies
//! them through a `RecordStore`.

pub mod bulk;
pub mod engine;
pub mod record;
pub mod signature;
pub mod state;
pub mod strategy;

pub use bulk::{JourneyReport, group_by_journey, process_journeys};
pub use engine::{RetentionEngine, RetentionSettings, RetentionStats};
pub use record::{ExecutionRecord, RawExecution, RetentionDecision};
pub use signature::VolatileTextNormalizer;
pub use state::JourneySnapshot;
pub use strategy::RetentionStrategy;
