pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod index;
pub mod planner;
pub mod progress;
pub mod resolver;
pub mod scanner;

pub use config::{AppConfig, ConfigOverrides};
pub use engine::{FileOutcome, SortEngine, SortResult, SortSummary, VerifyResult};
pub use error::Error;
pub use index::{ContentIndex, FileRecord};
pub use planner::DatePlanner;
pub use progress::{ProgressReporter, SilentReporter};
pub use scanner::Walker;
