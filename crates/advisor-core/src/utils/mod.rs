pub mod error;
pub mod limiters;
pub mod telemetry;
pub mod token_estimator;

pub use error::{AdvisorError, QualityIssue, Result};
pub use limiters::Limiters;
