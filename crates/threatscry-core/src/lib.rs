//! Architecture threat model analysis: model loading, the risk rule engine and
//! risk tracking reconciliation.

#[macro_use]
mod macros;

pub mod engine;
pub mod error;
pub mod input;
pub mod loader;
pub mod model;
pub mod protocol;
pub mod risk;
pub mod rules;
pub mod severity;
pub mod technology;
pub mod tracking;
pub mod types;

pub use engine::{analyze, AnalysisContext, AnalysisOptions, AnalysisReport, RiskRule, RuleRegistry};
pub use error::{AnalysisError, EngineError, ModelError, RuleError, TrackingError};
pub use loader::{build_model, load_model_file, parse_model, read_model_input};
pub use model::ParsedModel;
pub use risk::{Risk, RiskCategory, RiskStatistics};
pub use severity::calculate_severity;
