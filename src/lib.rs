// Library interface for climbrs modules
// Integration tests and benches use the engine through this crate

pub mod aggregation;
pub mod climb_match;
pub mod config;
pub mod engine;
pub mod error;
pub mod load;
pub mod logging;
pub mod models;
pub mod nutrition;
pub mod projection;
pub mod training_plan;

// Re-export commonly used types for convenience
pub use models::*;
pub use aggregation::{ActivityAggregator, WeeklyWindows};
pub use climb_match::{ClimbCapabilityMatcher, ClimbMatch, MatchRating};
pub use config::AppConfig;
pub use engine::TrainingEngine;
pub use error::{ClimbRsError, Result};
pub use load::{LoadSignalDetector, LoadThresholds, OvertrainingAssessment, RiskStatus};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use nutrition::{NutritionAssessment, NutritionCrossAnalyzer};
pub use projection::{FitnessMetric, PerformanceProjection, PerformanceProjector, TimeRange};
pub use training_plan::{PeriodizationPlanner, TrainingProgram};
