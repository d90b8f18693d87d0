//! Single entry point over the analytics modules, configured once from
//! [`AppConfig`].

use chrono::{DateTime, Utc};

use crate::aggregation::ActivityAggregator;
use crate::climb_match::{ClimbCapabilityMatcher, ClimbMatch};
use crate::config::{AppConfig, ProjectionSettings};
use crate::error::CalculationError;
use crate::load::{LoadSignalDetector, OvertrainingAssessment};
use crate::logging::log_error;
use crate::models::{Activity, ClimbDescriptor, NutritionProfile, UserCapabilities};
use crate::nutrition::NutritionCrossAnalyzer;
use crate::projection::{FitnessMetric, NoJitter, PerformanceProjection, PerformanceProjector, TimeRange};
use crate::training_plan::{PeriodizationPlanner, TrainingProgram};

#[derive(Debug, Clone, Default)]
pub struct TrainingEngine {
    aggregator: ActivityAggregator,
    detector: LoadSignalDetector,
    planner: PeriodizationPlanner,
    projection: ProjectionSettings,
}

impl TrainingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let detector = LoadSignalDetector::with_thresholds(config.load.clone());
        TrainingEngine {
            aggregator: ActivityAggregator::with_intense_threshold(detector.thresholds().intense_threshold),
            detector,
            planner: PeriodizationPlanner::with_settings(config.planner.clone()),
            projection: config.projection.clone(),
        }
    }

    /// Overtraining risk over the last 14 days, with nutrition cross-checks
    /// when a profile is given
    pub fn assess_overtraining(
        &self,
        activities: &[Activity],
        nutrition: Option<&NutritionProfile>,
        now: DateTime<Utc>,
    ) -> OvertrainingAssessment {
        let windows = self.aggregator.aggregate(activities, now);
        if windows.is_empty() {
            log_error(
                &CalculationError::InsufficientData {
                    calculation: "overtraining assessment".to_string(),
                    reason: "no activities in the last 14 days".to_string(),
                }
                .into(),
            );
        }
        let nutrition = nutrition
            .map(|profile| NutritionCrossAnalyzer::analyze(profile, windows.last_7_days.total_minutes));

        self.detector.detect(&windows, nutrition.as_ref())
    }

    pub fn project_performance(
        &self,
        metric: FitnessMetric,
        activities: &[Activity],
        range: TimeRange,
        now: DateTime<Utc>,
    ) -> PerformanceProjection {
        match self.projection.jitter() {
            Some(mut jitter) => PerformanceProjector::project(metric, activities, range, now, &mut jitter),
            None => PerformanceProjector::project(metric, activities, range, now, &mut NoJitter),
        }
    }

    pub fn match_climb(&self, capabilities: &UserCapabilities, climb: &ClimbDescriptor) -> ClimbMatch {
        ClimbCapabilityMatcher::evaluate(capabilities, climb)
    }

    pub fn generate_program(
        &self,
        capabilities: &UserCapabilities,
        climb: &ClimbDescriptor,
        now: DateTime<Utc>,
    ) -> TrainingProgram {
        let climb_match = self.match_climb(capabilities, climb);
        self.planner.generate(capabilities, climb, &climb_match, now)
    }
}
