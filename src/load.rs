//! Overtraining detection from rolling weekly load
//!
//! # Acute:Chronic Workload Ratio
//!
//! ACWR compares this week's training volume (minutes) with last week's:
//!
//! - **> 1.5**: brutal volume increase, high injury/overreaching risk
//! - **1.3 - 1.5**: high volume, monitor fatigue
//! - **<= 1.3**: sustainable progression
//!
//! Intense-session density and rest-day count are checked alongside, and
//! optional nutrition findings are folded into the same signal list. The
//! recovery score is a discrete mapping of the overall status (85/65/40).

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::aggregation::WeeklyWindows;
use crate::error::{CalculationError, ClimbRsError, Result};
use crate::nutrition::NutritionAssessment;

/// Signal and recommendation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadThresholds {
    /// ACWR above which volume growth is critical
    pub acwr_critical: f64,

    /// ACWR above which volume growth is a warning
    pub acwr_warning: f64,

    /// More intense sessions than this in 7 days is critical
    pub max_intense_sessions: usize,

    /// Intensity (0-10) above which a session counts as intense
    pub intense_threshold: u8,

    /// Fewer rest days than this in 7 days is a warning
    pub min_rest_days: u32,

    /// Daily calorie deficit (kcal) above which a warning is raised
    pub calorie_deficit_limit: f64,
}

impl Default for LoadThresholds {
    fn default() -> Self {
        LoadThresholds {
            acwr_critical: 1.5,
            acwr_warning: 1.3,
            max_intense_sessions: 3,
            intense_threshold: 7,
            min_rest_days: 2,
            calorie_deficit_limit: 500.0,
        }
    }
}

impl LoadThresholds {
    /// Reject combinations the detector cannot order
    pub fn validate(&self) -> Result<()> {
        let invalid = |parameter: &str, value: String| -> ClimbRsError {
            CalculationError::InvalidParameter {
                calculation: "load thresholds".to_string(),
                parameter: parameter.to_string(),
                value,
            }
            .into()
        };

        if !(self.acwr_warning > 0.0 && self.acwr_warning < self.acwr_critical) {
            return Err(invalid(
                "acwr_warning",
                format!("{} (acwr_critical {})", self.acwr_warning, self.acwr_critical),
            ));
        }
        if self.intense_threshold > 10 {
            return Err(invalid("intense_threshold", self.intense_threshold.to_string()));
        }
        if self.min_rest_days > 7 {
            return Err(invalid("min_rest_days", self.min_rest_days.to_string()));
        }
        Ok(())
    }
}

/// Overall training-load status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Optimal,
    Warning,
    Critical,
}

impl RiskStatus {
    /// Discrete recovery score for the status
    pub fn recovery_score(&self) -> u8 {
        match self {
            RiskStatus::Optimal => 85,
            RiskStatus::Warning => 65,
            RiskStatus::Critical => 40,
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskStatus::Optimal => write!(f, "optimal"),
            RiskStatus::Warning => write!(f, "warning"),
            RiskStatus::Critical => write!(f, "critical"),
        }
    }
}

/// How serious a single signal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSeverity {
    /// Informational, never changes the status
    Info,
    Warning,
    Critical,
}

/// What a signal is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    VolumeSpike,
    HighVolume,
    TooManyIntenseSessions,
    InsufficientRecovery,
    ProteinDeficit,
    CalorieDeficit,
    HydrationConcern,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    #[serde(rename = "type")]
    pub severity: SignalSeverity,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Raw numbers behind the assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMetrics {
    pub acwr: f64,
    pub rest_days: u32,
    pub intense_sessions: usize,
    pub volume_trend_pct: i64,
    pub current_volume_minutes: f64,
    pub previous_volume_minutes: f64,
    /// Present only when a nutrition profile was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionAssessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertrainingAssessment {
    pub status: RiskStatus,
    pub signals: Vec<Signal>,
    pub recommendations: Vec<Recommendation>,
    pub metrics: LoadMetrics,
    /// Always one of 40, 65 or 85
    pub recovery_score: u8,
}

impl OvertrainingAssessment {
    pub fn has_signal(&self, kind: SignalKind) -> bool {
        self.signals.iter().any(|s| s.kind == kind)
    }
}

/// Volume ratio guarded against an empty previous week.
///
/// The guard is on the previous *volume*, not the activity count, so a
/// week of zero-duration entries still yields the neutral ratio.
pub fn acwr_volume(current_volume: f64, previous_volume: f64) -> f64 {
    if previous_volume > 0.0 {
        current_volume / previous_volume
    } else {
        1.0
    }
}

/// Percent change of volume week over week, 0 when there is no prior week
pub fn volume_trend_pct(current_volume: f64, previous_volume: f64) -> i64 {
    if previous_volume > 0.0 {
        ((current_volume - previous_volume) / previous_volume * 100.0).round() as i64
    } else {
        0
    }
}

/// Turns weekly windows into an overtraining assessment
#[derive(Debug, Clone, Default)]
pub struct LoadSignalDetector {
    thresholds: LoadThresholds,
}

impl LoadSignalDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: LoadThresholds) -> Self {
        LoadSignalDetector { thresholds }
    }

    pub fn thresholds(&self) -> &LoadThresholds {
        &self.thresholds
    }

    /// Assess the two windows, folding in nutrition findings when present
    pub fn detect(
        &self,
        windows: &WeeklyWindows,
        nutrition: Option<&NutritionAssessment>,
    ) -> OvertrainingAssessment {
        let current_volume = windows.last_7_days.total_minutes;
        let previous_volume = windows.previous_7_days.total_minutes;
        let acwr = acwr_volume(current_volume, previous_volume);
        let intense_sessions = windows.last_7_days.intense_sessions();
        let rest_days = windows.rest_days();

        debug!(acwr, intense_sessions, rest_days, "Computed load ratios");

        let mut signals = Vec::new();

        if windows.is_empty() {
            signals.push(Signal {
                kind: SignalKind::InsufficientData,
                severity: SignalSeverity::Info,
                title: "Insufficient data".to_string(),
                description: "No activities recorded in the last 14 days; load risk cannot be assessed."
                    .to_string(),
            });
        } else {
            signals.extend(self.load_signals(acwr, intense_sessions, windows.intense_threshold, rest_days));
        }

        if let Some(nutrition) = nutrition {
            signals.extend(self.nutrition_signals(nutrition));
        }

        let status = Self::status_from_signals(&signals);
        let recommendations = Self::recommendations(status, &signals, nutrition);

        OvertrainingAssessment {
            status,
            recovery_score: status.recovery_score(),
            signals,
            recommendations,
            metrics: LoadMetrics {
                acwr,
                rest_days,
                intense_sessions,
                volume_trend_pct: volume_trend_pct(current_volume, previous_volume),
                current_volume_minutes: current_volume,
                previous_volume_minutes: previous_volume,
                nutrition: nutrition.cloned(),
            },
        }
    }

    /// `intense_threshold` is the cutoff the windows were counted with, which
    /// may differ from the configured one
    fn load_signals(
        &self,
        acwr: f64,
        intense_sessions: usize,
        intense_threshold: u8,
        rest_days: u32,
    ) -> Vec<Signal> {
        let t = &self.thresholds;
        let mut signals = Vec::new();

        if acwr > t.acwr_critical {
            signals.push(Signal {
                kind: SignalKind::VolumeSpike,
                severity: SignalSeverity::Critical,
                title: "Brutal volume increase".to_string(),
                description: format!(
                    "Training volume is {:.1}x last week's. Increases above {:.1}x sharply raise injury risk.",
                    acwr, t.acwr_critical
                ),
            });
        } else if acwr > t.acwr_warning {
            signals.push(Signal {
                kind: SignalKind::HighVolume,
                severity: SignalSeverity::Warning,
                title: "High volume".to_string(),
                description: format!(
                    "Training volume is {:.1}x last week's. Monitor fatigue closely.",
                    acwr
                ),
            });
        }

        if intense_sessions > t.max_intense_sessions {
            signals.push(Signal {
                kind: SignalKind::TooManyIntenseSessions,
                severity: SignalSeverity::Critical,
                title: "Too many intense workouts".to_string(),
                description: format!(
                    "{} sessions above intensity {} in the last 7 days (limit {}).",
                    intense_sessions, intense_threshold, t.max_intense_sessions
                ),
            });
        }

        if rest_days < t.min_rest_days {
            signals.push(Signal {
                kind: SignalKind::InsufficientRecovery,
                severity: SignalSeverity::Warning,
                title: "Insufficient recovery".to_string(),
                description: format!(
                    "Only {} rest day(s) in the last 7 days; at least {} are recommended.",
                    rest_days, t.min_rest_days
                ),
            });
        }

        signals
    }

    fn nutrition_signals(&self, nutrition: &NutritionAssessment) -> Vec<Signal> {
        let mut signals = Vec::new();

        if nutrition.protein_deficit {
            signals.push(Signal {
                kind: SignalKind::ProteinDeficit,
                severity: SignalSeverity::Warning,
                title: "Protein deficit".to_string(),
                description: format!(
                    "Estimated intake of {} g/day is well below the recommended {} g/day.",
                    nutrition.current_protein_g, nutrition.recommended_protein_g
                ),
            });
        }

        if nutrition.calorie_deficit > self.thresholds.calorie_deficit_limit {
            signals.push(Signal {
                kind: SignalKind::CalorieDeficit,
                severity: SignalSeverity::Warning,
                title: "Calorie deficit".to_string(),
                description: format!(
                    "Intake is about {:.0} kcal/day below the estimated need of {:.0} kcal.",
                    nutrition.calorie_deficit, nutrition.estimated_daily_calories
                ),
            });
        }

        if nutrition.hydration_concern {
            signals.push(Signal {
                kind: SignalKind::HydrationConcern,
                severity: SignalSeverity::Info,
                title: "Hydration".to_string(),
                description: format!(
                    "At this volume aim for about {:.1} L of fluid per day.",
                    nutrition.recommended_hydration_l
                ),
            });
        }

        signals
    }

    /// Critical beats warning beats optimal; info signals never count
    pub fn status_from_signals(signals: &[Signal]) -> RiskStatus {
        match signals.iter().map(|s| s.severity).max() {
            Some(SignalSeverity::Critical) => RiskStatus::Critical,
            Some(SignalSeverity::Warning) => RiskStatus::Warning,
            _ => RiskStatus::Optimal,
        }
    }

    fn recommendations(
        status: RiskStatus,
        signals: &[Signal],
        nutrition: Option<&NutritionAssessment>,
    ) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = signals
            .iter()
            .map(|signal| {
                let priority = match signal.severity {
                    SignalSeverity::Critical => Priority::High,
                    SignalSeverity::Warning => Priority::Medium,
                    SignalSeverity::Info => Priority::Low,
                };
                let (title, description) = match signal.kind {
                    SignalKind::VolumeSpike => (
                        "Cut back volume",
                        "Reduce this week's volume by 20-30% and keep increases under 10% per week.",
                    ),
                    SignalKind::HighVolume => (
                        "Stabilize volume",
                        "Hold volume at the current level for a week before increasing again.",
                    ),
                    SignalKind::TooManyIntenseSessions => (
                        "Replace intense sessions",
                        "Limit hard efforts to 2-3 per week and swap the rest for zone 2 rides.",
                    ),
                    SignalKind::InsufficientRecovery => (
                        "Schedule rest days",
                        "Plan at least two full rest or active-recovery days this week.",
                    ),
                    SignalKind::ProteinDeficit => (
                        "Increase protein",
                        "Spread 20-30 g of protein over each meal and after every ride.",
                    ),
                    SignalKind::CalorieDeficit => (
                        "Eat to fuel training",
                        "Add carbohydrate-rich snacks around sessions to close the energy gap.",
                    ),
                    SignalKind::HydrationConcern => (
                        "Hydrate",
                        "Drink 500-750 ml per hour of riding and rehydrate after sessions.",
                    ),
                    SignalKind::InsufficientData => (
                        "Log more rides",
                        "Record at least a week of activities to unlock load analysis.",
                    ),
                };
                Recommendation {
                    title: title.to_string(),
                    description: description.to_string(),
                    priority,
                }
            })
            .collect();

        if let Some(n) = nutrition {
            if n.carbs_ratio_low {
                recommendations.push(Recommendation {
                    title: "Raise carbohydrate share".to_string(),
                    description: format!(
                        "Aim for about {:.0}% of calories ({} g/day) from carbohydrates.",
                        n.recommended_carbs_pct, n.recommended_carbs_g
                    ),
                    priority: Priority::Low,
                });
            }
            if n.pre_workout_nutrition {
                recommendations.push(Recommendation {
                    title: "Pre-workout fueling".to_string(),
                    description: "Eat an easily digested carbohydrate meal 2-3 hours before long sessions."
                        .to_string(),
                    priority: Priority::Low,
                });
            }
        }

        if status == RiskStatus::Optimal && signals.is_empty() {
            recommendations.push(Recommendation {
                title: "Maintain consistency".to_string(),
                description: "Load is well balanced. Keep progressing gradually.".to_string(),
                priority: Priority::Low,
            });
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::ActivityAggregator;
    use crate::models::{Activity, Macronutrients, NutritionProfile};
    use crate::nutrition::NutritionCrossAnalyzer;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 23, 12, 0, 0).unwrap()
    }

    fn ride_days_ago(days: i64, minutes: u32, intensity: u8) -> Activity {
        Activity {
            date: (now() - Duration::days(days)).to_rfc3339(),
            duration_seconds: minutes * 60,
            distance_km: 40.0,
            average_speed_kmh: 28.0,
            heart_rate_avg: 145.0,
            intensity: f64::from(intensity),
            elevation_gain_m: 600.0,
        }
    }

    fn assess(activities: &[Activity]) -> OvertrainingAssessment {
        let windows = ActivityAggregator::new().aggregate(activities, now());
        LoadSignalDetector::new().detect(&windows, None)
    }

    #[test]
    fn test_threshold_validation() {
        assert!(LoadThresholds::default().validate().is_ok());

        let inverted = LoadThresholds {
            acwr_warning: 1.6,
            ..LoadThresholds::default()
        };
        let err = inverted.validate().unwrap_err();
        assert!(matches!(
            err,
            ClimbRsError::Calculation(CalculationError::InvalidParameter { ref parameter, .. })
                if parameter == "acwr_warning"
        ));

        let too_many_rest_days = LoadThresholds {
            min_rest_days: 8,
            ..LoadThresholds::default()
        };
        assert!(too_many_rest_days.validate().is_err());
    }

    #[test]
    fn test_acwr_guard() {
        assert_eq!(acwr_volume(300.0, 0.0), 1.0);
        assert_eq!(acwr_volume(0.0, 0.0), 1.0);
        assert_eq!(acwr_volume(450.0, 300.0), 1.5);
        assert_eq!(volume_trend_pct(450.0, 300.0), 50);
        assert_eq!(volume_trend_pct(450.0, 0.0), 0);
        assert_eq!(volume_trend_pct(200.0, 300.0), -33);
    }

    #[test]
    fn test_balanced_week_is_optimal() {
        let activities = vec![
            ride_days_ago(1, 60, 5),
            ride_days_ago(3, 90, 6),
            ride_days_ago(5, 60, 4),
            ride_days_ago(8, 60, 5),
            ride_days_ago(10, 90, 6),
            ride_days_ago(12, 60, 4),
        ];

        let assessment = assess(&activities);
        assert_eq!(assessment.status, RiskStatus::Optimal);
        assert_eq!(assessment.recovery_score, 85);
        assert_eq!(assessment.metrics.acwr, 1.0);
        assert!(assessment.signals.is_empty());
        assert_eq!(assessment.recommendations.len(), 1);
        assert_eq!(assessment.recommendations[0].priority, Priority::Low);
    }

    #[test]
    fn test_volume_spike_is_critical() {
        let activities = vec![
            ride_days_ago(1, 120, 5),
            ride_days_ago(3, 120, 5),
            ride_days_ago(9, 100, 5),
        ];

        let assessment = assess(&activities);
        assert!(assessment.has_signal(SignalKind::VolumeSpike));
        assert_eq!(assessment.status, RiskStatus::Critical);
        assert_eq!(assessment.recovery_score, 40);
        assert_eq!(assessment.metrics.volume_trend_pct, 140);
    }

    #[test]
    fn test_high_volume_is_warning() {
        let activities = vec![
            ride_days_ago(1, 70, 5),
            ride_days_ago(3, 70, 5),
            ride_days_ago(9, 100, 5),
        ];

        let assessment = assess(&activities);
        assert!(assessment.has_signal(SignalKind::HighVolume));
        assert!(!assessment.has_signal(SignalKind::VolumeSpike));
        assert_eq!(assessment.status, RiskStatus::Warning);
        assert_eq!(assessment.recovery_score, 65);
    }

    #[test]
    fn test_insufficient_recovery() {
        let activities: Vec<Activity> = (0..6).map(|d| ride_days_ago(d, 30, 4)).collect();

        let assessment = assess(&activities);
        assert_eq!(assessment.metrics.rest_days, 1);
        assert!(assessment.has_signal(SignalKind::InsufficientRecovery));
        assert_eq!(assessment.status, RiskStatus::Warning);
    }

    #[test]
    fn test_empty_history_reports_insufficient_data() {
        let assessment = assess(&[]);

        assert_eq!(assessment.status, RiskStatus::Optimal);
        assert_eq!(assessment.recovery_score, 85);
        assert!(assessment.has_signal(SignalKind::InsufficientData));
        assert!(assessment.metrics.nutrition.is_none());
    }

    #[test]
    fn test_nutrition_signals_are_appended() {
        let activities = vec![ride_days_ago(1, 400, 5), ride_days_ago(3, 300, 5), ride_days_ago(9, 700, 5)];
        let windows = ActivityAggregator::new().aggregate(&activities, now());
        let profile = NutritionProfile {
            weight_kg: 70.0,
            daily_calories: Some(2200.0),
            macronutrients: None,
        };
        let nutrition = NutritionCrossAnalyzer::analyze(&profile, windows.last_7_days.total_minutes);

        let assessment = LoadSignalDetector::new().detect(&windows, Some(&nutrition));

        // 2000 + 700 * 10 / 7 = 3000 kcal needed vs 2200 eaten
        assert!(assessment.has_signal(SignalKind::CalorieDeficit));
        assert!(assessment.has_signal(SignalKind::HydrationConcern));
        assert!(!assessment.has_signal(SignalKind::ProteinDeficit));
        assert_eq!(assessment.status, RiskStatus::Warning);
        assert!(assessment.metrics.nutrition.is_some());
    }

    #[test]
    fn test_low_protein_and_carbs_recommendations() {
        let activities: Vec<Activity> = [1, 2, 4, 8, 9, 10]
            .into_iter()
            .map(|days| ride_days_ago(days, 150, 5))
            .collect();
        let windows = ActivityAggregator::new().aggregate(&activities, now());
        let profile = NutritionProfile {
            weight_kg: 70.0,
            daily_calories: Some(3200.0),
            macronutrients: Some(Macronutrients {
                carbs_pct: 40.0,
                protein_pct: 10.0,
                fat_pct: 50.0,
            }),
        };
        let nutrition = NutritionCrossAnalyzer::analyze(&profile, windows.last_7_days.total_minutes);

        let assessment = LoadSignalDetector::new().detect(&windows, Some(&nutrition));

        // 80 g eaten vs 1.8 g/kg * 70 kg = 126 g recommended
        let protein = assessment
            .signals
            .iter()
            .find(|s| s.kind == SignalKind::ProteinDeficit)
            .unwrap();
        assert_eq!(protein.severity, SignalSeverity::Warning);
        assert!(protein.description.contains("80 g/day"));
        assert!(protein.description.contains("126 g/day"));
        assert!(!assessment.has_signal(SignalKind::CalorieDeficit));
        assert_eq!(assessment.status, RiskStatus::Warning);

        let titles: Vec<&str> = assessment.recommendations.iter().map(|r| r.title.as_str()).collect();
        assert!(titles.contains(&"Increase protein"));
        assert!(titles.contains(&"Raise carbohydrate share"));
        assert!(titles.contains(&"Pre-workout fueling"));

        let carbs = assessment
            .recommendations
            .iter()
            .find(|r| r.title == "Raise carbohydrate share")
            .unwrap();
        // 60% of 2643 kcal / 4 kcal per gram
        assert!(carbs.description.contains("60% of calories (396 g/day)"));
        assert_eq!(carbs.priority, Priority::Low);
    }

    #[test]
    fn test_intense_description_uses_window_threshold() {
        let activities: Vec<Activity> = (1..=4).map(|days| ride_days_ago(days, 60, 6)).collect();
        let windows = ActivityAggregator::with_intense_threshold(5).aggregate(&activities, now());

        let assessment = LoadSignalDetector::new().detect(&windows, None);

        let signal = assessment
            .signals
            .iter()
            .find(|s| s.kind == SignalKind::TooManyIntenseSessions)
            .unwrap();
        assert!(signal.description.starts_with("4 sessions above intensity 5"));
        assert_eq!(LoadSignalDetector::new().thresholds().intense_threshold, 7);
    }

    #[test]
    fn test_info_signals_do_not_change_status() {
        let signals = vec![Signal {
            kind: SignalKind::HydrationConcern,
            severity: SignalSeverity::Info,
            title: "Hydration".to_string(),
            description: String::new(),
        }];
        assert_eq!(LoadSignalDetector::status_from_signals(&signals), RiskStatus::Optimal);
    }

    #[test]
    fn test_recovery_score_monotonic() {
        assert!(RiskStatus::Optimal.recovery_score() > RiskStatus::Warning.recovery_score());
        assert!(RiskStatus::Warning.recovery_score() > RiskStatus::Critical.recovery_score());
    }

    proptest! {
        #[test]
        fn test_acwr_identity(volume in 0.01f64..10_000.0) {
            prop_assert_eq!(acwr_volume(volume, volume), 1.0);
        }

        #[test]
        fn test_recovery_score_domain(
            minutes in proptest::collection::vec((0i64..14, 0u32..240, 0u8..=10), 0..20)
        ) {
            let activities: Vec<Activity> = minutes
                .into_iter()
                .map(|(days, mins, intensity)| ride_days_ago(days, mins, intensity))
                .collect();
            let assessment = assess(&activities);
            prop_assert!([40u8, 65, 85].contains(&assessment.recovery_score));
            prop_assert_eq!(assessment.recovery_score, assessment.status.recovery_score());
        }
    }
}
