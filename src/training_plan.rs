use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::climb_match::{ClimbMatch, MatchRating};
use crate::error::InputError;
use crate::logging::log_error;
use crate::models::{ClimbDescriptor, Difficulty, Technicality, UserCapabilities};

/// Planner limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Longest program ever generated, in weeks
    pub max_weeks: u32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        PlannerSettings { max_weeks: 12 }
    }
}

/// Workout categories used by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Endurance,
    Strength,
    Threshold,
    ClimbSimulation,
    Sharpening,
    Reconnaissance,
    Recovery,
}

/// Coggan-style intensity zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Z1,
    Z2,
    Z3,
    Z4,
    Z5,
    Z6,
}

impl Zone {
    pub fn description(&self) -> &'static str {
        match self {
            Zone::Z1 => "Active recovery",
            Zone::Z2 => "Endurance",
            Zone::Z3 => "Tempo",
            Zone::Z4 => "Threshold",
            Zone::Z5 => "VO2max",
            Zone::Z6 => "Anaerobic",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub name: String,
    pub duration_min: u32,
    pub zone: Zone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Interval {
    fn new(name: &str, duration_min: u32, zone: Zone) -> Self {
        Interval {
            name: name.to_string(),
            duration_min,
            zone,
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Individual planned workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub name: String,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    pub duration_min: u32,
    pub tss: Decimal,
    pub intervals: Vec<Interval>,
}

/// Periodization blocks, in the order they are ridden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Base,
    Specific,
    Taper,
}

impl PhaseKind {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseKind::Base => "Base",
            PhaseKind::Specific => "Climb-specific",
            PhaseKind::Taper => "Taper",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub kind: PhaseKind,
    pub name: String,
    pub duration_weeks: u32,
    pub focus: Vec<String>,
    #[serde(rename = "weeklyTSS")]
    pub weekly_tss: Decimal,
    pub key_workouts: Vec<Workout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityLevel {
    Low,
    Medium,
    High,
}

/// What the climb demands of the rider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCapabilities {
    pub threshold: CapabilityLevel,
    pub vo2max: CapabilityLevel,
    pub endurance: CapabilityLevel,
    pub strength: CapabilityLevel,
    pub technique: CapabilityLevel,
}

/// Climb summary carried with the program for the review screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimbCharacteristics {
    pub name: String,
    pub distance_km: f64,
    pub elevation_m: f64,
    pub avg_gradient_pct: f64,
    pub max_gradient_pct: f64,
    pub difficulty: Difficulty,
    pub technicality: Technicality,
    pub estimated_minutes: u32,
    pub match_score: u8,
    pub rating: MatchRating,
}

/// One weekday of the recurring schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduledDay {
    Workout(Workout),
    Rest,
}

impl ScheduledDay {
    pub fn workout(&self) -> Option<&Workout> {
        match self {
            ScheduledDay::Workout(workout) => Some(workout),
            ScheduledDay::Rest => None,
        }
    }
}

/// Overall climb training program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingProgram {
    pub id: String,
    pub duration_weeks: u32,
    pub target_date: NaiveDate,
    pub climb_characteristics: ClimbCharacteristics,
    pub required_capabilities: RequiredCapabilities,
    pub phases: Vec<Phase>,
    /// ISO weekday (1 = Monday) to workout or rest
    pub weekly_schedule: BTreeMap<u8, ScheduledDay>,
}

impl TrainingProgram {
    pub fn phase_weeks(&self) -> u32 {
        self.phases.iter().map(|p| p.duration_weeks).sum()
    }

    /// Phase covering the 1-based program week
    pub fn phase_for_week(&self, week: u32) -> Option<&Phase> {
        let mut end = 0;
        self.phases.iter().find(|phase| {
            end += phase.duration_weeks;
            week >= 1 && week <= end
        })
    }

    pub fn weekly_planned_minutes(&self) -> u32 {
        self.weekly_schedule
            .values()
            .filter_map(ScheduledDay::workout)
            .map(|w| w.duration_min)
            .sum()
    }

    pub fn weekly_planned_tss(&self) -> Decimal {
        self.weekly_schedule
            .values()
            .filter_map(ScheduledDay::workout)
            .map(|w| w.tss)
            .sum()
    }
}

/// Weekly slot: name, type, zone, share of weekly hours, intensity factor
struct ScheduleSlot {
    name: &'static str,
    workout_type: WorkoutType,
    zone: Zone,
    share: f64,
    intensity_factor: Decimal,
}

const SCHEDULE_SLOTS: [ScheduleSlot; 4] = [
    ScheduleSlot {
        name: "Long endurance ride",
        workout_type: WorkoutType::Endurance,
        zone: Zone::Z2,
        share: 0.40,
        intensity_factor: dec!(0.6),
    },
    ScheduleSlot {
        name: "Threshold session",
        workout_type: WorkoutType::Threshold,
        zone: Zone::Z4,
        share: 0.25,
        intensity_factor: dec!(0.85),
    },
    ScheduleSlot {
        name: "Strength on the bike",
        workout_type: WorkoutType::Strength,
        zone: Zone::Z3,
        share: 0.20,
        intensity_factor: dec!(0.75),
    },
    ScheduleSlot {
        name: "Recovery spin",
        workout_type: WorkoutType::Recovery,
        zone: Zone::Z1,
        share: 0.15,
        intensity_factor: dec!(0.4),
    },
];

/// Climb-specific program generator
#[derive(Debug, Clone, Default)]
pub struct PeriodizationPlanner {
    settings: PlannerSettings,
}

impl PeriodizationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PlannerSettings) -> Self {
        PeriodizationPlanner { settings }
    }

    /// Generate a program for `climb`, starting at `now`
    pub fn generate(
        &self,
        capabilities: &UserCapabilities,
        climb: &ClimbDescriptor,
        climb_match: &ClimbMatch,
        now: DateTime<Utc>,
    ) -> TrainingProgram {
        let race_date = match capabilities.race_date() {
            Some(Ok(date)) => Some(date),
            Some(Err(e)) => {
                warn!(error = %e, "Unreadable race date, planning the maximum program length");
                None
            }
            None => None,
        };

        let duration_weeks = self.total_weeks(race_date, now);
        let target_date =
            race_date.unwrap_or_else(|| (now + Duration::weeks(i64::from(duration_weeks))).date_naive());

        let phases = Self::build_phases(duration_weeks, capabilities, climb, climb_match.estimated_minutes);

        TrainingProgram {
            id: format!("program_{}", now.timestamp()),
            duration_weeks,
            target_date,
            climb_characteristics: ClimbCharacteristics {
                name: climb.name.clone(),
                distance_km: climb.distance_km,
                elevation_m: climb.elevation_m,
                avg_gradient_pct: climb.avg_gradient_pct,
                max_gradient_pct: climb.max_gradient_pct,
                difficulty: climb.difficulty,
                technicality: climb.technicality,
                estimated_minutes: climb_match.estimated_minutes,
                match_score: climb_match.match_score,
                rating: climb_match.rating,
            },
            required_capabilities: Self::required_capabilities(climb),
            phases,
            weekly_schedule: Self::weekly_schedule(capabilities),
        }
    }

    /// Whole weeks until the race, rounded up and capped at `max_weeks`.
    /// No race date means the full `max_weeks`; a past date still yields
    /// one week.
    pub fn total_weeks(&self, race_date: Option<NaiveDate>, now: DateTime<Utc>) -> u32 {
        let max_weeks = self.settings.max_weeks.max(1);
        let Some(date) = race_date else {
            return max_weeks;
        };

        let race_start = date.and_time(NaiveTime::MIN).and_utc();
        let seconds = (race_start - now).num_seconds() as f64;
        let weeks = (seconds / Duration::weeks(1).num_seconds() as f64).ceil();

        if weeks < 1.0 {
            1
        } else {
            (weeks as u32).min(max_weeks)
        }
    }

    /// Base 40%, specific 40%, taper 20% (at least one week), with rounding
    /// drift absorbed by the base phase so the parts always sum to
    /// `total_weeks`.
    pub fn split_phases(total_weeks: u32) -> [u32; 3] {
        let total = i64::from(total_weeks);
        let weeks = total as f64;

        let mut base = (weeks * 0.4).round() as i64;
        let mut specific = (weeks * 0.4).round() as i64;
        let taper = ((weeks * 0.2).round() as i64).max(1).min(total);

        base += total - (base + specific + taper);
        if base < 0 {
            specific = (specific + base).max(0);
            base = 0;
        }

        debug!(total_weeks, base, specific, taper, "Split program into phases");
        [base as u32, specific as u32, taper as u32]
    }

    fn build_phases(
        total_weeks: u32,
        capabilities: &UserCapabilities,
        climb: &ClimbDescriptor,
        estimated_minutes: u32,
    ) -> Vec<Phase> {
        let [base, specific, taper] = Self::split_phases(total_weeks);
        let ftp = Decimal::from(capabilities.ftp_watts);

        [
            (PhaseKind::Base, base, dec!(300) + ftp / dec!(3)),
            (PhaseKind::Specific, specific, dec!(350) + ftp / dec!(3)),
            (PhaseKind::Taper, taper, dec!(200) + ftp / dec!(4)),
        ]
        .into_iter()
        .filter(|(_, weeks, _)| *weeks > 0)
        .map(|(kind, duration_weeks, weekly_tss)| Phase {
            kind,
            name: kind.name().to_string(),
            duration_weeks,
            focus: Self::phase_focus(kind, climb),
            weekly_tss: round_tss(weekly_tss),
            key_workouts: Self::key_workouts(kind, climb, estimated_minutes),
        })
        .collect()
    }

    fn phase_focus(kind: PhaseKind, climb: &ClimbDescriptor) -> Vec<String> {
        let mut focus: Vec<String> = match kind {
            PhaseKind::Base => vec!["Aerobic endurance", "Muscular strength"],
            PhaseKind::Specific => vec!["Threshold power", "Sustained climbing"],
            PhaseKind::Taper => vec!["Freshness", "Race sharpness"],
        }
        .into_iter()
        .map(String::from)
        .collect();

        if kind == PhaseKind::Specific && climb.technicality == Technicality::High {
            focus.push("Descending and cornering".to_string());
        }
        focus
    }

    /// Static template catalogue, two key workouts per phase
    fn key_workouts(kind: PhaseKind, climb: &ClimbDescriptor, estimated_minutes: u32) -> Vec<Workout> {
        match kind {
            PhaseKind::Base => vec![
                Workout {
                    name: "Long endurance ride".to_string(),
                    workout_type: WorkoutType::Endurance,
                    duration_min: 180,
                    tss: dec!(150),
                    intervals: vec![Interval::new("Steady endurance", 180, Zone::Z2)
                        .with_details("Cadence 85-95 rpm, fuel every 45 min")],
                },
                Workout {
                    name: "Strength endurance climbs".to_string(),
                    workout_type: WorkoutType::Strength,
                    duration_min: 90,
                    tss: dec!(85),
                    intervals: vec![
                        Interval::new("Warm-up", 20, Zone::Z2),
                        Interval::new("5 x 8 min low cadence", 50, Zone::Z3).with_details(format!(
                            "50-60 rpm on {:.0}% grade, 2 min easy between",
                            climb.avg_gradient_pct
                        )),
                        Interval::new("Cool-down", 20, Zone::Z1),
                    ],
                },
            ],
            PhaseKind::Specific => {
                let climb_minutes = estimated_minutes.max(20);
                vec![
                    Workout {
                        name: "Threshold intervals".to_string(),
                        workout_type: WorkoutType::Threshold,
                        duration_min: 90,
                        tss: dec!(100),
                        intervals: vec![
                            Interval::new("Warm-up", 20, Zone::Z2),
                            Interval::new("3 x 15 min at FTP", 55, Zone::Z4)
                                .with_details("5 min recovery between efforts"),
                            Interval::new("Cool-down", 15, Zone::Z1),
                        ],
                    },
                    Workout {
                        name: format!("{} simulation", climb.name),
                        workout_type: WorkoutType::ClimbSimulation,
                        duration_min: climb_minutes + 40,
                        tss: dec!(110),
                        intervals: vec![
                            Interval::new("Warm-up", 20, Zone::Z2),
                            Interval::new("Sustained climb", climb_minutes, Zone::Z4).with_details(format!(
                                "{:.1}% average with surges matching the {:.0}% ramps",
                                climb.avg_gradient_pct, climb.max_gradient_pct
                            )),
                            Interval::new("Cool-down", 20, Zone::Z1),
                        ],
                    },
                ]
            }
            PhaseKind::Taper => {
                let recon_details = match climb.steepest_section() {
                    Some(section) => format!(
                        "Ride easy and note the {} section ({:.0}%)",
                        section.name, section.gradient_pct
                    ),
                    None => format!("Ride easy and note where the {:.0}% ramps start", climb.max_gradient_pct),
                };

                vec![
                    Workout {
                        name: "Sharpening openers".to_string(),
                        workout_type: WorkoutType::Sharpening,
                        duration_min: 60,
                        tss: dec!(50),
                        intervals: vec![
                            Interval::new("Warm-up", 20, Zone::Z2),
                            Interval::new("4 x 1 min openers", 10, Zone::Z5)
                                .with_details("90 s easy between"),
                            Interval::new("Endurance", 20, Zone::Z2),
                            Interval::new("Cool-down", 10, Zone::Z1),
                        ],
                    },
                    Workout {
                        name: format!("{} reconnaissance", climb.name),
                        workout_type: WorkoutType::Reconnaissance,
                        duration_min: 90,
                        tss: dec!(60),
                        intervals: vec![Interval::new("Climb at endurance pace", 90, Zone::Z2)
                            .with_details(recon_details)],
                    },
                ]
            }
        }
    }

    pub fn required_capabilities(climb: &ClimbDescriptor) -> RequiredCapabilities {
        let level = |high: bool, medium: bool| {
            if high {
                CapabilityLevel::High
            } else if medium {
                CapabilityLevel::Medium
            } else {
                CapabilityLevel::Low
            }
        };

        RequiredCapabilities {
            threshold: level(climb.avg_gradient_pct > 8.0, climb.avg_gradient_pct > 5.0),
            vo2max: level(climb.max_gradient_pct > 12.0, climb.max_gradient_pct > 8.0),
            endurance: level(climb.distance_km > 15.0, climb.distance_km > 8.0),
            strength: level(
                climb.max_gradient_pct > 15.0 || climb.avg_gradient_pct > 10.0,
                climb.avg_gradient_pct > 6.0,
            ),
            technique: match climb.technicality {
                Technicality::Low => CapabilityLevel::Low,
                Technicality::Medium => CapabilityLevel::Medium,
                Technicality::High => CapabilityLevel::High,
            },
        }
    }

    /// Assign the four weekly slots to the first four preferred weekdays in
    /// ascending order; every other weekday is rest.
    pub fn weekly_schedule(capabilities: &UserCapabilities) -> BTreeMap<u8, ScheduledDay> {
        let mut schedule: BTreeMap<u8, ScheduledDay> =
            (1..=7).map(|day| (day, ScheduledDay::Rest)).collect();

        let days: Vec<u8> = capabilities
            .preferred_training_days
            .iter()
            .copied()
            .filter(|day| {
                let valid = (1..=7).contains(day);
                if !valid {
                    log_error(
                        &InputError::OutOfRange {
                            field: "preferred_training_days".to_string(),
                            value: day.to_string(),
                        }
                        .into(),
                    );
                }
                valid
            })
            .collect();

        let weekly_minutes = capabilities.weekly_hours.max(0.0) * 60.0;

        for (day, slot) in days.into_iter().zip(SCHEDULE_SLOTS.iter()) {
            let duration_min = (weekly_minutes * slot.share).round() as u32;
            let tss = estimate_tss(duration_min, slot.intensity_factor);
            let mut interval = Interval::new(slot.name, duration_min, slot.zone);
            if slot.workout_type == WorkoutType::Strength && capabilities.strength_training {
                interval = interval.with_details("Low cadence work; keep gym sessions on this day");
            }

            schedule.insert(
                day,
                ScheduledDay::Workout(Workout {
                    name: slot.name.to_string(),
                    workout_type: slot.workout_type,
                    duration_min,
                    tss,
                    intervals: vec![interval],
                }),
            );
        }

        schedule
    }
}

/// Whole TSS points, halves rounded away from zero
fn round_tss(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Expected TSS of a workout at a given intensity factor
pub fn estimate_tss(duration_min: u32, intensity_factor: Decimal) -> Decimal {
    round_tss(Decimal::from(duration_min) * intensity_factor)
}
