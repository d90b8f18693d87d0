use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{InputError, Result};

/// Parse an externally supplied date. Accepts RFC 3339, an ISO date-time
/// without offset (read as UTC) and plain `YYYY-MM-DD` (midnight UTC).
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|e| {
            InputError::InvalidDate {
                value: value.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

/// Read a JSON document (activity list, capabilities, climb, nutrition) from disk
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// A single recorded ride, as delivered by the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Raw date string (RFC 3339, offset-less ISO date-time or YYYY-MM-DD)
    pub date: String,

    /// Moving time in seconds
    pub duration_seconds: u32,

    /// Distance covered in kilometers
    pub distance_km: f64,

    /// Average speed in km/h
    pub average_speed_kmh: f64,

    /// Average heart rate in beats per minute
    pub heart_rate_avg: f64,

    /// Perceived intensity on a 0-10 scale, fractional values allowed
    pub intensity: f64,

    /// Total elevation gain in meters
    pub elevation_gain_m: f64,
}

impl Activity {
    /// Parsed activity instant
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        parse_instant(&self.date)
    }

    /// Duration in minutes
    pub fn duration_minutes(&self) -> f64 {
        f64::from(self.duration_seconds) / 60.0
    }

    /// Reject intensities outside 0-10, including NaN
    pub fn validate(&self) -> Result<()> {
        if (0.0..=10.0).contains(&self.intensity) {
            Ok(())
        } else {
            Err(InputError::OutOfRange {
                field: "intensity".to_string(),
                value: self.intensity.to_string(),
            }
            .into())
        }
    }
}

/// Self-declared rider experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

/// Weaknesses a rider can declare about themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitingFactor {
    Endurance,
    Threshold,
    ClimbingPower,
    Recovery,
    Weight,
    Technique,
    TimeAvailability,
}

impl LimitingFactor {
    pub const ALL: [LimitingFactor; 7] = [
        LimitingFactor::Endurance,
        LimitingFactor::Threshold,
        LimitingFactor::ClimbingPower,
        LimitingFactor::Recovery,
        LimitingFactor::Weight,
        LimitingFactor::Technique,
        LimitingFactor::TimeAvailability,
    ];
}

/// Snapshot of what the athlete says they can do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCapabilities {
    /// Functional threshold power in watts
    pub ftp_watts: u16,

    /// Body weight in kilograms
    pub weight_kg: f64,

    pub experience_level: ExperienceLevel,

    /// Hours available for training per week
    pub weekly_hours: f64,

    /// ISO weekdays (1 = Monday .. 7 = Sunday)
    #[serde(default)]
    pub preferred_training_days: BTreeSet<u8>,

    /// Target event date (RFC 3339 or YYYY-MM-DD)
    #[serde(rename = "raceDateISO", default)]
    pub race_date_iso: Option<String>,

    #[serde(default)]
    pub strength_training: bool,

    #[serde(default)]
    pub limiting_factors: BTreeSet<LimitingFactor>,
}

impl UserCapabilities {
    /// Parsed race date, if one was declared
    pub fn race_date(&self) -> Option<Result<NaiveDate>> {
        self.race_date_iso
            .as_deref()
            .map(|raw| parse_instant(raw).map(|dt| dt.date_naive()))
    }

    /// FTP normalized by body weight. Non-finite results (zero or negative
    /// weight) collapse to 0 so callers can treat them as malformed input.
    pub fn ftp_per_kg(&self) -> f64 {
        let value = f64::from(self.ftp_watts) / self.weight_kg;
        if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        }
    }
}

/// Macronutrient split as percentages of daily calories
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Macronutrients {
    pub carbs_pct: f64,
    pub protein_pct: f64,
    pub fat_pct: f64,
}

/// Declared dietary intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionProfile {
    pub weight_kg: f64,

    /// Average daily intake in kcal
    #[serde(default)]
    pub daily_calories: Option<f64>,

    #[serde(default)]
    pub macronutrients: Option<Macronutrients>,
}

/// Overall grading of a climb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Extreme => write!(f, "extreme"),
        }
    }
}

/// How much bike handling the climb demands (hairpins, surface, descents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technicality {
    Low,
    Medium,
    High,
}

/// One segment of a climb profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimbSection {
    pub name: String,
    pub distance_km: f64,
    pub gradient_pct: f64,
}

/// Target climb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimbDescriptor {
    pub name: String,
    pub distance_km: f64,
    pub elevation_m: f64,
    pub avg_gradient_pct: f64,
    pub max_gradient_pct: f64,
    pub difficulty: Difficulty,
    pub technicality: Technicality,
    #[serde(default)]
    pub sections: Vec<ClimbSection>,
}

impl ClimbDescriptor {
    /// Steepest declared section
    pub fn steepest_section(&self) -> Option<&ClimbSection> {
        self.sections
            .iter()
            .max_by(|a, b| a.gradient_pct.total_cmp(&b.gradient_pct))
    }
}
