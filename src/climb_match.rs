//! How well an athlete's current capability suits a specific climb
//!
//! The match score (0-100) adds a W/kg tier score (0-30) that depends on the
//! climb's difficulty, bonuses for experience, weekly hours and strength
//! training, and a penalty per declared limiting factor.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::models::{ClimbDescriptor, Difficulty, ExperienceLevel, UserCapabilities};

/// Minutes per 1000 m of climbing at 3 W/kg
const MINUTES_PER_KM_ELEVATION_AT_3WKG: f64 = 60.0;

/// Per-factor penalty
const LIMITING_FACTOR_PENALTY: i32 = 5;

/// Verbal grading of a match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRating {
    Accessible,
    Moderate,
    Challenging,
    VeryHard,
}

impl MatchRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => MatchRating::Accessible,
            60..=79 => MatchRating::Moderate,
            40..=59 => MatchRating::Challenging,
            _ => MatchRating::VeryHard,
        }
    }
}

impl fmt::Display for MatchRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRating::Accessible => write!(f, "accessible"),
            MatchRating::Moderate => write!(f, "moderate"),
            MatchRating::Challenging => write!(f, "challenging"),
            MatchRating::VeryHard => write!(f, "very hard"),
        }
    }
}

/// Individual contributions to the match score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub power_tier: i32,
    pub experience: i32,
    pub weekly_hours: i32,
    pub strength_training: i32,
    pub limiting_factors: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.power_tier + self.experience + self.weekly_hours + self.strength_training
            + self.limiting_factors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimbMatch {
    pub ftp_per_kg: f64,
    /// Clamped to `[0, 100]`
    pub match_score: u8,
    pub rating: MatchRating,
    pub breakdown: ScoreBreakdown,
    pub estimated_minutes: u32,
}

pub struct ClimbCapabilityMatcher;

impl ClimbCapabilityMatcher {
    pub fn evaluate(capabilities: &UserCapabilities, climb: &ClimbDescriptor) -> ClimbMatch {
        let ftp_per_kg = capabilities.ftp_per_kg();

        let breakdown = ScoreBreakdown {
            power_tier: Self::power_tier_score(ftp_per_kg, climb.difficulty),
            experience: Self::experience_bonus(capabilities.experience_level),
            weekly_hours: Self::weekly_hours_bonus(capabilities.weekly_hours),
            strength_training: if capabilities.strength_training { 10 } else { 0 },
            limiting_factors: -LIMITING_FACTOR_PENALTY * capabilities.limiting_factors.len() as i32,
        };

        let match_score = breakdown.total().clamp(0, 100) as u8;
        let estimated_minutes = Self::estimated_minutes(ftp_per_kg, climb.elevation_m);

        debug!(
            climb = %climb.name,
            ftp_per_kg,
            match_score,
            ?breakdown,
            "Evaluated climb match"
        );

        ClimbMatch {
            ftp_per_kg,
            match_score,
            rating: MatchRating::from_score(match_score),
            breakdown,
            estimated_minutes,
        }
    }

    /// W/kg lower bounds of the 30/25/20 tiers; anything below scores 10
    pub fn tier_thresholds(difficulty: Difficulty) -> [f64; 3] {
        match difficulty {
            Difficulty::Easy => [3.0, 2.5, 2.0],
            Difficulty::Medium => [3.5, 3.0, 2.5],
            Difficulty::Hard => [4.2, 3.5, 3.0],
            Difficulty::Extreme => [4.8, 4.2, 3.5],
        }
    }

    pub fn power_tier_score(ftp_per_kg: f64, difficulty: Difficulty) -> i32 {
        let [top, upper, lower] = Self::tier_thresholds(difficulty);
        if ftp_per_kg >= top {
            30
        } else if ftp_per_kg >= upper {
            25
        } else if ftp_per_kg >= lower {
            20
        } else {
            10
        }
    }

    pub fn experience_bonus(level: ExperienceLevel) -> i32 {
        match level {
            ExperienceLevel::Beginner => 10,
            ExperienceLevel::Intermediate => 15,
            ExperienceLevel::Advanced => 20,
            ExperienceLevel::Expert => 25,
        }
    }

    pub fn weekly_hours_bonus(weekly_hours: f64) -> i32 {
        if weekly_hours >= 12.0 {
            20
        } else if weekly_hours >= 8.0 {
            15
        } else if weekly_hours >= 5.0 {
            10
        } else {
            5
        }
    }

    /// Ascent time scaled from 60 min per 1000 m at 3 W/kg. A non-positive
    /// W/kg falls back to the 3 W/kg pace instead of dividing by zero.
    pub fn estimated_minutes(ftp_per_kg: f64, elevation_m: f64) -> u32 {
        let time_factor = if ftp_per_kg > 0.0 {
            MINUTES_PER_KM_ELEVATION_AT_3WKG * (3.0 / ftp_per_kg)
        } else {
            warn!(ftp_per_kg, "Non-positive W/kg, using default ascent pace");
            MINUTES_PER_KM_ELEVATION_AT_3WKG
        };

        ((elevation_m.max(0.0) / 1000.0) * time_factor).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LimitingFactor, Technicality};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn create_test_climb(difficulty: Difficulty) -> ClimbDescriptor {
        ClimbDescriptor {
            name: "Col du Test".to_string(),
            distance_km: 12.0,
            elevation_m: 1000.0,
            avg_gradient_pct: 8.3,
            max_gradient_pct: 12.0,
            difficulty,
            technicality: Technicality::Medium,
            sections: Vec::new(),
        }
    }

    fn create_test_capabilities() -> UserCapabilities {
        UserCapabilities {
            ftp_watts: 300,
            weight_kg: 75.0,
            experience_level: ExperienceLevel::Advanced,
            weekly_hours: 10.0,
            preferred_training_days: BTreeSet::new(),
            race_date_iso: None,
            strength_training: true,
            limiting_factors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_hard_climb_at_four_wkg() {
        let result =
            ClimbCapabilityMatcher::evaluate(&create_test_capabilities(), &create_test_climb(Difficulty::Hard));

        assert_eq!(result.breakdown.power_tier, 25);
        assert_eq!(result.match_score, 70);
        assert_eq!(result.rating, MatchRating::Moderate);
        // 60 * 3 / 4 = 45 minutes per 1000 m
        assert_eq!(result.estimated_minutes, 45);
    }

    #[test]
    fn test_tiers_rise_with_difficulty() {
        assert_eq!(ClimbCapabilityMatcher::power_tier_score(4.0, Difficulty::Easy), 30);
        assert_eq!(ClimbCapabilityMatcher::power_tier_score(4.0, Difficulty::Medium), 30);
        assert_eq!(ClimbCapabilityMatcher::power_tier_score(4.0, Difficulty::Hard), 25);
        assert_eq!(ClimbCapabilityMatcher::power_tier_score(4.0, Difficulty::Extreme), 20);
        assert_eq!(ClimbCapabilityMatcher::power_tier_score(2.0, Difficulty::Extreme), 10);
    }

    #[test]
    fn test_bonuses() {
        assert_eq!(ClimbCapabilityMatcher::weekly_hours_bonus(12.0), 20);
        assert_eq!(ClimbCapabilityMatcher::weekly_hours_bonus(8.0), 15);
        assert_eq!(ClimbCapabilityMatcher::weekly_hours_bonus(5.0), 10);
        assert_eq!(ClimbCapabilityMatcher::weekly_hours_bonus(4.5), 5);
        assert_eq!(ClimbCapabilityMatcher::experience_bonus(ExperienceLevel::Expert), 25);
    }

    #[test]
    fn test_rating_bounds() {
        assert_eq!(MatchRating::from_score(100), MatchRating::Accessible);
        assert_eq!(MatchRating::from_score(80), MatchRating::Accessible);
        assert_eq!(MatchRating::from_score(79), MatchRating::Moderate);
        assert_eq!(MatchRating::from_score(40), MatchRating::Challenging);
        assert_eq!(MatchRating::from_score(39), MatchRating::VeryHard);
        assert_eq!(MatchRating::VeryHard.to_string(), "very hard");
    }

    #[test]
    fn test_all_limiting_factors_clamp_to_zero() {
        let caps = UserCapabilities {
            ftp_watts: 120,
            weight_kg: 90.0,
            experience_level: ExperienceLevel::Beginner,
            weekly_hours: 2.0,
            strength_training: false,
            limiting_factors: LimitingFactor::ALL.into_iter().collect(),
            ..create_test_capabilities()
        };

        let result = ClimbCapabilityMatcher::evaluate(&caps, &create_test_climb(Difficulty::Extreme));
        assert_eq!(result.breakdown.total(), -10);
        assert_eq!(result.match_score, 0);
        assert_eq!(result.rating, MatchRating::VeryHard);
    }

    #[test]
    fn test_zero_weight_falls_back() {
        let caps = UserCapabilities {
            weight_kg: 0.0,
            ..create_test_capabilities()
        };

        let result = ClimbCapabilityMatcher::evaluate(&caps, &create_test_climb(Difficulty::Medium));
        assert_eq!(result.ftp_per_kg, 0.0);
        assert_eq!(result.estimated_minutes, 60);
        assert_eq!(result.breakdown.power_tier, 10);
    }

    proptest! {
        #[test]
        fn test_match_score_bounded(
            ftp in 0u16..600,
            weight in 0.0f64..150.0,
            hours in 0.0f64..30.0,
            strength in any::<bool>(),
            factors in 0usize..=7,
            difficulty_idx in 0usize..4,
        ) {
            let difficulty = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard, Difficulty::Extreme][difficulty_idx];
            let caps = UserCapabilities {
                ftp_watts: ftp,
                weight_kg: weight,
                weekly_hours: hours,
                strength_training: strength,
                limiting_factors: LimitingFactor::ALL.into_iter().take(factors).collect(),
                ..create_test_capabilities()
            };

            let result = ClimbCapabilityMatcher::evaluate(&caps, &create_test_climb(difficulty));
            prop_assert!(result.match_score <= 100);
            prop_assert!(result.ftp_per_kg.is_finite());
        }
    }
}
