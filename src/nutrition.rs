//! Nutrition targets derived from weekly training volume
//!
//! All breakpoints below are fixed: 300/400/600 minutes per week drive the
//! protein factor, carbohydrate share, hydration and pre-workout flags.

use serde::{Deserialize, Serialize};

use crate::models::NutritionProfile;

/// Resting baseline for the daily energy estimate (kcal)
pub const BASE_DAILY_CALORIES: f64 = 2000.0;

/// Targets and intake comparison for one training week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionAssessment {
    /// Weekly training volume the targets were derived from
    pub training_volume_minutes: f64,

    pub estimated_daily_calories: f64,

    /// Estimated need minus declared intake; 0 when intake is unknown
    pub calorie_deficit: f64,

    /// Protein factor in g/kg body weight
    pub protein_factor: f64,

    pub recommended_protein_g: u32,

    /// Declared protein intake in grams, 0 when unknown
    pub current_protein_g: u32,

    pub protein_deficit: bool,

    pub recommended_hydration_l: f64,

    pub recommended_carbs_pct: f64,

    pub current_carbs_pct: Option<f64>,

    pub carbs_ratio_low: bool,

    pub recommended_carbs_g: u32,

    pub pre_workout_nutrition: bool,

    pub hydration_concern: bool,
}

/// Cross-references a nutrition profile with training volume
pub struct NutritionCrossAnalyzer;

impl NutritionCrossAnalyzer {
    /// Derive nutrition targets for `training_volume_minutes` of weekly
    /// training and compare them with the declared intake.
    pub fn analyze(profile: &NutritionProfile, training_volume_minutes: f64) -> NutritionAssessment {
        let volume = training_volume_minutes.max(0.0);

        let estimated_daily_calories = BASE_DAILY_CALORIES + volume * 10.0 / 7.0;
        let calorie_deficit = profile
            .daily_calories
            .map(|intake| estimated_daily_calories - intake)
            .unwrap_or(0.0);

        let protein_factor = Self::protein_factor(volume);
        let recommended_protein = (protein_factor * profile.weight_kg).round();

        // Protein intake is only known when both calories and the split are declared
        let declared_protein = match (profile.daily_calories, profile.macronutrients) {
            (Some(calories), Some(macros)) => Some((macros.protein_pct / 100.0 * calories / 4.0).round()),
            _ => None,
        };
        let current_protein = declared_protein.unwrap_or(0.0);
        let protein_deficit = declared_protein
            .map(|protein| protein < recommended_protein * 0.8)
            .unwrap_or(false);

        let recommended_carbs_pct = Self::recommended_carbs_pct(volume);
        let current_carbs_pct = profile.macronutrients.map(|m| m.carbs_pct);
        let carbs_ratio_low = current_carbs_pct
            .map(|pct| pct < recommended_carbs_pct - 10.0)
            .unwrap_or(false);
        let recommended_carbs_g =
            (recommended_carbs_pct / 100.0 * estimated_daily_calories / 4.0).round();

        NutritionAssessment {
            training_volume_minutes: volume,
            estimated_daily_calories,
            calorie_deficit,
            protein_factor,
            recommended_protein_g: recommended_protein as u32,
            current_protein_g: current_protein as u32,
            protein_deficit,
            recommended_hydration_l: 2.0 + (volume / 60.0 / 7.0) * 0.5,
            recommended_carbs_pct,
            current_carbs_pct,
            carbs_ratio_low,
            recommended_carbs_g: recommended_carbs_g as u32,
            pre_workout_nutrition: volume > 400.0,
            hydration_concern: volume > 300.0,
        }
    }

    /// g/kg of body weight
    pub fn protein_factor(training_volume_minutes: f64) -> f64 {
        if training_volume_minutes > 600.0 {
            2.0
        } else if training_volume_minutes > 300.0 {
            1.8
        } else {
            1.6
        }
    }

    /// Share of daily calories that should come from carbohydrates
    pub fn recommended_carbs_pct(training_volume_minutes: f64) -> f64 {
        if training_volume_minutes > 600.0 {
            65.0
        } else if training_volume_minutes > 300.0 {
            60.0
        } else {
            55.0
        }
    }
}
