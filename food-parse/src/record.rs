// SPDX-License-Identifier: MIT
//! # Food Records
//!
//! A [`FoodRecord`] is one record group: one or more visually identical food
//! instances collapsed into a single entry with a quantity. Records are only
//! created by [`crate::parse_food_records`] and are immutable afterwards.

use serde::{Deserialize, Serialize};

/// One group of identical food items with a per-instance calorie estimate.
///
/// The serialized form uses the key names the model is instructed to emit
/// (`foodItem`, `caloriesPerItem`, `quantity`, `servingSize`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodRecord {
    #[serde(rename = "foodItem")]
    pub(crate) name: String,
    #[serde(rename = "caloriesPerItem")]
    pub(crate) calories_per_unit: f64,
    pub(crate) quantity: u32,
    #[serde(rename = "servingSize")]
    pub(crate) serving_description: String,
}

impl FoodRecord {
    /// Human-readable food label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Estimated calories for a single instance.
    pub fn calories_per_unit(&self) -> f64 {
        self.calories_per_unit
    }

    /// Number of identical instances in this group. Always at least 1.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Serving size of a single instance, e.g. `"1 medium (182g)"`.
    pub fn serving_description(&self) -> &str {
        &self.serving_description
    }

    /// Calories contributed by the whole group.
    pub fn group_calories(&self) -> f64 {
        self.calories_per_unit * f64::from(self.quantity)
    }
}

/// Wire shape of one array element before range checks.
///
/// Numbers are taken as `f64` so that a fractional or negative quantity is
/// reported as an out-of-range value rather than a type mismatch.
#[derive(Debug, Deserialize)]
pub(crate) struct RawFoodRecord {
    #[serde(rename = "foodItem")]
    pub food_item: String,
    #[serde(rename = "caloriesPerItem")]
    pub calories_per_item: f64,
    pub quantity: f64,
    #[serde(rename = "servingSize")]
    pub serving_size: String,
}

impl RawFoodRecord {
    /// Applies the record invariants, returning the reason on failure.
    pub(crate) fn into_record(self) -> Result<FoodRecord, String> {
        if !self.calories_per_item.is_finite() || self.calories_per_item < 0.0 {
            return Err(format!(
                "caloriesPerItem must be a non-negative number (value: {})",
                self.calories_per_item
            ));
        }
        if self.quantity.fract() != 0.0 || self.quantity < 1.0 || self.quantity > f64::from(u32::MAX)
        {
            return Err(format!(
                "quantity must be a positive integer (value: {})",
                self.quantity
            ));
        }

        let group_calories = self.calories_per_item * self.quantity;
        if !group_calories.is_finite() {
            return Err(format!(
                "caloriesPerItem x quantity is out of range ({} x {})",
                self.calories_per_item, self.quantity
            ));
        }

        Ok(FoodRecord {
            name: self.food_item,
            calories_per_unit: self.calories_per_item,
            quantity: self.quantity as u32,
            serving_description: self.serving_size,
        })
    }
}
