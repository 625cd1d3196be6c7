// SPDX-License-Identifier: MIT
//! # Result Aggregation

use serde::Serialize;

use crate::record::FoodRecord;

/// Sum of `calories_per_unit * quantity` over all records.
///
/// Summation is plain `f64` addition in record order. The result is exact and
/// independent of order for whole (or dyadic) calorie values; otherwise
/// reorderings agree to within rounding, a few ulps of the total.
pub fn total_calories(records: &[FoodRecord]) -> f64 {
    records.iter().map(FoodRecord::group_calories).sum()
}

/// Validated records of one analysis with their derived total.
///
/// The total is computed once from the full record set. There is no way to
/// add or remove records afterwards; a new analysis produces a new result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    records: Vec<FoodRecord>,
    total_calories: f64,
}

impl AnalysisResult {
    pub fn from_records(records: Vec<FoodRecord>) -> Self {
        let total_calories = total_calories(&records);
        Self {
            records,
            total_calories,
        }
    }

    pub fn records(&self) -> &[FoodRecord] {
        &self.records
    }

    pub fn total_calories(&self) -> f64 {
        self.total_calories
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}
