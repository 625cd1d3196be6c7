// SPDX-License-Identifier: MIT
//! # Parsing and Validation
//!
//! [`parse_food_records`] is the only way to obtain [`FoodRecord`]s. It
//! normalizes the raw model text, parses it as JSON and checks every element
//! of the top-level array. The first failing element rejects the whole
//! response.

use std::fmt;

use serde_json::Value;

use crate::normalize::normalize_response;
use crate::record::{FoodRecord, RawFoodRecord};

/// Ways a model response can fail to become a list of records.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The normalized text is not valid JSON.
    InvalidJson { reason: String, excerpt: String },
    /// Valid JSON, but the top-level value is not an array.
    NotArray { found: &'static str },
    /// An element is missing a field, has a wrongly typed field, or violates
    /// a record invariant.
    MalformedItem { index: usize, reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidJson { reason, .. } => {
                write!(f, "AI response is not valid JSON: {}", reason)
            }
            ParseError::NotArray { found } => write!(
                f,
                "AI response was not in the expected format: expected a JSON array of food items, found {}",
                found
            ),
            ParseError::MalformedItem { index, reason } => write!(
                f,
                "AI response was not in the expected format: item {} is invalid ({}). \
Each item needs foodItem, caloriesPerItem, quantity and servingSize",
                index, reason
            ),
        }
    }
}

impl std::error::Error for ParseError {}

const EXCERPT_CHARS: usize = 120;

/// Normalizes, parses and validates a raw model response.
///
/// # Errors
///
/// - [`ParseError::InvalidJson`] when the text is not JSON after normalization
/// - [`ParseError::NotArray`] when the top-level value is not an array
/// - [`ParseError::MalformedItem`] for the first element that fails validation
///
/// An empty array is a valid response (the model found nothing it could
/// confidently estimate).
pub fn parse_food_records(raw: &str) -> Result<Vec<FoodRecord>, ParseError> {
    let text = normalize_response(raw);

    let value: Value = serde_json::from_str(text).map_err(|e| ParseError::InvalidJson {
        reason: e.to_string(),
        excerpt: text.chars().take(EXCERPT_CHARS).collect(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::NotArray {
                found: json_kind(&other),
            });
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<RawFoodRecord>(item)
                .map_err(|e| e.to_string())
                .and_then(RawFoodRecord::into_record)
                .map_err(|reason| ParseError::MalformedItem { index, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // The total must stay representable, not only each group.
    let mut running = 0.0_f64;
    for (index, record) in records.iter().enumerate() {
        running += record.group_calories();
        if !running.is_finite() {
            return Err(ParseError::MalformedItem {
                index,
                reason: "total calories are out of range".to_string(),
            });
        }
    }

    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
