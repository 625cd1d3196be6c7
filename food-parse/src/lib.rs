// SPDX-License-Identifier: MIT
//! # food-parse: Calorie Estimates from Untrusted Model Text
//!
//! This crate turns the free-form text a vision-language model returns into a
//! validated, typed list of food records and a calorie total. It performs no
//! I/O; everything here is a pure function over strings and values.
//!
//! ## Pipeline
//!
//! 1. [`normalize`]: strip incidental formatting (code fences, stray backticks)
//! 2. [`parse`]: parse JSON and validate the shape of every element
//! 3. [`aggregate`]: sum `calories_per_unit * quantity` into an [`AnalysisResult`]
//!
//! Validation is all-or-nothing. A response with a single malformed element is
//! rejected in full, so a result either lists every item the model reported or
//! nothing at all.
//!
//! ## Usage Example
//!
//! ```rust
//! use food_parse::{parse_food_records, AnalysisResult};
//!
//! let raw = "```json\n[{\"foodItem\":\"Beef Taco\",\"caloriesPerItem\":250,\"quantity\":2,\"servingSize\":\"1 taco\"}]\n```";
//! let records = parse_food_records(raw).unwrap();
//! let result = AnalysisResult::from_records(records);
//!
//! assert_eq!(result.total_calories(), 500.0);
//! assert_eq!(result.records()[0].quantity(), 2);
//! ```

pub mod aggregate;
pub mod normalize;
pub mod parse;
pub mod record;

pub use aggregate::{total_calories, AnalysisResult};
pub use normalize::{normalize_response, strip_backticks, strip_code_fence};
pub use parse::{parse_food_records, ParseError};
pub use record::FoodRecord;
