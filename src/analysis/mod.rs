//! # Analysis Client
//!
//! The [`Analyzer`] trait is the seam between the capture session and the
//! vision-language model. [`gemini::GeminiClient`] is the production
//! implementation; tests substitute their own.
//!
//! An analyzer is constructed with its configuration. [`Analyzer::preflight`]
//! reports a missing credential without touching the network, so the session
//! can show it as a fatal error at startup and refuse every analysis
//! afterwards.

pub mod gemini;

use async_trait::async_trait;
use food_parse::AnalysisResult;

use crate::encoder::EncodedImage;
use crate::error::CalorieResult;

pub use gemini::GeminiClient;

/// Instruction sent with every image.
pub const FOOD_PROMPT: &str = "\
Analyze the food items in this image. Identify distinct food items. If you see multiple \
identical instances of a food item (e.g., two identical tacos, three of the same cookies), \
group them into one entry. For each food item or group of identical items, provide:
1. 'foodItem' (string): the name of the food.
2. 'caloriesPerItem' (number): the estimated calorie count for a SINGLE instance of this item.
3. 'quantity' (number): how many identical items are in this group. If the item is unique, quantity is 1.
4. 'servingSize' (string): a common serving size description for a SINGLE instance of this item.
Return the response strictly as a JSON array of objects following this structure. \
Example: [{\"foodItem\": \"Beef Taco\", \"caloriesPerItem\": 250, \"quantity\": 2, \"servingSize\": \"1 taco\"}, \
{\"foodItem\": \"Apple\", \"caloriesPerItem\": 95, \"quantity\": 1, \"servingSize\": \"1 medium (182g)\"}].
Only return the JSON array, without any other text or explanations. Do not include items if \
you cannot confidently estimate their calories or identify their quantity.";

/// Turns an encoded image into validated calorie estimates.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Checks that the analyzer can be used at all.
    ///
    /// # Errors
    ///
    /// [`crate::CalorieError::Config`] when no credential is configured.
    fn preflight(&self) -> CalorieResult<()>;

    /// Performs one analysis round trip. No retries, no partial results.
    async fn analyze(&self, image: &EncodedImage) -> CalorieResult<AnalysisResult>;
}
