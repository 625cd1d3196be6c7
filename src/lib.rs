//! # Calorie Lens
//!
//! Photograph a meal, get a calorie breakdown.
//!
//! ## Architecture
//!
//! - `capture`: image sources, from a selected file or a camera still
//! - `encoder`: base64 transport form of an image
//! - `analysis`: the [`Analyzer`] seam and the Gemini client
//! - `session`: the capture/analysis workflow state machine
//! - `access`: sign-in wall and page-view counter
//! - `config`: layered application configuration
//! - `error`: error taxonomy shared by all of the above
//!
//! Parsing the model's reply into validated records lives in the
//! `food-parse` crate and is re-exported here.
//!
//! ## Example
//!
//! ```rust,no_run
//! use calorie_lens::{AnalyzerConfig, CaptureSession, GeminiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new(AnalyzerConfig::default().with_api_key("my-key"))?;
//! let mut session = CaptureSession::new(client);
//!
//! session.select_file("lunch.jpg")?;
//! let result = session.analyze().await?;
//! for record in result.records() {
//!     println!("{} x{}: {} kcal", record.name(), record.quantity(), record.group_calories());
//! }
//! println!("Total: {} kcal", result.total_calories());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod analysis;
pub mod capture;
pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod session;

/// Re-export error types for convenience
pub use error::{
    CalorieError, CalorieResult, ErrorSeverity, HasRecoverySuggestion, HasSeverity,
    InputErrorKind, TransportErrorKind,
};

pub use analysis::{Analyzer, GeminiClient};
pub use capture::{CameraDevice, ImageFileCamera, ImageSource, MediaType};
pub use config::{AccessPolicy, AnalyzerConfig, AppConfig};
pub use encoder::{EncodedImage, encode_bytes, encode_source};
pub use session::{CaptureSession, SessionStatus, WorkflowState};

/// Re-export the response parsing types
pub use food_parse::{AnalysisResult, FoodRecord, ParseError};
