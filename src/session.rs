//! # Capture Session
//!
//! The user-driven workflow around one image at a time: acquire (file or
//! camera), encode, analyze, aggregate.
//!
//! ## States
//!
//! ```text
//!  Idle ──▶ AwaitingInput ──analyze──▶ Analyzing ──▶ Succeeded
//!               ▲                          │
//!               │                          └──────▶ Failed
//!               └──── select_file / open_camera / take_photo
//! ```
//!
//! - Every user action clears the previous error message.
//! - Selecting a file or taking a photo replaces the image and discards the
//!   previous result.
//! - Opening the camera discards the image and the result; closing it leaves
//!   a captured image alone.
//! - `analyze` needs a configured credential and an image. Without them it
//!   fails immediately and the session stays in `AwaitingInput`.
//! - Any failure during analysis leaves the session in `Failed` with no
//!   result.
//!
//! ## Single Flow
//!
//! `analyze` borrows the session mutably for the whole round trip, so a
//! second analysis, a new selection or a camera action cannot start while one
//! is in flight. Front ends that render from another task subscribe to
//! [`SessionStatus`] updates and disable their trigger while the state is
//! `Analyzing`. Dropping an in-flight `analyze` future moves the session to
//! `Failed`.
//!
//! ## Resources
//!
//! The camera is held as an owned [`CameraHandle`]; replacing it, closing it,
//! taking a photo and dropping the session all release the device.

use std::path::Path;

use food_parse::AnalysisResult;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::analysis::Analyzer;
use crate::capture::{CameraDevice, CameraHandle, ImageSource, MediaType};
use crate::encoder::encode_source;
use crate::error::{CalorieError, CalorieResult, InputErrorKind};

const CANCELLED_MESSAGE: &str = "Analysis was cancelled before it completed.";

/// Workflow position of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Nothing has happened yet
    Idle,
    /// An image may be selected, captured or analyzed
    AwaitingInput,
    /// One analysis is in flight
    Analyzing,
    /// The last analysis produced a result
    Succeeded,
    /// The last analysis failed; see [`SessionStatus::last_error`]
    Failed,
}

/// Observable snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: WorkflowState,
    /// Human-readable message of the most recent failure, cleared by the next
    /// user action.
    pub last_error: Option<String>,
    pub camera_active: bool,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            last_error: None,
            camera_active: false,
        }
    }
}

/// Marks a session as `Failed` if the analysis future is dropped before
/// [`InFlight::finish`].
struct InFlight<'a> {
    status: &'a watch::Sender<SessionStatus>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(status: &'a watch::Sender<SessionStatus>) -> Self {
        Self {
            status,
            armed: true,
        }
    }

    fn finish(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("analysis dropped while in flight");
            self.status.send_modify(|status| {
                status.state = WorkflowState::Failed;
                status.last_error = Some(CANCELLED_MESSAGE.to_string());
            });
        }
    }
}

/// One interactive analysis session.
///
/// Owns the analyzer, the current image source, the camera handle (if any)
/// and the latest result. Nothing is persisted.
pub struct CaptureSession<A: Analyzer> {
    analyzer: A,
    source: Option<ImageSource>,
    camera: Option<CameraHandle>,
    result: Option<AnalysisResult>,
    configuration_error: Option<String>,
    status: watch::Sender<SessionStatus>,
}

impl<A: Analyzer> CaptureSession<A> {
    /// Starts a session, running the analyzer's pre-flight check once.
    ///
    /// A failed check is kept as [`Self::configuration_error`] for the
    /// lifetime of the session and blocks every analysis.
    pub fn new(analyzer: A) -> Self {
        let configuration_error = match analyzer.preflight() {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "analyzer is not configured");
                Some(e.to_string())
            }
        };

        Self {
            analyzer,
            source: None,
            camera: None,
            result: None,
            configuration_error,
            status: watch::Sender::new(SessionStatus::default()),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Receives every status change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.status.borrow().last_error.clone()
    }

    /// Persistent, non-dismissable configuration error, if any.
    pub fn configuration_error(&self) -> Option<&str> {
        self.configuration_error.as_deref()
    }

    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Total of the current result, 0 when there is none.
    pub fn total_calories(&self) -> f64 {
        self.result
            .as_ref()
            .map(AnalysisResult::total_calories)
            .unwrap_or(0.0)
    }

    pub fn camera_active(&self) -> bool {
        self.camera.is_some()
    }

    /// Whether an `analyze` call would reach the analyzer.
    pub fn can_analyze(&self) -> bool {
        self.configuration_error.is_none()
            && self.source.is_some()
            && self.state() != WorkflowState::Analyzing
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Selects an image file. Anything other than JPEG, PNG, WEBP or GIF is
    /// rejected and leaves no image selected.
    pub fn select_file(&mut self, path: impl AsRef<Path>) -> CalorieResult<()> {
        self.begin_action();
        self.release_camera();
        self.result = None;

        let selection = ImageSource::from_file(path);
        self.accept_selection(selection)
    }

    /// Selects uploaded bytes with the type the uploader declared
    /// (e.g. `image/png`).
    pub fn select_upload(&mut self, bytes: Vec<u8>, declared_type: &str) -> CalorieResult<()> {
        self.begin_action();
        self.release_camera();
        self.result = None;

        let selection = MediaType::from_mime(declared_type)
            .map(|media_type| ImageSource::still(bytes, media_type))
            .ok_or_else(|| CalorieError::invalid_media_type(declared_type));
        self.accept_selection(selection)
    }

    fn accept_selection(&mut self, selection: CalorieResult<ImageSource>) -> CalorieResult<()> {
        match selection {
            Ok(source) => {
                info!(source = %source.describe(), "image selected");
                self.source = Some(source);
                self.transition(WorkflowState::AwaitingInput);
                Ok(())
            }
            Err(e) => {
                self.source = None;
                self.transition(WorkflowState::AwaitingInput);
                Err(self.record(e))
            }
        }
    }

    /// Acquires `device` for live capture, releasing any stream already open.
    ///
    /// The current image and result are discarded before the device is
    /// requested, whether or not acquisition succeeds.
    pub async fn open_camera(&mut self, device: &dyn CameraDevice) -> CalorieResult<()> {
        self.begin_action();
        self.source = None;
        self.result = None;
        self.release_camera();

        match CameraHandle::acquire(device).await {
            Ok(handle) => {
                self.camera = Some(handle);
                self.status.send_modify(|status| status.camera_active = true);
                self.transition(WorkflowState::AwaitingInput);
                Ok(())
            }
            Err(e) => {
                self.transition(WorkflowState::AwaitingInput);
                Err(self.record(e.into()))
            }
        }
    }

    /// Releases the camera. A photo already taken stays selected.
    pub fn close_camera(&mut self) {
        self.begin_action();
        self.release_camera();
    }

    /// Freezes the current camera frame into the selected image and releases
    /// the device. On failure the camera stays open.
    pub async fn take_photo(&mut self) -> CalorieResult<()> {
        self.begin_action();

        let Some(handle) = self.camera.as_mut() else {
            let error = CalorieError::input(InputErrorKind::CaptureFailed, "Camera is not open.");
            return Err(self.record(error));
        };

        match handle.take_photo().await {
            Ok(bytes) => {
                let source = ImageSource::still(bytes, MediaType::Jpeg);
                info!(source = %source.describe(), "photo captured");
                self.source = Some(source);
                self.result = None;
                self.release_camera();
                self.transition(WorkflowState::AwaitingInput);
                Ok(())
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    /// Encodes the selected image and runs one analysis.
    ///
    /// # Errors
    ///
    /// - `Config` when no credential is configured (state `AwaitingInput`)
    /// - `Input(NoImage)` when nothing is selected (state `AwaitingInput`)
    /// - `Encoding`, `Transport` or `Format` from the round trip (state `Failed`)
    pub async fn analyze(&mut self) -> CalorieResult<&AnalysisResult> {
        self.begin_action();

        if let Err(e) = self.analyzer.preflight() {
            self.transition(WorkflowState::AwaitingInput);
            return Err(self.record(e));
        }
        if self.source.is_none() {
            self.transition(WorkflowState::AwaitingInput);
            return Err(self.record(CalorieError::no_image()));
        }

        self.result = None;
        self.transition(WorkflowState::Analyzing);

        let outcome = {
            let analyzer = &self.analyzer;
            let guard = InFlight::arm(&self.status);
            let outcome = match self.source.as_ref() {
                Some(source) => match encode_source(source).await {
                    Ok(encoded) => analyzer.analyze(&encoded).await,
                    Err(e) => Err(e),
                },
                None => Err(CalorieError::no_image()),
            };
            guard.finish();
            outcome
        };

        match outcome {
            Ok(result) => {
                self.transition(WorkflowState::Succeeded);
                Ok(&*self.result.insert(result))
            }
            Err(e) => {
                self.transition(WorkflowState::Failed);
                Err(self.record(e))
            }
        }
    }

    fn begin_action(&mut self) {
        self.status.send_if_modified(|status| status.last_error.take().is_some());
    }

    fn record(&mut self, error: CalorieError) -> CalorieError {
        warn!(category = error.category(), error = %error, "session action failed");
        let message = error.to_string();
        self.status
            .send_modify(|status| status.last_error = Some(message));
        error
    }

    fn transition(&mut self, to: WorkflowState) {
        self.status.send_if_modified(|status| {
            if status.state == to {
                return false;
            }
            debug!(from = ?status.state, to = ?to, "session state change");
            status.state = to;
            true
        });
    }

    fn release_camera(&mut self) {
        if let Some(handle) = self.camera.take() {
            debug!(device = handle.device(), "releasing camera");
            drop(handle);
            self.status.send_modify(|status| status.camera_active = false);
        }
    }
}
