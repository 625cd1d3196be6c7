//! Integration tests for the capture session state machine
//!
//! Covers file selection, camera acquisition and release, analysis outcomes
//! and the status channel observed by front ends.

mod common;

use std::time::Duration;

use calorie_lens::capture::CameraError;
use calorie_lens::error::classify;
use calorie_lens::{
    CaptureSession, ImageSource, InputErrorKind, MediaType, WorkflowState,
};
use common::{StubAnalyzer, StubCamera, TACO_REPLY, write_png};

#[tokio::test]
async fn test_select_file_and_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_png(&dir, "lunch.png");
    let analyzer = StubAnalyzer::replying(TACO_REPLY);
    let mut session = CaptureSession::new(analyzer.clone());

    session.select_file(&photo).unwrap();
    assert_eq!(session.state(), WorkflowState::AwaitingInput);
    assert!(session.can_analyze());

    let result = session.analyze().await.unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.total_calories(), 595.0);

    assert_eq!(session.state(), WorkflowState::Succeeded);
    assert!(session.last_error().is_none());
    assert_eq!(analyzer.calls(), 1);

    let sent = analyzer.last_image().unwrap();
    assert_eq!(sent.media_type, MediaType::Png);
    assert!(!sent.data.is_empty());
}

#[tokio::test]
async fn test_non_image_after_valid_selection_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_png(&dir, "lunch.png");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not an image").unwrap();

    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));
    session.select_file(&photo).unwrap();
    session.analyze().await.unwrap();

    let error = session.select_file(&notes).unwrap_err();
    assert_eq!(error.input_kind(), Some(InputErrorKind::InvalidMediaType));
    assert!(classify::clears_on_next_action(&error));

    assert!(session.source().is_none());
    assert!(session.result().is_none());
    assert_eq!(session.total_calories(), 0.0);
    assert_eq!(session.state(), WorkflowState::AwaitingInput);
    assert!(session.last_error().is_some());
    assert!(!session.can_analyze());
}

#[tokio::test]
async fn test_analyze_without_image() {
    let analyzer = StubAnalyzer::replying(TACO_REPLY);
    let mut session = CaptureSession::new(analyzer.clone());

    let error = session.analyze().await.unwrap_err();
    assert_eq!(error.input_kind(), Some(InputErrorKind::NoImage));
    assert_eq!(session.state(), WorkflowState::AwaitingInput);
    assert_eq!(
        session.last_error().as_deref(),
        Some("Please select an image or take a photo first.")
    );
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn test_missing_credential_blocks_every_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_png(&dir, "lunch.png");
    let analyzer = StubAnalyzer::unconfigured();
    let mut session = CaptureSession::new(analyzer.clone());

    assert!(session.configuration_error().is_some());
    session.select_file(&photo).unwrap();
    assert!(!session.can_analyze());

    for _ in 0..2 {
        let error = session.analyze().await.unwrap_err();
        assert!(classify::is_fatal(&error));
        assert_eq!(session.state(), WorkflowState::AwaitingInput);
    }
    assert_eq!(analyzer.calls(), 0);
    assert!(session.configuration_error().is_some());
}

#[tokio::test]
async fn test_failed_analysis_leaves_no_result() {
    let mut session = CaptureSession::new(StubAnalyzer::replying("I cannot identify this image"));
    session.select_upload(vec![0xFF, 0xD8, 0xFF], "image/jpeg").unwrap();

    let error = session.analyze().await.unwrap_err();
    assert_eq!(error.category(), "format");
    assert_eq!(session.state(), WorkflowState::Failed);
    assert!(session.result().is_none());
    assert!(
        session
            .last_error()
            .unwrap()
            .contains("AI response is not valid JSON")
    );
}

#[tokio::test]
async fn test_next_action_clears_error() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_png(&dir, "lunch.png");
    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));

    session.analyze().await.unwrap_err();
    assert!(session.last_error().is_some());

    session.select_file(&photo).unwrap();
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn test_camera_photo_becomes_source() {
    let camera = StubCamera::new("stub-cam");
    let analyzer = StubAnalyzer::replying(TACO_REPLY);
    let mut session = CaptureSession::new(analyzer.clone());

    session.open_camera(&camera).await.unwrap();
    assert!(session.camera_active());
    assert_eq!(camera.live(), 1);

    session.take_photo().await.unwrap();
    assert!(!session.camera_active());
    assert_eq!(camera.live(), 0);

    match session.source() {
        Some(ImageSource::Still { bytes, media_type }) => {
            assert_eq!(*media_type, MediaType::Jpeg);
            assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        }
        other => panic!("expected a still image, got {:?}", other),
    }

    session.analyze().await.unwrap();
    assert_eq!(analyzer.last_image().unwrap().media_type, MediaType::Jpeg);
}

#[tokio::test]
async fn test_open_camera_clears_image_and_result() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_png(&dir, "lunch.png");
    let camera = StubCamera::new("stub-cam");
    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));

    session.select_file(&photo).unwrap();
    session.analyze().await.unwrap();
    assert!(session.result().is_some());

    session.open_camera(&camera).await.unwrap();
    assert!(session.source().is_none());
    assert!(session.result().is_none());
    assert_eq!(session.state(), WorkflowState::AwaitingInput);
}

#[tokio::test]
async fn test_reopening_camera_releases_previous_stream() {
    let camera = StubCamera::new("stub-cam");
    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));

    session.open_camera(&camera).await.unwrap();
    session.open_camera(&camera).await.unwrap();

    assert_eq!(camera.opened(), 2);
    assert_eq!(camera.released(), 1);
    assert_eq!(camera.live(), 1);

    drop(session);
    assert_eq!(camera.live(), 0);
}

#[tokio::test]
async fn test_selecting_file_releases_camera() {
    let dir = tempfile::tempdir().unwrap();
    let photo = write_png(&dir, "lunch.png");
    let camera = StubCamera::new("stub-cam");
    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));

    session.open_camera(&camera).await.unwrap();
    session.select_file(&photo).unwrap();
    assert!(!session.camera_active());
    assert_eq!(camera.live(), 0);
}

#[tokio::test]
async fn test_camera_acquisition_errors() {
    let cases = [
        (CameraError::PermissionDenied, InputErrorKind::CameraPermissionDenied),
        (CameraError::NotFound, InputErrorKind::CameraNotFound),
        (
            CameraError::Unavailable("in use by another application".to_string()),
            InputErrorKind::CameraUnavailable,
        ),
    ];

    for (camera_error, expected) in cases {
        let camera = StubCamera::failing("broken-cam", camera_error);
        let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));

        let error = session.open_camera(&camera).await.unwrap_err();
        assert_eq!(error.input_kind(), Some(expected));
        assert!(!session.camera_active());
        assert!(session.last_error().is_some());
    }
}

#[tokio::test]
async fn test_capture_failure_keeps_camera_open() {
    let camera = StubCamera::new("stub-cam");
    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));
    session.open_camera(&camera).await.unwrap();

    camera.set_fail_capture(true);
    let error = session.take_photo().await.unwrap_err();
    assert_eq!(error.input_kind(), Some(InputErrorKind::CaptureFailed));
    assert!(session.camera_active());
    assert!(session.source().is_none());

    camera.set_fail_capture(false);
    session.take_photo().await.unwrap();
    assert!(session.source().is_some());
}

#[tokio::test]
async fn test_close_camera_keeps_captured_image() {
    let camera = StubCamera::new("stub-cam");
    let mut session = CaptureSession::new(StubAnalyzer::replying(TACO_REPLY));

    session.open_camera(&camera).await.unwrap();
    session.close_camera();
    assert_eq!(camera.live(), 0);
    assert!(session.source().is_none());

    session.open_camera(&camera).await.unwrap();
    session.take_photo().await.unwrap();
    session.close_camera();
    assert!(session.source().is_some());
}

#[tokio::test]
async fn test_observers_see_analyzing_state() {
    let analyzer = StubAnalyzer::replying(TACO_REPLY).with_delay(Duration::from_millis(50));
    let mut session = CaptureSession::new(analyzer);
    session.select_upload(vec![1, 2, 3], "image/webp").unwrap();

    let mut status = session.subscribe();
    let (outcome, observed) = tokio::join!(
        async { session.analyze().await.map(|r| r.len()) },
        async {
            status
                .wait_for(|s| s.state == WorkflowState::Analyzing)
                .await
                .map(|s| s.state)
        }
    );

    assert_eq!(outcome.unwrap(), 2);
    assert_eq!(observed.unwrap(), WorkflowState::Analyzing);
    assert_eq!(session.state(), WorkflowState::Succeeded);
}

#[tokio::test]
async fn test_dropped_analysis_marks_failure() {
    let analyzer = StubAnalyzer::replying(TACO_REPLY).with_delay(Duration::from_secs(5));
    let mut session = CaptureSession::new(analyzer);
    session.select_upload(vec![1, 2, 3], "image/gif").unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(20), session.analyze()).await;
    assert!(outcome.is_err());

    assert_eq!(session.state(), WorkflowState::Failed);
    assert!(session.last_error().unwrap().contains("cancelled"));
    assert!(session.result().is_none());
}
