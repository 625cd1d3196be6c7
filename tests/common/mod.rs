//! Common test utilities for the calorie-lens integration tests
//!
//! - [`StubAnalyzer`]: canned model reply, no network
//! - [`StubCamera`]: in-memory camera with failure injection
//! - [`StubServer`]: minimal HTTP server standing in for the Gemini endpoint

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use calorie_lens::capture::camera::{CameraError, Resolution, VideoStream};
use calorie_lens::{
    AnalysisResult, Analyzer, CalorieError, CalorieResult, CameraDevice, EncodedImage,
};
use image::{DynamicImage, Rgb, RgbImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Model reply for two tacos and an apple (595 kcal).
pub const TACO_REPLY: &str = r#"[
  {"foodItem": "Beef Taco", "caloriesPerItem": 250, "quantity": 2, "servingSize": "1 taco"},
  {"foodItem": "Apple", "caloriesPerItem": 95, "quantity": 1, "servingSize": "1 medium (182g)"}
]"#;

/// Writes a small valid PNG and returns its path.
pub fn write_png(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_pixel(4, 3, Rgb([200, 120, 40]))
        .save(&path)
        .unwrap();
    path
}

/// Wraps `text` in a successful `generateContent` response body.
pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

/// Analyzer that parses a fixed reply instead of calling a model.
#[derive(Clone)]
pub struct StubAnalyzer {
    reply: String,
    configured: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    last_image: Arc<Mutex<Option<EncodedImage>>>,
}

impl StubAnalyzer {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            configured: true,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_image: Arc::new(Mutex::new(None)),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::replying(TACO_REPLY)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_image(&self) -> Option<EncodedImage> {
        self.last_image.lock().unwrap().clone()
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    fn preflight(&self) -> CalorieResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(CalorieError::missing_api_key())
        }
    }

    async fn analyze(&self, image: &EncodedImage) -> CalorieResult<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_image.lock().unwrap() = Some(image.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let records = food_parse::parse_food_records(&self.reply)?;
        Ok(AnalysisResult::from_records(records))
    }
}

/// What [`StubCamera::open`] should do.
#[derive(Debug, Clone)]
pub enum OpenBehavior {
    Stream,
    Fail(CameraError),
}

/// In-memory camera that counts opens and releases.
#[derive(Clone)]
pub struct StubCamera {
    name: String,
    behavior: OpenBehavior,
    fail_capture: Arc<AtomicBool>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl StubCamera {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: OpenBehavior::Stream,
            fail_capture: Arc::new(AtomicBool::new(false)),
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str, error: CameraError) -> Self {
        Self {
            behavior: OpenBehavior::Fail(error),
            ..Self::new(name)
        }
    }

    pub fn set_fail_capture(&self, fail: bool) {
        self.fail_capture.store(fail, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams currently open.
    pub fn live(&self) -> usize {
        self.opened() - self.released()
    }
}

#[async_trait]
impl CameraDevice for StubCamera {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError> {
        match &self.behavior {
            OpenBehavior::Fail(error) => Err(error.clone()),
            OpenBehavior::Stream => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(StubStream {
                    fail_capture: Arc::clone(&self.fail_capture),
                    released: Arc::clone(&self.released),
                }))
            }
        }
    }
}

struct StubStream {
    fail_capture: Arc<AtomicBool>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl VideoStream for StubStream {
    fn resolution(&self) -> Resolution {
        Resolution { w: 8, h: 6 }
    }

    async fn capture_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(CameraError::Capture("sensor timeout".to_string()));
        }
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            8,
            6,
            Rgb([10, 200, 30]),
        )))
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// One request as received by [`StubServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// HTTP server answering every request with the same status and body.
pub struct StubServer {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let body = body.into();

        let captured = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = Arc::clone(&captured);
                let body = body.clone();
                tokio::spawn(async move {
                    let _ = serve_one(stream, status, &body, &captured).await;
                });
            }
        });

        Self { endpoint, requests }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn serve_one(
    mut stream: TcpStream,
    status: u16,
    body: &str,
    captured: &Mutex<Vec<CapturedRequest>>,
) -> Option<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let end = buffer.len().min(header_end + content_length);
    captured.lock().unwrap().push(CapturedRequest {
        request_line,
        headers,
        body: String::from_utf8_lossy(&buffer[header_end..end]).to_string(),
    });

    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await.ok()?;
    stream.shutdown().await.ok()
}
