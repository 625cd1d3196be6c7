// # Camera Capture
//
// Live capture is modelled as two traits: a `CameraDevice` that grants
// exclusive access to a video input, and the `VideoStream` it hands out. The
// session never holds a bare stream; it holds a `CameraHandle`, which
// releases the device when dropped. Superseding, closing, taking a photo and
// ending the session all release through that single path.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info};

/// JPEG quality used when freezing a frame into a still image.
pub const JPEG_QUALITY: u8 = 90;

/// Native frame size of a stream, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub w: u32,
    pub h: u32,
}

/// Distinct ways camera acquisition or capture can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Access to the device was refused
    PermissionDenied,
    /// No device present
    NotFound,
    /// Device present but unusable (busy, unreadable, unsupported)
    Unavailable(String),
    /// The stream was live but a still could not be produced
    Capture(String),
}

impl CameraError {
    /// Maps an I/O failure on the device node to one of the acquisition errors.
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            io::ErrorKind::NotFound => CameraError::NotFound,
            _ => CameraError::Unavailable(error.to_string()),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied => write!(
                f,
                "Camera permission denied. Please allow camera access for this application."
            ),
            CameraError::NotFound => write!(
                f,
                "No camera found on this device. Ensure it's connected and enabled."
            ),
            CameraError::Unavailable(reason) => write!(f, "Error accessing camera: {}", reason),
            CameraError::Capture(reason) => write!(f, "Could not capture photo: {}", reason),
        }
    }
}

impl std::error::Error for CameraError {}

/// A video input device that can be opened for exclusive use.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Human-readable device name for logs.
    fn name(&self) -> String;

    /// Acquires the device and starts streaming.
    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError>;
}

/// A live stream of frames from an opened device.
#[async_trait]
pub trait VideoStream: Send {
    /// Native resolution of the frames this stream produces.
    fn resolution(&self) -> Resolution;

    /// Returns the frame currently being shown.
    async fn capture_frame(&mut self) -> Result<DynamicImage, CameraError>;

    /// Stops streaming and gives the device back. Called exactly once, by
    /// [`CameraHandle`]'s `Drop`.
    fn release(&mut self);
}

/// Owned, scoped access to an open camera.
pub struct CameraHandle {
    stream: Box<dyn VideoStream>,
    device: String,
}

impl CameraHandle {
    /// Opens `device` and wraps the stream.
    pub async fn acquire(device: &dyn CameraDevice) -> Result<Self, CameraError> {
        let stream = device.open().await?;
        let resolution = stream.resolution();
        info!(
            device = %device.name(),
            width = resolution.w,
            height = resolution.h,
            "camera stream acquired"
        );
        Ok(Self {
            stream,
            device: device.name(),
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.stream.resolution()
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Freezes the current frame at native resolution and encodes it as JPEG.
    ///
    /// The handle stays open; callers drop it afterwards to release the device.
    pub async fn take_photo(&mut self) -> Result<Vec<u8>, CameraError> {
        let frame = self.stream.capture_frame().await?;
        encode_still(&frame)
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.stream.release();
        debug!(device = %self.device, "camera stream released");
    }
}

impl fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraHandle")
            .field("device", &self.device)
            .field("resolution", &self.stream.resolution())
            .finish()
    }
}

/// Encodes a frame as a JPEG still at [`JPEG_QUALITY`].
pub fn encode_still(frame: &DynamicImage) -> Result<Vec<u8>, CameraError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(CameraError::Capture("camera frame is empty".to_string()));
    }

    let rgb = frame.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| CameraError::Capture(e.to_string()))?;
    Ok(bytes)
}

/// A camera whose "live" frame is read from an image file.
///
/// Stands in for a capture device node: a missing file is an absent device,
/// an unreadable one a permission failure. Like a real device it can only be
/// open once at a time.
#[derive(Debug, Clone)]
pub struct ImageFileCamera {
    path: PathBuf,
    in_use: Arc<AtomicBool>,
}

impl ImageFileCamera {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a stream from this device is currently open.
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    async fn load_frame(&self) -> Result<DynamicImage, CameraError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CameraError::from_io(&e))?;
        image::load_from_memory(&bytes).map_err(|e| {
            CameraError::Unavailable(format!(
                "'{}' does not provide readable frames: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl CameraDevice for ImageFileCamera {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError> {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(CameraError::Unavailable("device is busy".to_string()));
        }

        match self.load_frame().await {
            Ok(frame) => Ok(Box::new(FileFrameStream {
                frame,
                in_use: Arc::clone(&self.in_use),
                released: false,
            })),
            Err(e) => {
                self.in_use.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

struct FileFrameStream {
    frame: DynamicImage,
    in_use: Arc<AtomicBool>,
    released: bool,
}

#[async_trait]
impl VideoStream for FileFrameStream {
    fn resolution(&self) -> Resolution {
        Resolution {
            w: self.frame.width(),
            h: self.frame.height(),
        }
    }

    async fn capture_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if self.released {
            return Err(CameraError::Capture("stream has been released".to_string()));
        }
        Ok(self.frame.clone())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.in_use.store(false, Ordering::SeqCst);
        }
    }
}
