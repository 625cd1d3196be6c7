// # Capture Module
//
// Image acquisition: declared media types, the image sources a session can
// hold, and the camera abstraction with its owned handle.

pub mod camera;
pub mod media;
pub mod source;

pub use camera::{CameraDevice, CameraError, CameraHandle, ImageFileCamera, Resolution, VideoStream};
pub use media::MediaType;
pub use source::ImageSource;
