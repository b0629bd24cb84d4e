//! aura-hw: Camera capture for face photos.
//!
//! Provides V4L2-based camera access and a capture session that owns the
//! live stream until a still is taken, confirmed or abandoned.

pub mod camera;
pub mod capture;
pub mod frame;

pub use camera::{list_devices, select_device, Camera, CameraError, DeviceInfo, Facing, PixelFormat};
pub use capture::{CaptureError, CaptureSession, CaptureStatus, FrameStream, VideoSource};
pub use frame::Frame;
