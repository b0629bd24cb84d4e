//! V4L2 camera capture via the `v4l` crate.
//!
//! The device is opened per stream: [`Camera::open_stream`] acquires the
//! hardware and the returned [`CameraStream`] releases it when dropped.

use crate::capture::{FrameStream, VideoSource};
use crate::frame::{self, Frame};
use image::RgbImage;
use std::io;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Ideal preview resolution requested from the driver.
pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

const NAME_HINTS_USER: [&str; 5] = ["front", "user", "integrated", "facetime", "webcam"];
const NAME_HINTS_ENVIRONMENT: [&str; 4] = ["rear", "back", "environment", "world"];
const NAME_HINTS_INFRARED: [&str; 3] = ["infrared", "ir camera", "integrated i"];

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("no video capture devices found")]
    NoDevices,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Which way the preferred camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    #[default]
    User,
    Environment,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Motion-JPEG, one JPEG per buffer.
    Mjpeg,
    /// Packed 24-bit RGB.
    Rgb3,
}

/// Stream parameters requested when acquiring the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            width: IDEAL_WIDTH,
            height: IDEAL_HEIGHT,
            facing: Facing::User,
        }
    }
}

/// A V4L2 camera that has not been acquired yet.
#[derive(Debug, Clone)]
pub struct Camera {
    pub device_path: String,
    pub request: StreamRequest,
    /// Frames discarded after opening while auto-exposure settles.
    pub warmup_frames: usize,
}

impl Camera {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            request: StreamRequest::default(),
            warmup_frames: 4,
        }
    }

    /// Pick the preferred device for `facing` from the system's capture devices.
    pub fn discover(facing: Facing) -> Result<Self, CameraError> {
        let devices = list_devices();
        let chosen = select_device(&devices, facing).ok_or(CameraError::NoDevices)?;
        tracing::info!(device = %chosen.path, name = %chosen.name, "selected camera");
        let mut camera = Self::new(chosen.path.clone());
        camera.request.facing = facing;
        Ok(camera)
    }

    pub fn with_warmup_frames(mut self, frames: usize) -> Self {
        self.warmup_frames = frames;
        self
    }
}

impl VideoSource for Camera {
    type Stream = CameraStream;

    fn open_stream(&mut self) -> Result<CameraStream, CameraError> {
        let device_path = self.device_path.as_str();
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| map_open_error(e, device_path))?;

        let caps = device.query_caps().map_err(|e| map_open_error(e, device_path))?;
        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = self.request.width;
        fmt.height = self.request.height;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = if fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpeg
        } else if fourcc == FourCC::new(b"RGB3") {
            PixelFormat::Rgb3
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, or RGB3)"
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        let stream = MmapStream::with_buffers(&device, BufType::VideoCapture, 4).map_err(|e| {
            CameraError::CaptureFailed(format!("failed to create mmap stream: {e}"))
        })?;

        let mut stream = CameraStream {
            stream,
            _device: device,
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
            device_path: device_path.to_string(),
        };

        if self.warmup_frames > 0 {
            tracing::debug!(count = self.warmup_frames, "discarding warmup frames");
            for _ in 0..self.warmup_frames {
                let _ = stream.next_frame();
            }
        }
        Ok(stream)
    }
}

/// An acquired, streaming camera. Dropping it stops streaming and closes
/// the device.
pub struct CameraStream {
    // Declared before the device so buffers are unmapped first.
    stream: MmapStream<'static>,
    _device: Device,
    pub width: u32,
    pub height: u32,
    pixel_format: PixelFormat,
    device_path: String,
}

impl CameraStream {
    fn buf_to_rgb(&self, buf: &[u8]) -> Result<RgbImage, CameraError> {
        let pixels = (self.width * self.height) as usize;
        let rgb = match self.pixel_format {
            PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, self.width, self.height)
                .map_err(|e| CameraError::CaptureFailed(format!("YUYV conversion failed: {e}")))?,
            PixelFormat::Rgb3 => {
                if buf.len() < pixels * 3 {
                    return Err(CameraError::CaptureFailed(format!(
                        "RGB3 buffer too short: expected {}, got {}",
                        pixels * 3,
                        buf.len()
                    )));
                }
                buf[..pixels * 3].to_vec()
            }
            PixelFormat::Mjpeg => {
                let decoded = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
                    .map_err(|e| CameraError::CaptureFailed(format!("MJPG decode failed: {e}")))?;
                return Ok(decoded.to_rgb8());
            }
        };
        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| CameraError::CaptureFailed("frame size mismatch".into()))
    }
}

impl FrameStream for CameraStream {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        let sequence = meta.sequence;
        let buf = buf.to_vec();
        let image = self.buf_to_rgb(&buf)?;
        let frame = Frame::new(image, sequence);
        if frame.is_dark {
            tracing::debug!(seq = sequence, "dark frame");
        }
        Ok(frame)
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        tracing::info!(device = %self.device_path, "camera stream released");
    }
}

fn map_open_error(e: io::Error, device_path: &str) -> CameraError {
    let denied = e.kind() == io::ErrorKind::PermissionDenied
        || matches!(e.raw_os_error(), Some(libc::EACCES) | Some(libc::EPERM));
    if denied {
        CameraError::PermissionDenied(device_path.to_string())
    } else if e.raw_os_error() == Some(libc::EBUSY) {
        CameraError::DeviceBusy
    } else {
        CameraError::DeviceNotFound(format!("{device_path}: {e}"))
    }
}

/// List available V4L2 video capture devices.
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for i in 0..16 {
        let path = format!("/dev/video{i}");
        if !Path::new(&path).exists() {
            continue;
        }
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            continue;
        }
        devices.push(DeviceInfo {
            path,
            name: caps.card.clone(),
            driver: caps.driver.clone(),
            bus: caps.bus.clone(),
        });
    }

    devices
}

/// Rank devices for `facing`: a name hinting at the wanted direction wins,
/// infrared sensors lose, otherwise list order is kept.
pub fn select_device(devices: &[DeviceInfo], facing: Facing) -> Option<&DeviceInfo> {
    let hints: &[&str] = match facing {
        Facing::User => &NAME_HINTS_USER,
        Facing::Environment => &NAME_HINTS_ENVIRONMENT,
    };
    let score = |d: &DeviceInfo| {
        let name = d.name.to_ascii_lowercase();
        let infrared = NAME_HINTS_INFRARED.iter().any(|h| name.contains(h));
        let hinted = hints.iter().any(|h| name.contains(h));
        match (infrared, hinted) {
            (true, _) => 0,
            (false, false) => 1,
            (false, true) => 2,
        }
    };
    // max_by_key keeps the last maximum, so walk in reverse to prefer earlier devices.
    devices.iter().rev().max_by_key(|d| score(d))
}
