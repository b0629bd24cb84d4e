//! Preview, take, confirm or retake a still photo.
//!
//! A [`CaptureSession`] owns the live stream inside its state. Taking a
//! photo, closing the session and dropping it all drop the stream, which is
//! what releases the camera.

use crate::camera::CameraError;
use crate::frame::{self, Frame, FrameError, STILL_JPEG_QUALITY};
use aura_core::ImagePayload;
use image::RgbImage;
use thiserror::Error;

/// Shown while camera access is denied.
pub const PERMISSION_MESSAGE: &str = "We need access to your camera to analyze your facial \
structure. Please check your camera permissions.";

/// A live source of frames. Dropping it releases the hardware.
pub trait FrameStream {
    fn next_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Something that can acquire a [`FrameStream`].
pub trait VideoSource {
    type Stream: FrameStream;

    fn open_stream(&mut self) -> Result<Self::Stream, CameraError>;
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("cannot {action} while {status:?}")]
    InvalidState {
        action: &'static str,
        status: CaptureStatus,
    },
}

/// Observable capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Previewing,
    Captured,
    PermissionDenied,
    Closed,
}

enum CaptureState<T> {
    Previewing(T),
    Captured(RgbImage),
    PermissionDenied,
    Closed,
}

pub struct CaptureSession<S: VideoSource> {
    source: S,
    state: CaptureState<S::Stream>,
    jpeg_quality: u8,
}

impl<S: VideoSource> CaptureSession<S> {
    /// Acquire the camera and start previewing.
    ///
    /// A denied permission is not an error here: the session comes back in
    /// [`CaptureStatus::PermissionDenied`] and [`retry`](Self::retry) asks again.
    pub fn start(source: S) -> Result<Self, CaptureError> {
        let mut session = Self {
            source,
            state: CaptureState::Closed,
            jpeg_quality: STILL_JPEG_QUALITY,
        };
        session.acquire()?;
        Ok(session)
    }

    fn acquire(&mut self) -> Result<(), CaptureError> {
        match self.source.open_stream() {
            Ok(stream) => {
                self.state = CaptureState::Previewing(stream);
                Ok(())
            }
            Err(CameraError::PermissionDenied(device)) => {
                tracing::warn!(%device, "camera permission denied");
                self.state = CaptureState::PermissionDenied;
                Ok(())
            }
            Err(e) => {
                self.state = CaptureState::Closed;
                Err(e.into())
            }
        }
    }

    pub fn status(&self) -> CaptureStatus {
        match self.state {
            CaptureState::Previewing(_) => CaptureStatus::Previewing,
            CaptureState::Captured(_) => CaptureStatus::Captured,
            CaptureState::PermissionDenied => CaptureStatus::PermissionDenied,
            CaptureState::Closed => CaptureStatus::Closed,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, CaptureState::Previewing(_))
    }

    fn invalid(&self, action: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            action,
            status: self.status(),
        }
    }

    /// Next preview frame.
    pub fn preview(&mut self) -> Result<Frame, CaptureError> {
        match &mut self.state {
            CaptureState::Previewing(stream) => Ok(stream.next_frame()?),
            _ => Err(self.invalid("preview")),
        }
    }

    /// Freeze the next frame (mirrored like the preview) and release the stream.
    pub fn take_photo(&mut self) -> Result<(), CaptureError> {
        let frame = match &mut self.state {
            CaptureState::Previewing(stream) => stream.next_frame()?,
            _ => return Err(self.invalid("take a photo")),
        };
        tracing::debug!(
            seq = frame.sequence,
            width = frame.width(),
            height = frame.height(),
            dark = frame.is_dark,
            "photo taken"
        );
        // Replacing the state drops the stream.
        self.state = CaptureState::Captured(frame.mirrored());
        Ok(())
    }

    /// The frozen still, if one has been taken.
    pub fn still(&self) -> Option<&RgbImage> {
        match &self.state {
            CaptureState::Captured(img) => Some(img),
            _ => None,
        }
    }

    /// Discard the still and start previewing again.
    pub fn retake(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.state, CaptureState::Captured(_)) {
            return Err(self.invalid("retake"));
        }
        self.state = CaptureState::Closed;
        self.acquire()
    }

    /// Ask for camera access again after a denial.
    pub fn retry(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.state, CaptureState::PermissionDenied) {
            return Err(self.invalid("retry"));
        }
        self.acquire()
    }

    /// Accept the still, ending the session.
    pub fn confirm(mut self) -> Result<ImagePayload, CaptureError> {
        match std::mem::replace(&mut self.state, CaptureState::Closed) {
            CaptureState::Captured(img) => Ok(frame::encode_still(&img, self.jpeg_quality)?),
            other => {
                self.state = other;
                Err(self.invalid("confirm"))
            }
        }
    }

    /// Cancel, releasing the camera if it is still streaming.
    pub fn close(mut self) {
        self.state = CaptureState::Closed;
    }
}

impl<S: VideoSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        if self.is_streaming() {
            tracing::debug!("capture session torn down while streaming");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Probe {
        live: Arc<AtomicUsize>,
        opened: Arc<AtomicUsize>,
        denied: Arc<AtomicBool>,
    }

    struct FakeSource(Probe);

    struct FakeStream {
        live: Arc<AtomicUsize>,
        seq: u32,
    }

    impl FrameStream for FakeStream {
        fn next_frame(&mut self) -> Result<Frame, CameraError> {
            self.seq += 1;
            // Left half red, right half blue.
            let img = RgbImage::from_fn(16, 8, |x, _| {
                if x < 8 {
                    image::Rgb([255, 0, 0])
                } else {
                    image::Rgb([0, 0, 255])
                }
            });
            Ok(Frame::new(img, self.seq))
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl VideoSource for FakeSource {
        type Stream = FakeStream;

        fn open_stream(&mut self) -> Result<FakeStream, CameraError> {
            if self.0.denied.load(Ordering::SeqCst) {
                return Err(CameraError::PermissionDenied("/dev/fake0".into()));
            }
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            self.0.live.fetch_add(1, Ordering::SeqCst);
            Ok(FakeStream {
                live: self.0.live.clone(),
                seq: 0,
            })
        }
    }

    struct BrokenSource;

    impl VideoSource for BrokenSource {
        type Stream = FakeStream;

        fn open_stream(&mut self) -> Result<FakeStream, CameraError> {
            Err(CameraError::DeviceBusy)
        }
    }

    fn live(p: &Probe) -> usize {
        p.live.load(Ordering::SeqCst)
    }

    #[test]
    fn test_take_photo_releases_stream_and_confirm_yields_jpeg() {
        let probe = Probe::default();
        let mut session = CaptureSession::start(FakeSource(probe.clone())).unwrap();
        assert_eq!(session.status(), CaptureStatus::Previewing);
        assert_eq!(live(&probe), 1);

        session.preview().unwrap();
        session.take_photo().unwrap();
        assert_eq!(session.status(), CaptureStatus::Captured);
        assert_eq!(live(&probe), 0);

        let payload = session.confirm().unwrap();
        assert_eq!(payload.media_type(), "image/jpeg");
        assert_eq!(live(&probe), 0);
    }

    #[test]
    fn test_still_is_mirrored() {
        let probe = Probe::default();
        let mut session = CaptureSession::start(FakeSource(probe)).unwrap();
        session.take_photo().unwrap();
        let still = session.still().unwrap();
        assert_eq!(still.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(still.get_pixel(15, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_retake_reacquires() {
        let probe = Probe::default();
        let mut session = CaptureSession::start(FakeSource(probe.clone())).unwrap();
        session.take_photo().unwrap();
        session.retake().unwrap();
        assert_eq!(session.status(), CaptureStatus::Previewing);
        assert_eq!(live(&probe), 1);
        assert_eq!(probe.opened.load(Ordering::SeqCst), 2);
        session.close();
        assert_eq!(live(&probe), 0);
    }

    #[test]
    fn test_drop_while_previewing_releases() {
        let probe = Probe::default();
        {
            let _session = CaptureSession::start(FakeSource(probe.clone())).unwrap();
            assert_eq!(live(&probe), 1);
        }
        assert_eq!(live(&probe), 0);
    }

    #[test]
    fn test_permission_denied_is_a_state_with_retry() {
        let probe = Probe::default();
        probe.denied.store(true, Ordering::SeqCst);

        let mut session = CaptureSession::start(FakeSource(probe.clone())).unwrap();
        assert_eq!(session.status(), CaptureStatus::PermissionDenied);
        assert!(!session.is_streaming());
        assert!(matches!(
            session.take_photo(),
            Err(CaptureError::InvalidState { status: CaptureStatus::PermissionDenied, .. })
        ));

        session.retry().unwrap();
        assert_eq!(session.status(), CaptureStatus::PermissionDenied);

        probe.denied.store(false, Ordering::SeqCst);
        session.retry().unwrap();
        assert_eq!(session.status(), CaptureStatus::Previewing);
        assert_eq!(live(&probe), 1);
    }

    #[test]
    fn test_confirm_without_still_is_rejected() {
        let probe = Probe::default();
        let session = CaptureSession::start(FakeSource(probe.clone())).unwrap();
        let err = session.confirm().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidState { action: "confirm", status: CaptureStatus::Previewing }
        ));
        assert_eq!(live(&probe), 0);
    }

    #[test]
    fn test_other_camera_errors_propagate() {
        let err = CaptureSession::start(BrokenSource).err().unwrap();
        assert!(matches!(err, CaptureError::Camera(CameraError::DeviceBusy)));
    }
}
