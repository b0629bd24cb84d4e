//! Terminal-driven photo capture.

use anyhow::Result;
use aura_core::ImagePayload;
use aura_hw::capture::PERMISSION_MESSAGE;
use aura_hw::{CaptureSession, CaptureStatus, VideoSource};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Review {
    Use,
    Retake,
    Quit,
}

fn parse_review(answer: &str) -> Option<Review> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "" => Some(Review::Use),
        "r" | "retake" => Some(Review::Retake),
        "q" | "quit" | "n" | "no" => Some(Review::Quit),
        _ => None,
    }
}

/// One line from `input`, or `None` at end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Preview, take and review a photo. `None` means the user cancelled.
///
/// The camera is released as soon as the photo is taken, and again on every
/// way out of this function.
pub fn capture_photo<S: VideoSource>(
    source: S,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Option<ImagePayload>> {
    let mut session = CaptureSession::start(source)?;

    loop {
        match session.status() {
            CaptureStatus::PermissionDenied => {
                writeln!(out, "{PERMISSION_MESSAGE}")?;
                write!(out, "Try again? [y/N] ")?;
                out.flush()?;
                let again = read_line(input)?
                    .map(|l| matches!(l.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
                    .unwrap_or(false);
                if !again {
                    return Ok(None);
                }
                session.retry()?;
            }
            CaptureStatus::Previewing => {
                let frame = session.preview()?;
                writeln!(
                    out,
                    "Camera ready ({}x{}). Press Enter to take the photo, or q to cancel.",
                    frame.width(),
                    frame.height()
                )?;
                if frame.is_dark {
                    writeln!(out, "The picture is very dark. Check the lighting or the lens cover.")?;
                }
                out.flush()?;
                match read_line(input)? {
                    Some(l) if l.trim().eq_ignore_ascii_case("q") => return Ok(None),
                    Some(_) => session.take_photo()?,
                    None => return Ok(None),
                }
            }
            CaptureStatus::Captured => {
                write!(out, "Photo taken. Use it? [Y]es / [r]etake / [q]uit ")?;
                out.flush()?;
                let Some(answer) = read_line(input)? else {
                    return Ok(None);
                };
                match parse_review(&answer) {
                    Some(Review::Use) => return Ok(Some(session.confirm()?)),
                    Some(Review::Retake) => session.retake()?,
                    Some(Review::Quit) => return Ok(None),
                    None => writeln!(out, "Please answer y, r or q.")?,
                }
            }
            CaptureStatus::Closed => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_hw::{CameraError, Frame, FrameStream};
    use image::RgbImage;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    struct Fake {
        live: Rc<Cell<usize>>,
        opened: Rc<Cell<usize>>,
        denials: usize,
    }

    struct FakeStream(Rc<Cell<usize>>);

    impl FrameStream for FakeStream {
        fn next_frame(&mut self) -> Result<Frame, CameraError> {
            Ok(Frame::new(RgbImage::from_pixel(8, 6, image::Rgb([180, 150, 130])), 1))
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    impl VideoSource for Fake {
        type Stream = FakeStream;

        fn open_stream(&mut self) -> Result<FakeStream, CameraError> {
            if self.denials > 0 {
                self.denials -= 1;
                return Err(CameraError::PermissionDenied("/dev/video0".into()));
            }
            self.opened.set(self.opened.get() + 1);
            self.live.set(self.live.get() + 1);
            Ok(FakeStream(self.live.clone()))
        }
    }

    fn fake(denials: usize) -> (Fake, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let live = Rc::new(Cell::new(0));
        let opened = Rc::new(Cell::new(0));
        (
            Fake {
                live: live.clone(),
                opened: opened.clone(),
                denials,
            },
            live,
            opened,
        )
    }

    fn run(source: Fake, script: &str) -> (Option<ImagePayload>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let photo = capture_photo(source, &mut input, &mut out).unwrap();
        (photo, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_take_and_use() {
        let (source, live, _) = fake(0);
        let (photo, out) = run(source, "\ny\n");
        let photo = photo.unwrap();
        assert_eq!(photo.media_type(), "image/jpeg");
        assert_eq!(photo.decode_image().unwrap().width(), 8);
        assert!(out.contains("Camera ready (8x6)"));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_retake_reopens_camera() {
        let (source, live, opened) = fake(0);
        let (photo, _) = run(source, "\nr\n\n\n");
        assert!(photo.is_some());
        assert_eq!(opened.get(), 2);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_quit_from_preview_releases() {
        let (source, live, _) = fake(0);
        let (photo, _) = run(source, "q\n");
        assert!(photo.is_none());
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_unknown_answer_asks_again() {
        let (source, _, _) = fake(0);
        let (photo, out) = run(source, "\nmaybe\nq\n");
        assert!(photo.is_none());
        assert!(out.contains("Please answer y, r or q."));
    }

    #[test]
    fn test_permission_denied_retry() {
        let (source, live, _) = fake(1);
        let (photo, out) = run(source, "y\n\ny\n");
        assert!(photo.is_some());
        assert!(out.contains(PERMISSION_MESSAGE));
        assert!(out.contains("Try again? [y/N]"));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_permission_denied_declined() {
        let (source, _, opened) = fake(1);
        let (photo, _) = run(source, "\n");
        assert!(photo.is_none());
        assert_eq!(opened.get(), 0);
    }

    #[test]
    fn test_end_of_input_cancels() {
        let (source, live, _) = fake(0);
        let (photo, _) = run(source, "");
        assert!(photo.is_none());
        assert_eq!(live.get(), 0);
    }
}
