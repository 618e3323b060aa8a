//! Photo acquisition for the document step. The camera stream is the one
//! shared resource with a real lifecycle: at most one open stream per
//! session, released on capture, on explicit cancel, and on drop. The
//! gallery path is a plain file read with an image-type check.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::domain::PhotoData;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("camera frame capture failed: {0}")]
    Frame(String),
    #[error("could not read photo file: {0}")]
    File(#[from] std::io::Error),
    #[error("'{0}' is not an image file")]
    NotAnImage(String),
}

/// Platform hook that can open a live camera stream.
pub trait CameraDriver: Send {
    fn open(&self) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// An open stream. `release` must be idempotent; `CaptureSession` guarantees
/// it runs exactly once on every exit path.
pub trait CameraStream: Send {
    fn capture_frame(&mut self) -> Result<PhotoData, CaptureError>;
    fn release(&mut self);
}

/// Scoped ownership of one open camera stream.
#[derive(Default)]
pub struct CaptureSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl CaptureSession {
    /// Acquire the camera. Failure leaves the gallery path available.
    pub fn start(driver: &dyn CameraDriver) -> Result<Self, CaptureError> {
        let stream = driver.open()?;
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Grab one frame and release the stream. The stream is released even
    /// when the frame grab fails.
    pub fn capture(mut self) -> Result<PhotoData, CaptureError> {
        let mut stream = self
            .stream
            .take()
            .ok_or_else(|| CaptureError::CameraUnavailable("stream already released".to_string()))?;
        let frame = stream.capture_frame();
        stream.release();
        frame
    }

    /// Close the stream without capturing.
    pub fn cancel(mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Covers teardown and navigation-away; capture/cancel already took
        // the stream on the happy paths.
        if let Some(mut stream) = self.stream.take() {
            debug!("releasing camera stream on teardown");
            stream.release();
        }
    }
}

/// Gallery path: read a picked file, accepting image types only.
pub fn photo_from_file(path: &Path) -> Result<PhotoData, CaptureError> {
    let mime_type = mime_guess::from_path(path).first_or_octet_stream();
    if mime_type.type_() != mime::IMAGE {
        return Err(CaptureError::NotAnImage(path.display().to_string()));
    }

    let bytes = fs::read(path)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "visitor-photo.jpg".to_string());

    Ok(PhotoData {
        bytes,
        filename,
        mime_type: mime_type.essence_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    struct ScriptedCamera {
        fail_frame: bool,
        releases: Arc<AtomicU32>,
    }

    impl ScriptedCamera {
        fn new(fail_frame: bool) -> (Self, Arc<AtomicU32>) {
            let releases = Arc::new(AtomicU32::new(0));
            (
                Self {
                    fail_frame,
                    releases: releases.clone(),
                },
                releases,
            )
        }
    }

    impl CameraDriver for ScriptedCamera {
        fn open(&self) -> Result<Box<dyn CameraStream>, CaptureError> {
            Ok(Box::new(ScriptedStream {
                fail_frame: self.fail_frame,
                releases: self.releases.clone(),
            }))
        }
    }

    struct ScriptedStream {
        fail_frame: bool,
        releases: Arc<AtomicU32>,
    }

    impl CameraStream for ScriptedStream {
        fn capture_frame(&mut self) -> Result<PhotoData, CaptureError> {
            if self.fail_frame {
                return Err(CaptureError::Frame("sensor timeout".to_string()));
            }
            Ok(PhotoData {
                bytes: vec![1, 2, 3],
                filename: "frame.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
            })
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn capture_releases_the_stream_exactly_once() {
        let (camera, releases) = ScriptedCamera::new(false);
        let session = CaptureSession::start(&camera).expect("open camera");
        assert!(session.is_active());

        let photo = session.capture().expect("frame");
        assert_eq!(photo.filename, "frame.jpg");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_frame_still_releases_the_stream() {
        let (camera, releases) = ScriptedCamera::new(true);
        let session = CaptureSession::start(&camera).expect("open camera");

        let err = session.capture().expect_err("sensor timeout");
        assert!(matches!(err, CaptureError::Frame(_)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_and_drop_both_release() {
        let (camera, releases) = ScriptedCamera::new(false);
        CaptureSession::start(&camera).expect("open camera").cancel();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        {
            let _session = CaptureSession::start(&camera).expect("open camera");
        }
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn gallery_files_must_be_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        let mut file = fs::File::create(&path).expect("create file");
        file.write_all(b"hello").expect("write");

        let err = photo_from_file(&path).expect_err("not an image");
        assert!(matches!(err, CaptureError::NotAnImage(_)));
    }

    #[test]
    fn gallery_image_carries_its_name_and_mime_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("visitor.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).expect("write image");

        let photo = photo_from_file(&path).expect("read image");
        assert_eq!(photo.filename, "visitor.png");
        assert_eq!(photo.mime_type, "image/png");
        assert_eq!(photo.bytes.len(), 4);
    }
}
