//! Frame source boundary
//!
//! The monitoring session pulls frames one at a time through `FrameSource`.
//! Hardware capture (V4L2, AVFoundation, ...) lives behind this trait in a
//! platform crate; tests and offline replay use `FrameSequence`.

use crate::{CameraError, VideoFrame};

/// A source of video frames
///
/// `next_frame` may block up to the source's own capture timeout. Returning
/// `Ok(None)` signals end of stream and terminates the session loop cleanly;
/// `Err` is a recoverable read failure for that frame only.
pub trait FrameSource: Send {
    /// Pull the next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

/// In-memory frame source for tests and recorded-clip replay
pub struct FrameSequence {
    frames: std::vec::IntoIter<VideoFrame>,
}

impl FrameSequence {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_drains_then_ends() {
        let mut source = FrameSequence::new(vec![
            VideoFrame::filled(2, 2, [0, 0, 0]),
            VideoFrame::filled(2, 2, [1, 1, 1]),
        ]);

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }
}
