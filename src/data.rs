//! Core data structures for image-sequence frames.

use crate::SequenceConfig;

/// Load status of a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// Request issued, no result yet
    Pending,
    /// Image decoded and drawable
    Loaded,
    /// Given up on; excluded from playback
    Failed,
}

/// One still image in the sequence.
///
/// `I` is the backend's image handle (`HtmlImageElement` on the web).
#[derive(Clone, Debug)]
pub struct Frame<I> {
    /// Source path the image is fetched from
    pub source: String,
    status: FrameStatus,
    image: Option<I>,
    natural_size: Option<(u32, u32)>,
}

impl<I> Frame<I> {
    /// Create a pending frame for the given source path.
    pub fn pending(source: String) -> Self {
        Self {
            source,
            status: FrameStatus::Pending,
            image: None,
            natural_size: None,
        }
    }

    #[inline]
    pub fn status(&self) -> FrameStatus {
        self.status
    }

    /// Check if this frame can be drawn.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.status == FrameStatus::Loaded
    }

    /// Check if the frame has a final status.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.status != FrameStatus::Pending
    }

    /// Natural (width, height) in pixels, known once loaded.
    #[inline]
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.natural_size
    }

    #[inline]
    pub fn image(&self) -> Option<&I> {
        self.image.as_ref()
    }
}

/// Ordered frames of one sequence.
///
/// Positions run `0..len()`; the file number of position `i` is
/// `first_frame_index + i`.
#[derive(Clone, Debug)]
pub struct FrameSet<I> {
    first_frame_index: u32,
    frames: Vec<Frame<I>>,
}

impl<I> FrameSet<I> {
    /// Create pending frames for every position the config describes.
    pub fn from_config(config: &SequenceConfig) -> Self {
        let frames = (0..config.frame_count)
            .map(|i| Frame::pending(config.frame_path(i)))
            .collect();
        Self {
            first_frame_index: config.first_frame_index,
            frames,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// File number of the frame at `index`.
    #[inline]
    pub fn source_number(&self, index: usize) -> u64 {
        u64::from(self.first_frame_index) + index as u64
    }

    pub fn get(&self, index: usize) -> Option<&Frame<I>> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame<I>> {
        self.frames.iter()
    }

    /// Number of frames with the given status.
    pub fn count(&self, status: FrameStatus) -> usize {
        self.frames.iter().filter(|f| f.status == status).count()
    }

    /// Store a decoded image.
    ///
    /// Returns the frame's new status, or `None` when the frame was already
    /// settled (duplicate completion) or the index is out of range. A zero
    /// natural dimension marks the frame failed since no aspect ratio exists.
    pub fn mark_loaded(&mut self, index: usize, image: I, width: u32, height: u32) -> Option<FrameStatus> {
        let frame = self.frames.get_mut(index)?;
        if frame.is_settled() {
            return None;
        }
        if width == 0 || height == 0 {
            frame.status = FrameStatus::Failed;
        } else {
            frame.status = FrameStatus::Loaded;
            frame.image = Some(image);
            frame.natural_size = Some((width, height));
        }
        Some(frame.status)
    }

    /// Give up on a frame. Returns false when it was already settled.
    pub fn mark_failed(&mut self, index: usize) -> bool {
        match self.frames.get_mut(index) {
            Some(frame) if !frame.is_settled() => {
                frame.status = FrameStatus::Failed;
                true
            }
            _ => false,
        }
    }

    /// Resolve the frame to draw for `index`.
    ///
    /// A loaded frame resolves to itself. A failed frame falls back to the
    /// nearest loaded frame before it. Pending frames resolve to nothing.
    pub fn drawable(&self, index: usize) -> Option<(usize, &Frame<I>)> {
        let frame = self.frames.get(index)?;
        match frame.status {
            FrameStatus::Loaded => Some((index, frame)),
            FrameStatus::Pending => None,
            FrameStatus::Failed => self.frames[..index]
                .iter()
                .enumerate()
                .rev()
                .find(|(_, f)| f.is_loaded()),
        }
    }
}
