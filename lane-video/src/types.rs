//! Frame and region-of-interest types

/// Owned grayscale video frame, one byte per pixel.
///
/// A frame is exclusively owned by whichever pipeline stage currently holds
/// it; hand-off between stages moves the frame through a channel, never
/// shares it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonically increasing capture sequence number.
    pub seq: u64,
}

impl Frame {
    /// Create a zeroed frame.
    pub fn new(width: u32, height: u32, seq: u64) -> Self {
        Self {
            data: vec![0u8; (width as usize) * (height as usize)],
            width,
            height,
            seq,
        }
    }

    /// Read a pixel. Returns `None` outside the frame bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[(y * self.width + x) as usize])
    }

    /// Write a pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = value;
        }
    }
}

/// Axis-aligned region of interest in raw-frame coordinates.
///
/// Fixed at analyzer construction and never recomputed per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the region lies entirely inside a frame of the given size.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= frame_width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= frame_height)
    }

    /// Horizontal center of the region in raw-frame coordinates.
    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }
}
