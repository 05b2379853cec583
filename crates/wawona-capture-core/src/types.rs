use serde::{Deserialize, Serialize};

use crate::errors::CaptureError;

// MARK: - CaptureChannel

/// One of the two independent capture request channels.
///
/// Each channel has its own id-namespace: a capture id observed on one
/// channel says nothing about the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureChannel {
    /// Full-output capture (`zwlr_screencopy_manager_v1`).
    Screencopy,
    /// Per-surface capture (`ext_image_copy_capture_manager_v1`).
    ImageCopyCapture,
}

impl CaptureChannel {
    /// Channels in the order they are polled within one invocation.
    pub const POLL_ORDER: [Self; 2] = [Self::Screencopy, Self::ImageCopyCapture];
}

impl std::fmt::Display for CaptureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Screencopy => write!(f, "Screencopy"),
            Self::ImageCopyCapture => write!(f, "ImageCopyCapture"),
        }
    }
}

// MARK: - CaptureId

/// Native-side capture request id. Zero means "nothing pending".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(pub u64);

impl CaptureId {
    pub const NONE: Self = Self(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CaptureId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

// MARK: - PendingQuery

/// Raw answer to a "pending request?" query, exactly as the native side
/// returns it. Nothing here has been validated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingQuery {
    pub capture_id: u64,
    pub width: i32,
    pub height: i32,
    /// Requested destination stride in bytes; `<= 0` selects `width × 4`.
    pub stride: i32,
}

impl PendingQuery {
    /// The "nothing pending" answer.
    pub const IDLE: Self = Self { capture_id: 0, width: 0, height: 0, stride: 0 };

    pub fn new(capture_id: u64, width: i32, height: i32, stride: i32) -> Self {
        Self { capture_id, width, height, stride }
    }

    /// Attach the channel the query was issued on. `None` when nothing is pending.
    pub fn into_request(self, channel: CaptureChannel) -> Option<CaptureRequest> {
        let id = CaptureId(self.capture_id);
        if id.is_none() {
            return None;
        }
        Some(CaptureRequest {
            id,
            channel,
            width: self.width,
            height: self.height,
            requested_stride: self.stride,
        })
    }
}

// MARK: - CaptureRequest

/// A pending capture request observed on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub id: CaptureId,
    pub channel: CaptureChannel,
    pub width: i32,
    pub height: i32,
    pub requested_stride: i32,
}

impl CaptureRequest {
    /// Validate the request geometry and resolve the destination stride.
    ///
    /// `max_buffer_bytes` bounds both the readback buffer and the normalized
    /// output; a request exceeding it fails as an allocation error.
    pub fn validate(&self, max_buffer_bytes: u64) -> Result<Geometry, CaptureError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(CaptureError::InvalidGeometry {
                width: self.width,
                height: self.height,
            });
        }

        let width = self.width as u32;
        let height = self.height as u32;
        let src_stride = PixelFormat::Rgba8888.row_bytes(width);
        let dst_stride = if self.requested_stride > 0 {
            self.requested_stride as usize
        } else {
            src_stride
        };

        let largest_row = src_stride.max(dst_stride) as u64;
        let bytes = largest_row
            .checked_mul(height as u64)
            .ok_or(CaptureError::BufferTooLarge { bytes: u64::MAX, limit: max_buffer_bytes })?;
        if bytes > max_buffer_bytes {
            return Err(CaptureError::BufferTooLarge { bytes, limit: max_buffer_bytes });
        }

        Ok(Geometry { width, height, dst_stride })
    }
}

// MARK: - Geometry

/// Validated capture geometry: both dimensions are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// Stride the protocol consumer expects, in bytes.
    pub dst_stride: usize,
}

impl Geometry {
    /// Stride of a tightly packed readback buffer for this geometry.
    pub fn src_stride(&self) -> usize {
        PixelFormat::Rgba8888.row_bytes(self.width)
    }

    pub fn dst_len(&self) -> usize {
        self.dst_stride * self.height as usize
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{} stride={}", self.width, self.height, self.dst_stride)
    }
}

// MARK: - PixelFormat

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8888 => 4,
        }
    }

    pub fn row_bytes(self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }
}

// MARK: - CopyStatus

/// Completion status delivered by the pixel-copy primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    Success,
    Unknown,
    Timeout,
    SourceNoData,
    SourceInvalid,
    DestinationInvalid,
    /// Platform-defined code outside the standard set.
    Other(i32),
}

impl CopyStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::Timeout,
            3 => Self::SourceNoData,
            4 => Self::SourceInvalid,
            5 => Self::DestinationInvalid,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Unknown => 1,
            Self::Timeout => 2,
            Self::SourceNoData => 3,
            Self::SourceInvalid => 4,
            Self::DestinationInvalid => 5,
            Self::Other(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Unknown => write!(f, "unknown error"),
            Self::Timeout => write!(f, "timeout"),
            Self::SourceNoData => write!(f, "source has no data"),
            Self::SourceInvalid => write!(f, "source invalid"),
            Self::DestinationInvalid => write!(f, "destination invalid"),
            Self::Other(code) => write!(f, "status {code}"),
        }
    }
}
