use crate::error::DeviceError;

/// Handle to a live audio+video stream held from the capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    id: u64,
    video: bool,
    audio: bool,
}

impl StreamHandle {
    pub fn new(id: u64, video: bool, audio: bool) -> Self {
        Self { id, video, audio }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn video(&self) -> bool {
        self.video
    }

    pub fn audio(&self) -> bool {
        self.audio
    }
}

/// Capture device contract.
///
/// The device holds at most one live stream; a second `acquire` before
/// `release` fails with `DeviceError::Busy`.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request a live stream with the given tracks.
    async fn acquire(&self, video: bool, audio: bool) -> Result<StreamHandle, DeviceError>;

    /// Return a stream to the device. Safe to call with a stale handle or
    /// when nothing is held.
    async fn release(&self, handle: StreamHandle);
}
