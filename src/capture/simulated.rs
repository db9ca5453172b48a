use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info};

use super::device::{CaptureDevice, StreamHandle};
use crate::error::DeviceError;

/// In-memory capture device.
///
/// Tracks the single held stream, can be switched into a permission-denied
/// mode, and can delay acquisition to mimic a camera that loads after the
/// session is already prepared.
pub struct SimulatedCaptureDevice {
    held: Mutex<Option<u64>>,
    denied: AtomicBool,
    latency: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

impl SimulatedCaptureDevice {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(None),
            denied: AtomicBool::new(false),
            latency: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Refuse all further acquisitions with `PermissionDenied`.
    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Delay every acquisition by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = Some(latency);
    }

    /// Whether a stream is currently held.
    pub fn is_held(&self) -> bool {
        self.held.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl Default for SimulatedCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for SimulatedCaptureDevice {
    async fn acquire(&self, video: bool, audio: bool) -> Result<StreamHandle, DeviceError> {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.denied.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied);
        }

        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.is_some() {
            return Err(DeviceError::Busy);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        *held = Some(id);
        info!(stream = id, video, audio, "capture stream acquired");
        Ok(StreamHandle::new(id, video, audio))
    }

    async fn release(&self, handle: StreamHandle) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        match *held {
            Some(id) if id == handle.id() => {
                *held = None;
                info!(stream = handle.id(), "capture stream released");
            }
            _ => debug!(stream = handle.id(), "release of stale stream ignored"),
        }
    }
}
