use crate::services::session_service::ExamSession;
use crate::utils::time;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Environment signal forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityEvent {
    VisibilityHidden,
    VisibilityVisible,
    WindowBlur,
}

impl IntegrityEvent {
    pub fn is_violation(self) -> bool {
        matches!(self, IntegrityEvent::VisibilityHidden | IntegrityEvent::WindowBlur)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub kind: IntegrityEvent,
    pub count: u32,
    pub timestamp: String,
}

/// Receiver of violation reports.
pub trait ViolationSink {
    fn report_violation(&mut self) -> u32;
}

impl ViolationSink for ExamSession {
    fn report_violation(&mut self) -> u32 {
        ExamSession::report_violation(self)
    }
}

/// Capture device used for the proctoring preview. The feed is never analysed.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self) -> anyhow::Result<Box<dyn CameraStream>>;
}

pub trait CameraStream: Send {
    fn stop(&mut self);
}

/// Watches environment signals for one session and owns its camera handle.
#[derive(Default)]
pub struct IntegrityMonitor {
    records: Vec<ViolationRecord>,
    camera: Option<Box<dyn CameraStream>>,
    released: bool,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the event counted as a violation.
    pub fn observe<S: ViolationSink + ?Sized>(&mut self, event: IntegrityEvent, sink: &mut S) -> bool {
        if !event.is_violation() {
            return false;
        }
        let count = sink.report_violation();
        self.records.push(ViolationRecord {
            kind: event,
            count,
            timestamp: time::to_rfc3339(time::now()),
        });
        true
    }

    pub fn records(&self) -> &[ViolationRecord] {
        &self.records
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    /// Takes the outcome of a camera acquisition. Denial is logged, not fatal.
    pub fn attach_camera(&mut self, acquired: anyhow::Result<Box<dyn CameraStream>>) {
        match acquired {
            Ok(mut stream) if self.released => {
                tracing::debug!("Camera granted after session end, stopping it");
                stream.stop();
            }
            Ok(stream) => {
                tracing::info!("Proctoring camera attached");
                if let Some(mut previous) = self.camera.replace(stream) {
                    previous.stop();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Camera access denied or unavailable for proctoring");
            }
        }
    }

    pub async fn acquire_camera(&mut self, camera: &dyn Camera) {
        let acquired = camera.acquire().await;
        self.attach_camera(acquired);
    }

    pub fn release_camera(&mut self) {
        self.released = true;
        if let Some(mut stream) = self.camera.take() {
            stream.stop();
            tracing::info!("Proctoring camera released");
        }
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.release_camera();
    }
}
