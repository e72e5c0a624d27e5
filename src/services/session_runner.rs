use crate::error::{Error, Result};
use crate::models::submission::Submission;
use crate::services::integrity_service::{
    Camera, CameraStream, IntegrityEvent, IntegrityMonitor, ViolationRecord,
};
use crate::services::session_service::{ExamSession, SessionPhase, SessionView, SubmissionTrigger};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 32;

type CameraTask = JoinHandle<anyhow::Result<Box<dyn CameraStream>>>;

pub enum SessionCommand {
    SelectAnswer {
        question_id: String,
        option_index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    GoTo {
        position: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    Submit {
        reply: oneshot::Sender<Result<Option<Submission>>>,
    },
    View {
        reply: oneshot::Sender<SessionView>,
    },
}

/// Final state handed back when the runner stops.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub phase: SessionPhase,
    pub trigger: Option<SubmissionTrigger>,
    pub submission: Option<Submission>,
    pub violations: u32,
    pub violation_log: Vec<ViolationRecord>,
}

/// Drives one `ExamSession` on its own task.
///
/// The timer, host commands, integrity events and the camera request all
/// feed the same loop, so they never interleave mid-operation.
pub struct SessionRunner {
    session: ExamSession,
    monitor: IntegrityMonitor,
    integrity: Option<mpsc::Receiver<IntegrityEvent>>,
    camera: Option<Arc<dyn Camera>>,
    tick: Duration,
}

impl SessionRunner {
    pub fn new(session: ExamSession) -> Self {
        Self {
            session,
            monitor: IntegrityMonitor::new(),
            integrity: None,
            camera: None,
            tick: Duration::from_secs(1),
        }
    }

    pub fn with_integrity_events(mut self, events: mpsc::Receiver<IntegrityEvent>) -> Self {
        self.integrity = Some(events);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Clock period. Each tick takes one second off the remaining time.
    pub fn tick_every(mut self, period: Duration) -> Self {
        self.tick = period.max(Duration::from_millis(1));
        self
    }

    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (report_tx, report_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(rx, cancel.clone(), report_tx));
        SessionHandle {
            commands: tx,
            cancel,
            report: report_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        cancel: CancellationToken,
        report_tx: oneshot::Sender<SessionReport>,
    ) -> SessionReport {
        // Never awaited directly: a permission prompt may never resolve.
        let mut camera_task: Option<CameraTask> = self
            .camera
            .take()
            .map(|camera| tokio::spawn(async move { camera.acquire().await }));
        let mut integrity = self.integrity.take();
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.shut_down();
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.session.tick() {
                        tracing::error!(error = %e, "Submission on timer expiry failed");
                    }
                }
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => {
                        tracing::debug!("Session handle dropped, tearing down");
                        self.shut_down();
                        break;
                    }
                },
                event = next_event(&mut integrity) => match event {
                    Some(event) => {
                        self.monitor.observe(event, &mut self.session);
                    }
                    None => {
                        tracing::debug!("Integrity event source closed");
                        integrity = None;
                    }
                },
                acquired = camera_ready(&mut camera_task) => {
                    camera_task = None;
                    self.monitor.attach_camera(acquired);
                }
            }

            if self.session.is_submitted() {
                break;
            }
        }

        if let Some(task) = camera_task.take() {
            task.abort();
        }
        self.monitor.release_camera();

        let report = SessionReport {
            phase: self.session.phase().clone(),
            trigger: self.session.trigger(),
            submission: self.session.submission().cloned(),
            violations: self.session.violations(),
            violation_log: self.monitor.records().to_vec(),
        };
        let _ = report_tx.send(report.clone());

        if self.session.is_submitted() {
            self.serve_closed(&mut commands, &cancel).await;
        }
        report
    }

    /// Keeps answering the host after submission until the handle goes
    /// away. The closed session turns every command into a no-op.
    async fn serve_closed(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
        cancel: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
    }

    fn shut_down(&mut self) {
        if let Err(e) = self.session.teardown() {
            tracing::error!(error = %e, "Submission on teardown failed");
        }
    }

    fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SelectAnswer {
                question_id,
                option_index,
                reply,
            } => {
                let _ = reply.send(self.session.select_answer(&question_id, option_index));
            }
            SessionCommand::GoTo { position, reply } => {
                let _ = reply.send(self.session.go_to(position));
            }
            SessionCommand::Submit { reply } => {
                let _ = reply.send(self.session.submit());
            }
            SessionCommand::View { reply } => {
                let _ = reply.send(self.session.view());
            }
        }
    }
}

async fn next_event(rx: &mut Option<mpsc::Receiver<IntegrityEvent>>) -> Option<IntegrityEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn camera_ready(task: &mut Option<CameraTask>) -> anyhow::Result<Box<dyn CameraStream>> {
    match task {
        Some(handle) => match handle.await {
            Ok(acquired) => acquired,
            Err(e) => Err(anyhow::anyhow!("camera task failed: {}", e)),
        },
        None => std::future::pending().await,
    }
}

/// Host-side handle to a running session.
///
/// Dropping the handle tears the session down the same way `teardown` does.
/// Commands sent after submission still get answers (`submit` yields
/// `Ok(None)`, `view` shows the submitted phase).
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
    report: oneshot::Receiver<SessionReport>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| Error::Internal("Session has ended".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("Session has ended".to_string()))
    }

    pub async fn select_answer(&self, question_id: impl Into<String>, option_index: usize) -> Result<()> {
        let question_id = question_id.into();
        self.request(|reply| SessionCommand::SelectAnswer {
            question_id,
            option_index,
            reply,
        })
        .await?
    }

    pub async fn go_to(&self, position: usize) -> Result<()> {
        self.request(|reply| SessionCommand::GoTo { position, reply })
            .await?
    }

    pub async fn submit(&self) -> Result<Option<Submission>> {
        self.request(|reply| SessionCommand::Submit { reply }).await?
    }

    pub async fn view(&self) -> Result<SessionView> {
        self.request(|reply| SessionCommand::View { reply }).await
    }

    /// Token that tears the session down when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the session to end on its own (submission or cancellation).
    pub async fn finished(self) -> Result<SessionReport> {
        let SessionHandle {
            commands, report, ..
        } = self;
        let report = report
            .await
            .map_err(|_| Error::Internal("Session task failed".to_string()));
        drop(commands);
        report
    }

    /// Leaves the exam view: stops the timer, releases the camera and
    /// submits if nothing was submitted yet.
    pub async fn teardown(self) -> Result<SessionReport> {
        let SessionHandle {
            commands,
            cancel,
            task,
            ..
        } = self;
        cancel.cancel();
        drop(commands);
        task.await
            .map_err(|e| Error::Internal(format!("Session task failed: {}", e)))
    }
}
