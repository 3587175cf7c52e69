use super::types::{ModelLoader, SegmentationModel};
use crate::error::PipelineError;
use crate::frame::{ConfidenceMask, Frame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A finished segmentation request.
#[derive(Debug)]
pub struct SegmentationResult {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub mask: ConfidenceMask,
}

type Reply = Result<SegmentationResult, PipelineError>;

struct Job {
    sequence: u64,
    timestamp_ms: u64,
    frame: Arc<Frame>,
    cancelled: Arc<AtomicBool>,
    reply: Sender<Reply>,
}

impl Job {
    fn run(self, model: &mut dyn SegmentationModel) {
        let Job {
            sequence,
            timestamp_ms,
            frame,
            cancelled,
            reply,
        } = self;

        let outcome = if cancelled.load(Ordering::Acquire) {
            tracing::debug!("Skipping cancelled segmentation request {}", sequence);
            Err(PipelineError::Cancelled)
        } else {
            model
                .segment(&frame, timestamp_ms)
                .map(|mask| SegmentationResult {
                    sequence,
                    timestamp_ms,
                    mask,
                })
                .map_err(|e| PipelineError::Segmentation(format!("{e:#}")))
        };

        // Release the frame before replying so the requester owns it again
        drop(frame);
        let _ = reply.send(outcome);
    }
}

/// Handle to a segmentation request in flight, resolved exactly once.
pub struct PendingMask {
    sequence: u64,
    cancelled: Arc<AtomicBool>,
    reply: Receiver<Reply>,
}

impl PendingMask {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Ask the worker to skip this request; a late result must be discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Wait up to `timeout` for the result. `None` means still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Reply> {
        match self.reply.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(Err(PipelineError::CollaboratorUnavailable))
            }
        }
    }
}

struct Worker {
    jobs: Sender<Job>,
    thread: JoinHandle<()>,
}

impl Worker {
    fn is_alive(&self) -> bool {
        !self.thread.is_finished()
    }
}

enum HandleState {
    Unloaded,
    Loading {
        worker: Worker,
        ready: Receiver<anyhow::Result<(u32, u32)>>,
    },
    Ready(Worker),
}

/// Owns the segmentation model for one blur-mode session.
///
/// The model lives on its own thread and processes requests in FIFO order.
/// Loading is asynchronous: `initialize` returns immediately and
/// `poll_ready` reports when the model can take requests.
pub struct Segmenter {
    state: HandleState,
    next_sequence: u64,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            state: HandleState::Unloaded,
            next_sequence: 0,
        }
    }

    /// Start loading a model, replacing any previous one.
    pub fn initialize(&mut self, loader: ModelLoader) -> Result<(), PipelineError> {
        self.teardown();

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("segmenter".into())
            .spawn(move || {
                let mut model = match loader() {
                    Ok(model) => model,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                model.reset_state();
                let _ = ready_tx.send(Ok(model.input_size()));

                for job in jobs_rx {
                    job.run(model.as_mut());
                }
                tracing::debug!("Segmentation worker exiting");
            })
            .map_err(|e| PipelineError::CollaboratorInitFailure(e.to_string()))?;

        tracing::info!("Loading segmentation model in background");
        self.state = HandleState::Loading {
            worker: Worker {
                jobs: jobs_tx,
                thread,
            },
            ready: ready_rx,
        };
        Ok(())
    }

    /// Advance a pending load. Returns `Ok(true)` once requests are accepted.
    ///
    /// A failed load is reported once; the handle is then unloaded.
    pub fn poll_ready(&mut self) -> Result<bool, PipelineError> {
        let outcome = match &self.state {
            HandleState::Unloaded => return Ok(false),
            HandleState::Ready(_) => return Ok(self.is_ready()),
            HandleState::Loading { ready, .. } => match ready.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) => return Ok(false),
                Err(TryRecvError::Disconnected) => {
                    Err(anyhow::anyhow!("segmentation worker exited while loading"))
                }
            },
        };

        match (outcome, std::mem::replace(&mut self.state, HandleState::Unloaded)) {
            (Ok((width, height)), HandleState::Loading { worker, .. }) => {
                tracing::info!("Segmentation model ready ({}x{} input)", width, height);
                self.state = HandleState::Ready(worker);
                Ok(true)
            }
            (Err(e), _) => Err(PipelineError::CollaboratorInitFailure(format!("{e:#}"))),
            (Ok(_), _) => Ok(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&self.state, HandleState::Ready(worker) if worker.is_alive())
    }

    /// Drop the model. A request already running finishes on its own and
    /// its reply goes nowhere.
    pub fn teardown(&mut self) {
        if !matches!(self.state, HandleState::Unloaded) {
            tracing::info!("Tearing down segmentation model");
        }
        self.state = HandleState::Unloaded;
    }

    /// Queue `frame` for segmentation.
    ///
    /// Fails with `CollaboratorUnavailable` when no model is ready; callers
    /// treat that as a skipped frame.
    pub fn request(
        &mut self,
        frame: Arc<Frame>,
        timestamp_ms: u64,
    ) -> Result<PendingMask, PipelineError> {
        let worker = match &self.state {
            HandleState::Ready(worker) if worker.is_alive() => worker,
            _ => return Err(PipelineError::CollaboratorUnavailable),
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let cancelled = Arc::new(AtomicBool::new(false));
        let (reply_tx, reply_rx) = mpsc::channel();
        let job = Job {
            sequence,
            timestamp_ms,
            frame,
            cancelled: Arc::clone(&cancelled),
            reply: reply_tx,
        };

        worker
            .jobs
            .send(job)
            .map_err(|_| PipelineError::CollaboratorUnavailable)?;

        Ok(PendingMask {
            sequence,
            cancelled,
            reply: reply_rx,
        })
    }
}
