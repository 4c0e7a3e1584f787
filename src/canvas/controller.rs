use crate::canvas::error::ValidationError;
use crate::canvas::generate::{GenerationBackend, GenerationRequest};
use crate::canvas::messages::{GenerationOutcome, SettledGeneration, Ticket, WorkerMessage};
use crate::canvas::model::FrameGeometry;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ELAPSED_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct PendingGeneration {
    ticket: Ticket,
    prompt: String,
    frame: FrameGeometry,
    started: Instant,
}

/// Runs at most one generation at a time on a worker thread and hands the
/// response back through a channel pumped by the session.
pub struct GenerationController {
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    next_ticket: Ticket,
    pending: Option<PendingGeneration>,
    elapsed: Duration,
    last_tick: Option<Instant>,
}

impl Default for GenerationController {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationController {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            next_ticket: 1,
            pending: None,
            elapsed: Duration::ZERO,
            last_tick: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Elapsed time as of the last tick.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn submit(
        &mut self,
        backend: Arc<dyn GenerationBackend>,
        request: GenerationRequest,
        frame: FrameGeometry,
    ) -> Result<Ticket, ValidationError> {
        if self.pending.is_some() {
            return Err(ValidationError::GenerationInFlight);
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let now = Instant::now();
        self.pending = Some(PendingGeneration {
            ticket,
            prompt: request.prompt().to_string(),
            frame,
            started: now,
        });
        self.elapsed = Duration::ZERO;
        self.last_tick = Some(now);

        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let outcome = match backend.generate(&request) {
                Ok(image) => GenerationOutcome::Success(image),
                Err(err) => GenerationOutcome::Failure(err),
            };
            let _ = tx.send(WorkerMessage { ticket, outcome });
        });
        tracing::debug!(ticket, "generation submitted");
        Ok(ticket)
    }

    /// Refresh the elapsed indicator when a tick interval has passed.
    /// Returns the new value when it changed.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let pending = self.pending.as_ref()?;
        let last = self.last_tick.unwrap_or(pending.started);
        if now.saturating_duration_since(last) < ELAPSED_TICK {
            return None;
        }
        self.last_tick = Some(now);
        self.elapsed = now.saturating_duration_since(pending.started);
        Some(self.elapsed)
    }

    /// Forget the in-flight request. Its response is dropped on arrival.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::info!(ticket = pending.ticket, "pending generation abandoned");
        }
        self.elapsed = Duration::ZERO;
        self.last_tick = None;
    }

    /// Drain worker messages without blocking.
    pub fn pump(&mut self) -> Option<SettledGeneration> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(settled) = self.settle(message) {
                        return Some(settled);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Block until the pending request settles or `timeout` runs out.
    pub fn wait(&mut self, timeout: Duration) -> Option<SettledGeneration> {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => {
                    if let Some(settled) = self.settle(message) {
                        return Some(settled);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    self.tick(Instant::now());
                    return None;
                }
            }
        }
        None
    }

    fn settle(&mut self, message: WorkerMessage) -> Option<SettledGeneration> {
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|p| p.ticket == message.ticket);
        if !matches {
            tracing::info!(ticket = message.ticket, "discarding stale generation response");
            return None;
        }
        let pending = self.pending.take()?;
        let elapsed = pending.started.elapsed();
        self.elapsed = elapsed;
        self.last_tick = None;
        Some(SettledGeneration {
            ticket: pending.ticket,
            prompt: pending.prompt,
            frame: pending.frame,
            elapsed,
            outcome: message.outcome,
        })
    }
}
