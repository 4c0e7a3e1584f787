use crate::canvas::error::BackendError;
use crate::canvas::generate::GeneratedImage;
use crate::canvas::model::FrameGeometry;
use std::time::Duration;

/// Monotonic id of one submission. Results carrying a stale ticket are
/// dropped.
pub type Ticket = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success(GeneratedImage),
    Failure(BackendError),
}

/// Worker thread → session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMessage {
    pub ticket: Ticket,
    pub outcome: GenerationOutcome,
}

/// A response matched to the submission still awaited by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledGeneration {
    pub ticket: Ticket,
    pub prompt: String,
    /// Frame geometry at submission time, used for crop-recovery.
    pub frame: FrameGeometry,
    pub elapsed: Duration,
    pub outcome: GenerationOutcome,
}

/// What applying a settled generation did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Applied { ticket: Ticket, version_count: usize },
    Failed { ticket: Ticket, error: String },
}
