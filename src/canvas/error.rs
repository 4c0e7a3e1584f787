use thiserror::Error;

/// Rejected locally before any I/O. Never mutates session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter a prompt before generating")]
    MissingPrompt,
    #[error("add a photo before generating")]
    MissingBaseImage,
    #[error("{0} is not a readable image")]
    NotAnImage(String),
    #[error("a generation is already in progress")]
    GenerationInFlight,
    #[error("no version at index {0}")]
    NoSuchVersion(usize),
}

/// Reported by (or about) the generation backend. The working image,
/// version stack and ink layer are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("response did not contain a usable image: {0}")]
    MalformedImage(String),
    #[error("could not reach the generation service: {0}")]
    Transport(String),
    #[error("invalid generation endpoint {0:?}")]
    InvalidEndpoint(String),
}

impl BackendError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A device or platform facility was unavailable at the point of use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("clipboard image write unsupported: {0}")]
    ClipboardUnsupported(String),
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

pub type CanvasResult<T> = Result<T, CanvasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_surface_server_message_verbatim() {
        let err = BackendError::Status {
            status: 502,
            message: "No image returned".into(),
        };
        assert_eq!(err.to_string(), "No image returned");
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn canvas_error_is_transparent_over_validation() {
        let err: CanvasError = ValidationError::MissingPrompt.into();
        assert_eq!(err.to_string(), "enter a prompt before generating");
    }
}
