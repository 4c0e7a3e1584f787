pub mod camera;
pub mod color;
pub mod composite;
pub mod controller;
pub mod crop;
pub mod error;
pub mod generate;
pub mod history;
pub mod ingest;
pub mod ink;
pub mod input;
pub mod layout;
pub mod messages;
pub mod model;
pub mod render;
pub mod save;
pub mod session;
pub mod state;
pub mod surface;

pub use error::{BackendError, CanvasError, CanvasResult, ResourceError, ValidationError};
pub use generate::{GenerationBackend, HttpBackend};
pub use session::{IdeationSession, SessionConfig};
