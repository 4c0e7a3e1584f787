//! Boundary to the external text-to-image service.

use crate::canvas::error::{BackendError, ValidationError};
use crate::canvas::ingest::SourceFile;
use image::RgbaImage;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const COMPOSITE_FILE_NAME: &str = "composite.png";

/// Bytes plus their MIME type and a file name for the multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl EncodedImage {
    pub fn png(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: "image/png".into(),
            bytes: bytes.into(),
        }
    }
}

impl From<&SourceFile> for EncodedImage {
    fn from(file: &SourceFile) -> Self {
        Self {
            file_name: if file.name.is_empty() {
                "ref.png".into()
            } else {
                file.name.clone()
            },
            mime: file.mime.clone(),
            bytes: Arc::clone(&file.bytes),
        }
    }
}

/// A validated submission: non-blank prompt and a non-empty primary image.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    prompt: String,
    image: EncodedImage,
    references: Vec<EncodedImage>,
}

impl GenerationRequest {
    pub fn new(
        prompt: &str,
        image: Option<EncodedImage>,
        references: Vec<EncodedImage>,
    ) -> Result<Self, ValidationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::MissingPrompt);
        }
        let image = image
            .filter(|image| !image.bytes.is_empty())
            .ok_or(ValidationError::MissingBaseImage)?;
        Ok(Self {
            prompt: prompt.to_string(),
            image,
            references,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> &EncodedImage {
        &self.image
    }

    pub fn references(&self) -> &[EncodedImage] {
        &self.references
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn decode(&self) -> Result<RgbaImage, BackendError> {
        image::load_from_memory(&self.bytes)
            .map(|img| img.to_rgba8())
            .map_err(|err| BackendError::MalformedImage(err.to_string()))
    }
}

/// One blocking call per submission. Implementations must be shareable with
/// the worker thread.
pub trait GenerationBackend: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Interpret a backend response. Success must carry image bytes; failures
/// surface the server's `error` (and `message`) text when present.
pub fn parse_response(
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<GeneratedImage, BackendError> {
    let content_type = content_type.map(|ct| ct.trim().to_ascii_lowercase());
    if !(200..300).contains(&status) {
        let parsed = serde_json::from_slice::<ErrorBody>(body).ok();
        let message = match parsed {
            Some(ErrorBody { error: Some(error), message: Some(detail) }) if !detail.is_empty() => {
                format!("{error}: {detail}")
            }
            Some(ErrorBody { error: Some(error), .. }) => error,
            _ => format!("HTTP {status}"),
        };
        return Err(BackendError::Status { status, message });
    }

    if content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with("text/"))
    {
        return Err(BackendError::MalformedImage(
            "response was not an image".into(),
        ));
    }
    if body.is_empty() {
        return Err(BackendError::MalformedImage("empty response body".into()));
    }
    let mime = content_type
        .and_then(|ct| ct.split(';').next().map(|s| s.trim().to_string()))
        .filter(|ct| ct.starts_with("image/"))
        .or_else(|| {
            image::guess_format(body)
                .ok()
                .map(|f| crate::canvas::ingest::mime_for_format(f).to_string())
        })
        .unwrap_or_else(|| "image/png".into());
    Ok(GeneratedImage {
        mime,
        bytes: body.to_vec(),
    })
}

/// Multipart POST backend: fields `prompt`, `image`, and repeated `refs`.
pub struct HttpBackend {
    client: Client,
    endpoint: Url,
}

impl HttpBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|_| BackendError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(BackendError::InvalidEndpoint(endpoint.to_string()));
        }
        let client = Client::builder()
            .user_agent(concat!("ideation-canvas/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn file_part(image: &EncodedImage) -> Part {
    let part = Part::bytes(image.bytes.to_vec()).file_name(image.file_name.clone());
    match part.mime_str(&image.mime) {
        Ok(part) => part,
        Err(_) => Part::bytes(image.bytes.to_vec()).file_name(image.file_name.clone()),
    }
}

impl GenerationBackend for HttpBackend {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
        let mut form = Form::new()
            .text("prompt", request.prompt().to_string())
            .part("image", file_part(request.image()));
        for reference in request.references() {
            form = form.part("refs", file_part(reference));
        }
        tracing::info!(
            endpoint = %self.endpoint,
            prompt_len = request.prompt().len(),
            image_bytes = request.image().bytes.len(),
            refs = request.references().len(),
            "submitting generation request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        tracing::debug!(status, ?content_type, bytes = body.len(), "generation response");
        parse_response(status, content_type.as_deref(), &body)
    }
}
