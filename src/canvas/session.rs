//! The ideation session: sole owner of every piece of canvas state. All
//! mutation goes through `&mut self`, so events are applied one at a time.

use crate::canvas::camera::{CameraProvider, CameraSession};
use crate::canvas::color::{ColorParseError, Hsv, Rgb};
use crate::canvas::composite::encode_png;
use crate::canvas::controller::GenerationController;
use crate::canvas::crop::recover_crop;
use crate::canvas::error::{CanvasError, CanvasResult, ResourceError, ValidationError};
use crate::canvas::generate::{EncodedImage, GenerationBackend, GenerationRequest, COMPOSITE_FILE_NAME};
use crate::canvas::history::{data_url, VersionEntry, VersionOrigin, VersionStack};
use crate::canvas::ingest::{classify_drop, downscale_to, image_files, DropTarget, SourceFile};
use crate::canvas::input::{CursorShape, PointerDispatcher, PointerId};
use crate::canvas::layout::LayoutConfig;
use crate::canvas::messages::{GenerationEvent, GenerationOutcome, SettledGeneration, Ticket};
use crate::canvas::model::{DrawingStyle, Point, Tool, WorkingImage};
use crate::canvas::save::{
    export_image, resolve_output_dir, share_image, ImageClipboard, ShareOutcome,
    DESIGN_EXPORT_PREFIX, VERSION_EXPORT_PREFIX,
};
use crate::canvas::state::InteractionState;
use crate::canvas::surface::{available_viewport, SurfaceManager};
use anyhow::anyhow;
use chrono::{DateTime, Local};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub layout: LayoutConfig,
    pub max_base_dimension: u32,
    pub max_reference_dimension: u32,
    pub default_style: DrawingStyle,
    pub export_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            max_base_dimension: 2048,
            max_reference_dimension: 512,
            default_style: DrawingStyle::default(),
            export_dir: None,
        }
    }
}

pub struct IdeationSession {
    config: SessionConfig,
    surface: SurfaceManager,
    input: PointerDispatcher,
    style: DrawingStyle,
    hsv: Hsv,
    prompt: String,
    versions: VersionStack,
    backend: Arc<dyn GenerationBackend>,
    generation: GenerationController,
    camera: CameraSession,
    notice: Option<String>,
}

impl IdeationSession {
    pub fn new(config: SessionConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        let style = config.default_style;
        Self {
            surface: SurfaceManager::new(config.layout),
            input: PointerDispatcher::default(),
            hsv: style.color.to_hsv(),
            style,
            prompt: String::new(),
            versions: VersionStack::default(),
            backend,
            generation: GenerationController::new(),
            camera: CameraSession::default(),
            notice: None,
            config,
        }
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn versions(&self) -> &VersionStack {
        &self.versions
    }

    pub fn style(&self) -> &DrawingStyle {
        &self.style
    }

    pub fn hsv(&self) -> Hsv {
        self.hsv
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn interaction(&self) -> InteractionState {
        self.input.state()
    }

    pub fn cursor(&self) -> CursorShape {
        self.input.cursor()
    }

    pub fn camera(&self) -> &CameraSession {
        &self.camera
    }

    /// Last user-facing error, cleared by the next successful action.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_pending()
    }

    pub fn elapsed(&self) -> Duration {
        self.generation.elapsed()
    }

    // ---- ingestion ------------------------------------------------------

    /// Use `file` as the new original photo. History restarts from it.
    pub fn import_photo(&mut self, file: SourceFile) -> CanvasResult<()> {
        let image = file.decode_bounded(self.config.max_base_dimension)?;
        let url = data_url(&file.mime, &file.bytes);
        self.install_original(image, url);
        Ok(())
    }

    pub fn import_capture(&mut self, frame: RgbaImage) -> CanvasResult<()> {
        let image = downscale_to(frame, self.config.max_base_dimension);
        let url = data_url("image/png", &encode_png(&image)?);
        self.install_original(image, url);
        Ok(())
    }

    /// Restarts history, so a response still in flight belongs to a surface
    /// that no longer exists and is abandoned.
    fn install_original(&mut self, image: RgbaImage, url: String) {
        self.generation.cancel();
        let image = WorkingImage::new(image);
        tracing::info!(size = ?image.dimensions(), "original photo imported");
        self.versions
            .reset_to(VersionEntry::new(image.clone(), url, VersionOrigin::Original));
        self.show_image(image);
    }

    /// Append references in order. Files that are not decodable images are
    /// skipped. Returns how many were added.
    pub fn add_references(&mut self, files: Vec<SourceFile>) -> usize {
        let layout = *self.surface.layout();
        let mut added = 0;
        for file in image_files(files) {
            match file.decode_bounded(self.config.max_reference_dimension) {
                Ok(bitmap) => {
                    self.surface.references_mut().push(&layout, bitmap, file);
                    added += 1;
                }
                Err(err) => tracing::warn!(error = %err, "skipping reference"),
            }
        }
        if added > 0 {
            self.surface.render();
        }
        added
    }

    /// Whether a drag hovering at `display` would replace the base image.
    pub fn drag_over_base(&self, display: Point) -> bool {
        classify_drop(self.surface.frame(), display, self.surface.display_scale())
            == DropTarget::ReplaceBase
    }

    /// Route dropped files. Non-images are ignored; `None` when nothing was
    /// left to handle.
    pub fn drop_files(
        &mut self,
        files: Vec<SourceFile>,
        display: Point,
    ) -> CanvasResult<Option<DropTarget>> {
        let mut files = image_files(files);
        if files.is_empty() {
            return Ok(None);
        }
        let target = classify_drop(self.surface.frame(), display, self.surface.display_scale());
        tracing::debug!(?target, count = files.len(), "files dropped");
        match target {
            DropTarget::InitialBase => {
                let rest = files.split_off(1);
                self.import_photo(files.remove(0))?;
                self.add_references(rest);
            }
            DropTarget::ReplaceBase => {
                let rest = files.split_off(1);
                let first = files.remove(0);
                let image = WorkingImage::new(first.decode_bounded(self.config.max_base_dimension)?);
                let url = data_url(&first.mime, &first.bytes);
                self.versions.push_front(VersionEntry::new(
                    image.clone(),
                    url,
                    VersionOrigin::DroppedReplacement,
                ));
                self.show_image(image);
                self.add_references(rest);
            }
            DropTarget::References => {
                self.add_references(files);
            }
        }
        Ok(Some(target))
    }

    // ---- viewport -------------------------------------------------------

    /// Window size in display pixels; chrome insets are subtracted here.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        let (w, h) = available_viewport(width, height);
        self.surface.set_viewport(w, h);
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        self.surface.set_device_pixel_ratio(ratio);
    }

    // ---- pointer --------------------------------------------------------

    pub fn pointer_down(&mut self, pointer: PointerId, display: Point) -> bool {
        self.input
            .pointer_down(&mut self.surface, &self.style, pointer, display)
    }

    pub fn pointer_move(&mut self, pointer: PointerId, display: Point) -> bool {
        self.input
            .pointer_move(&mut self.surface, &self.style, pointer, display)
    }

    pub fn pointer_up(&mut self, pointer: PointerId, display: Point) -> bool {
        self.input.pointer_up(&mut self.surface, pointer, display)
    }

    // ---- style ----------------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.style.tool = tool;
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.style.color = color;
        self.hsv = color.to_hsv();
    }

    pub fn set_color_hex(&mut self, text: &str) -> Result<(), ColorParseError> {
        self.set_color(Rgb::from_hex(text)?);
        Ok(())
    }

    pub fn set_hsv(&mut self, hsv: Hsv) {
        let hsv = Hsv {
            h: hsv.h.rem_euclid(360.0),
            s: hsv.s.clamp(0.0, 100.0),
            v: hsv.v.clamp(0.0, 100.0),
        };
        self.hsv = hsv;
        self.style.color = Rgb::from_hsv(hsv);
    }

    pub fn set_opacity(&mut self, percent: u8) {
        self.style.set_opacity(percent);
    }

    pub fn set_stroke_width(&mut self, width: u32) {
        self.style.set_stroke_width(width);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn clear_sketch(&mut self) {
        self.surface.ink_mut().clear();
    }

    // ---- versions -------------------------------------------------------

    /// Make entry `index` the working image. Unsaved ink is discarded.
    pub fn activate_version(&mut self, index: usize) -> CanvasResult<()> {
        let image = self.versions.activate(index)?.image.clone();
        self.show_image(image);
        Ok(())
    }

    fn show_image(&mut self, image: WorkingImage) {
        self.input.reset();
        self.surface.set_highlight(Default::default());
        self.surface.set_base(image);
        self.surface.ink_mut().clear();
    }

    // ---- generation -----------------------------------------------------

    pub fn flatten(&self) -> Option<RgbaImage> {
        self.surface.flatten()
    }

    /// Validate, flatten and hand the request to the worker. Nothing is
    /// mutated when validation fails.
    pub fn submit_generation(&mut self) -> CanvasResult<Ticket> {
        if self.generation.is_pending() {
            return Err(ValidationError::GenerationInFlight.into());
        }
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingPrompt.into());
        }
        let (Some(frame), Some(flat)) = (self.surface.frame(), self.surface.flatten()) else {
            return Err(ValidationError::MissingBaseImage.into());
        };
        let composite = EncodedImage::png(COMPOSITE_FILE_NAME, encode_png(&flat)?);
        let references = self
            .surface
            .references()
            .files()
            .map(EncodedImage::from)
            .collect();
        let request = GenerationRequest::new(&self.prompt, Some(composite), references)?;
        let ticket = self
            .generation
            .submit(Arc::clone(&self.backend), request, frame)?;
        self.notice = None;
        Ok(ticket)
    }

    /// Advance the elapsed indicator and apply a response if one arrived.
    pub fn poll_generation(&mut self) -> Option<GenerationEvent> {
        self.generation.tick(Instant::now());
        let settled = self.generation.pump()?;
        Some(self.apply_generation(settled))
    }

    pub fn wait_for_generation(&mut self, timeout: Duration) -> Option<GenerationEvent> {
        let settled = self.generation.wait(timeout)?;
        Some(self.apply_generation(settled))
    }

    fn apply_generation(&mut self, settled: SettledGeneration) -> GenerationEvent {
        let ticket = settled.ticket;
        let generated = match settled.outcome {
            GenerationOutcome::Success(generated) => generated,
            GenerationOutcome::Failure(err) => return self.generation_failed(ticket, err.into()),
        };
        let returned = match generated.decode() {
            Ok(image) => image,
            Err(err) => return self.generation_failed(ticket, err.into()),
        };
        let cropped = recover_crop(&returned, settled.frame);
        let url = match encode_png(&cropped) {
            Ok(bytes) => data_url("image/png", &bytes),
            Err(err) => return self.generation_failed(ticket, err.into()),
        };

        let image = WorkingImage::new(cropped);
        self.versions.push_front(VersionEntry::new(
            image.clone(),
            url,
            VersionOrigin::Generated {
                prompt: settled.prompt,
            },
        ));
        self.show_image(image);
        tracing::info!(
            ticket,
            elapsed_ms = settled.elapsed.as_millis() as u64,
            versions = self.versions.len(),
            "generation applied"
        );
        GenerationEvent::Applied {
            ticket,
            version_count: self.versions.len(),
        }
    }

    fn generation_failed(&mut self, ticket: Ticket, err: CanvasError) -> GenerationEvent {
        tracing::warn!(ticket, error = %err, "generation failed");
        let error = err.to_string();
        self.notice = Some(error.clone());
        GenerationEvent::Failed { ticket, error }
    }

    // ---- export ---------------------------------------------------------

    fn output_dir(&self) -> PathBuf {
        resolve_output_dir(self.config.export_dir.as_deref())
    }

    /// Save the flattened canvas, border included.
    pub fn export_design(&self, now: DateTime<Local>) -> anyhow::Result<PathBuf> {
        let flat = self
            .flatten()
            .ok_or_else(|| anyhow!("nothing to export: no photo loaded"))?;
        export_image(&self.output_dir(), DESIGN_EXPORT_PREFIX, &flat, now)
    }

    pub fn export_version(&self, index: usize, now: DateTime<Local>) -> anyhow::Result<PathBuf> {
        let entry = self
            .versions
            .get(index)
            .ok_or(ValidationError::NoSuchVersion(index))?;
        export_image(&self.output_dir(), VERSION_EXPORT_PREFIX, entry.image.pixels(), now)
    }

    pub fn share_design(
        &self,
        clipboard: &mut dyn ImageClipboard,
        now: DateTime<Local>,
    ) -> anyhow::Result<ShareOutcome> {
        let flat = self
            .flatten()
            .ok_or_else(|| anyhow!("nothing to share: no photo loaded"))?;
        share_image(clipboard, &flat, &self.output_dir(), now)
    }

    // ---- camera ---------------------------------------------------------

    pub fn open_camera(&mut self, provider: &mut dyn CameraProvider) -> Result<(), ResourceError> {
        self.camera.open(provider)
    }

    pub fn switch_camera(&mut self, provider: &mut dyn CameraProvider) -> Result<(), ResourceError> {
        self.camera.switch_facing(provider)
    }

    pub fn close_camera(&mut self) {
        self.camera.close();
    }

    /// Capture a frame and import it as the original photo.
    pub fn capture_photo(&mut self) -> CanvasResult<()> {
        let frame = self.camera.capture()?;
        self.import_capture(frame)
    }

    // ---- reset ----------------------------------------------------------

    /// Start over: drop every image, reference, stroke and version, restore
    /// the default style and abandon any outstanding generation.
    pub fn reset(&mut self) {
        self.generation.cancel();
        self.camera.close();
        self.surface.reset();
        self.input.reset();
        self.versions.clear();
        self.style = self.config.default_style;
        self.hsv = self.style.color.to_hsv();
        self.prompt.clear();
        self.notice = None;
        tracing::info!("session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::error::BackendError;
    use crate::canvas::generate::GeneratedImage;
    use image::Rgba;

    struct Refuse;

    impl GenerationBackend for Refuse {
        fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, BackendError> {
            Err(BackendError::Status {
                status: 502,
                message: "No image returned".into(),
            })
        }
    }

    fn png_file(name: &str, w: u32, h: u32, shade: u8) -> SourceFile {
        let bytes = encode_png(&RgbaImage::from_pixel(w, h, Rgba([shade, shade, shade, 255]))).unwrap();
        SourceFile::new(name, "image/png", bytes)
    }

    fn session() -> IdeationSession {
        let config = SessionConfig {
            layout: LayoutConfig {
                border: 20,
                thumb_size: 16,
                margin: 2,
                gap: 2,
                top_row_capacity: 3,
                hit_tolerance: 1,
            },
            max_base_dimension: 64,
            max_reference_dimension: 8,
            ..SessionConfig::default()
        };
        IdeationSession::new(config, Arc::new(Refuse))
    }

    #[test]
    fn import_downscales_and_starts_history() {
        let mut s = session();
        s.import_photo(png_file("big.png", 128, 32, 10)).unwrap();
        assert_eq!(s.surface().base().unwrap().dimensions(), (64, 16));
        assert_eq!(s.versions().len(), 1);
        assert!(s.versions().active().unwrap().is_original());
        assert!(s.versions().active().unwrap().source_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn references_keep_original_bytes_and_downscale_bitmap() {
        let mut s = session();
        let file = png_file("ref.png", 32, 16, 1);
        assert_eq!(s.add_references(vec![file.clone()]), 1);
        let reference = s.surface().references().get(0).unwrap();
        assert_eq!(reference.bitmap.dimensions(), (8, 4));
        assert_eq!(reference.owner_file, file);
    }

    #[test]
    fn drop_routing_follows_pointer_region() {
        let mut s = session();
        let text = SourceFile::new("a.txt", "text/plain", b"x".to_vec());
        assert_eq!(s.drop_files(vec![text], Point::new(0.0, 0.0)).unwrap(), None);

        let target = s
            .drop_files(
                vec![png_file("base.png", 10, 10, 1), png_file("r.png", 4, 4, 2)],
                Point::new(0.0, 0.0),
            )
            .unwrap();
        assert_eq!(target, Some(DropTarget::InitialBase));
        assert_eq!(s.surface().references().len(), 1);

        // frame 50x50, base occupies 20..30
        assert!(s.drag_over_base(Point::new(25.0, 25.0)));
        let target = s
            .drop_files(vec![png_file("swap.png", 10, 10, 3)], Point::new(25.0, 25.0))
            .unwrap();
        assert_eq!(target, Some(DropTarget::ReplaceBase));
        assert_eq!(s.versions().len(), 2);
        assert_eq!(
            s.versions().active().unwrap().origin,
            VersionOrigin::DroppedReplacement
        );

        let target = s
            .drop_files(vec![png_file("r2.png", 4, 4, 4)], Point::new(2.0, 40.0))
            .unwrap();
        assert_eq!(target, Some(DropTarget::References));
        assert_eq!(s.surface().references().len(), 2);
        assert_eq!(s.versions().len(), 2);
    }

    #[test]
    fn colour_stays_in_sync_across_representations() {
        let mut s = session();
        s.set_hsv(Hsv { h: 240.0, s: 100.0, v: 100.0 });
        assert_eq!(s.style().color, Rgb::new(0, 0, 255));
        s.set_color_hex("#ff0000").unwrap();
        assert_eq!(s.hsv().h, 0.0);
        assert_eq!(s.hsv().s, 100.0);
        assert!(s.set_color_hex("nope").is_err());
        assert_eq!(s.style().color, Rgb::new(255, 0, 0));
    }

    #[test]
    fn validation_failures_do_not_submit() {
        let mut s = session();
        s.set_prompt("a cat");
        assert!(matches!(
            s.submit_generation(),
            Err(CanvasError::Validation(ValidationError::MissingBaseImage))
        ));
        s.import_photo(png_file("p.png", 4, 4, 1)).unwrap();
        s.set_prompt("   ");
        assert!(matches!(
            s.submit_generation(),
            Err(CanvasError::Validation(ValidationError::MissingPrompt))
        ));
        assert!(!s.is_generating());
    }

    #[test]
    fn backend_failure_is_reported_as_notice() {
        let mut s = session();
        s.import_photo(png_file("p.png", 4, 4, 1)).unwrap();
        s.set_prompt("a cat");
        s.submit_generation().unwrap();
        let event = s.wait_for_generation(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, GenerationEvent::Failed { .. }));
        assert_eq!(s.notice(), Some("No image returned"));
        assert_eq!(s.versions().len(), 1);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = session();
        s.import_photo(png_file("p.png", 4, 4, 1)).unwrap();
        s.set_stroke_width(12);
        s.set_opacity(40);
        s.set_color(Rgb::new(1, 2, 3));
        s.set_prompt("x");
        s.reset();

        assert!(s.surface().base().is_none());
        assert!(s.versions().is_empty());
        assert_eq!(*s.style(), DrawingStyle::default());
        assert_eq!(s.hsv(), Rgb::WHITE.to_hsv());
        assert_eq!(s.prompt(), "");
        assert_eq!(s.elapsed(), Duration::ZERO);
    }

    #[test]
    fn export_without_photo_is_an_error() {
        let s = session();
        assert!(s.export_design(Local::now()).is_err());
        assert!(s.export_version(0, Local::now()).is_err());
    }
}
