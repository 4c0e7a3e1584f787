use crate::canvas::error::ValidationError;
use crate::canvas::model::WorkingImage;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOrigin {
    Original,
    DroppedReplacement,
    Generated { prompt: String },
}

#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub image: WorkingImage,
    /// `data:` URL of the encoded image, usable for display or download.
    pub source_url: String,
    pub created_at: DateTime<Local>,
    pub origin: VersionOrigin,
}

impl VersionEntry {
    pub fn new(image: WorkingImage, source_url: String, origin: VersionOrigin) -> Self {
        Self {
            image,
            source_url,
            created_at: Local::now(),
            origin,
        }
    }

    pub fn prompt_text(&self) -> Option<&str> {
        match &self.origin {
            VersionOrigin::Generated { prompt } => Some(prompt),
            _ => None,
        }
    }

    pub fn is_original(&self) -> bool {
        self.origin == VersionOrigin::Original
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Working-image history, most recent first. Only a full reset removes
/// entries.
#[derive(Debug, Clone, Default)]
pub struct VersionStack {
    entries: Vec<VersionEntry>,
    active: usize,
}

impl VersionStack {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&VersionEntry> {
        self.entries.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.active)
    }

    pub fn active(&self) -> Option<&VersionEntry> {
        self.entries.get(self.active)
    }

    /// Insert at the front and make it active.
    pub fn push_front(&mut self, entry: VersionEntry) {
        self.entries.insert(0, entry);
        self.active = 0;
    }

    /// Replace the whole history with a single entry.
    pub fn reset_to(&mut self, entry: VersionEntry) {
        self.entries.clear();
        self.push_front(entry);
    }

    pub fn activate(&mut self, index: usize) -> Result<&VersionEntry, ValidationError> {
        if index >= self.entries.len() {
            return Err(ValidationError::NoSuchVersion(index));
        }
        self.active = index;
        Ok(&self.entries[index])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.active = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn entry(shade: u8, origin: VersionOrigin) -> VersionEntry {
        let image = WorkingImage::new(RgbaImage::from_pixel(1, 1, Rgba([shade, 0, 0, 255])));
        VersionEntry::new(image, data_url("image/png", &[shade]), origin)
    }

    #[test]
    fn newest_entry_is_first_and_active() {
        let mut stack = VersionStack::default();
        stack.reset_to(entry(1, VersionOrigin::Original));
        stack.push_front(entry(2, VersionOrigin::Generated { prompt: "sky".into() }));

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.active_index(), Some(0));
        assert_eq!(stack.active().and_then(|e| e.prompt_text()), Some("sky"));
        assert!(stack.get(1).unwrap().is_original());
    }

    #[test]
    fn activate_rejects_out_of_range() {
        let mut stack = VersionStack::default();
        assert_eq!(stack.active_index(), None);
        assert!(matches!(stack.activate(0), Err(ValidationError::NoSuchVersion(0))));

        stack.reset_to(entry(1, VersionOrigin::Original));
        stack.push_front(entry(2, VersionOrigin::DroppedReplacement));
        assert!(stack.activate(1).unwrap().is_original());
        assert_eq!(stack.active_index(), Some(1));
    }

    #[test]
    fn reset_to_discards_history() {
        let mut stack = VersionStack::default();
        stack.reset_to(entry(1, VersionOrigin::Original));
        stack.push_front(entry(2, VersionOrigin::DroppedReplacement));
        stack.reset_to(entry(3, VersionOrigin::Original));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active().unwrap().image.pixels().get_pixel(0, 0)[0], 3);
    }

    #[test]
    fn data_url_uses_base64_payload() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }
}
