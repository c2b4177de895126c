//! Report module - photographic installation reports for CEF Wi-Fi checklists.
//!
//! The pipeline runs leaves first:
//! - `registry` - slot vocabulary, keyword priorities, sections and requirement tables
//! - `normalize` / `classifier` - filename to slot assignment
//! - `validator` - mandatory slot checks and ticket number extraction
//! - `decode` - photo bytes to RGB rasters
//! - `layout` - paginated draw instructions
//! - `render` - PDF bytes from draw instructions
//! - `generator` - one generation attempt end to end
//! - `multipart` / `handlers` - HTTP surface

pub mod classifier;
pub mod decode;
pub mod generator;
pub mod handlers;
pub mod layout;
pub mod multipart;
pub mod normalize;
pub mod registry;
pub mod render;
pub mod traits;
pub mod validator;

pub use classifier::{classify, ClassificationReport, SlotAssignment, SlotCollision};
pub use generator::{ReportGenerator, ReportPreview, ReportRequest};
pub use handlers::{config, AppState};
pub use layout::{DrawInstruction, LayoutEngine, ReportContext, ReportLayout};
pub use registry::{ChecklistType, RequirementRule, SectionEntry, Slot, SlotRegistry};
pub use traits::{Generator, Validator};

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while preparing or generating a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("ticket input contains no digit sequence")]
    NoDigitsInTicket,
    #[error("missing required photos: {}", .0.join(", "))]
    MissingRequiredSlots(Vec<String>),
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
    #[error("failed to render PDF: {0}")]
    Render(String),
    #[error("unknown checklist type '{0}'")]
    InvalidChecklistType(String),
    #[error("invalid installation date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("inconsistent slot registry: {0}")]
    InconsistentRegistry(String),
}

/// A file as received from the upload source, already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Slot to file assignment for a single generation run.
///
/// A slot holds at most one file; the first file offered for a slot wins.
#[derive(Debug, Clone, Default)]
pub struct SlotMapping {
    files: BTreeMap<Slot, UploadedFile>,
}

impl SlotMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `file` under `slot` unless the slot is taken. On collision the
    /// rejected file is handed back together with the filename that holds the slot.
    pub fn insert_first(
        &mut self,
        slot: Slot,
        file: UploadedFile,
    ) -> Result<(), (UploadedFile, String)> {
        if let Some(existing) = self.files.get(&slot) {
            return Err((file, existing.filename.clone()));
        }
        self.files.insert(slot, file);
        Ok(())
    }

    pub fn get(&self, slot: Slot) -> Option<&UploadedFile> {
        self.files.get(&slot)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.files.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(Slot, UploadedFile)> for SlotMapping {
    fn from_iter<T: IntoIterator<Item = (Slot, UploadedFile)>>(iter: T) -> Self {
        let mut mapping = SlotMapping::new();
        for (slot, file) in iter {
            let _ = mapping.insert_first(slot, file);
        }
        mapping
    }
}

/// Result of a successful report generation.
#[derive(Debug)]
pub struct GeneratedReport {
    pub filename: String,
    pub pdf: Vec<u8>,
    pub page_count: usize,
    /// Requirements that were missing but overridden by the force flag.
    pub warnings: Vec<String>,
    pub classification: ClassificationReport,
}
