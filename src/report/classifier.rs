//! Filename based slot classification.
//!
//! Unmapped files and slot collisions are not errors: a technician may upload
//! extra reference material, and the first file for a slot always wins. Both
//! cases are reported back so callers can show diagnostics.

use log::debug;
use serde::Serialize;
use utoipa::ToSchema;

use super::normalize::normalize_filename;
use super::registry::{Slot, SlotRegistry};
use super::{SlotMapping, UploadedFile};

/// A file that was placed into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SlotAssignment {
    pub filename: String,
    pub slot: Slot,
    pub size_bytes: usize,
}

/// A file that matched a slot already held by an earlier upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SlotCollision {
    pub filename: String,
    pub slot: Slot,
    pub kept_filename: String,
}

/// Outcome of classifying one upload batch.
#[derive(Debug, Clone, Default)]
pub struct ClassificationReport {
    pub mapping: SlotMapping,
    pub assigned: Vec<SlotAssignment>,
    pub unmapped: Vec<String>,
    pub collisions: Vec<SlotCollision>,
}

/// First slot, in registry priority order, with a keyword contained in the
/// normalized filename.
pub fn match_slot(registry: &SlotRegistry, normalized: &str) -> Option<Slot> {
    registry
        .keywords()
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| normalized.contains(keyword)))
        .map(|(slot, _)| *slot)
}

/// Assign every uploaded file, in upload order, to at most one slot.
pub fn classify<I>(registry: &SlotRegistry, files: I) -> ClassificationReport
where
    I: IntoIterator<Item = UploadedFile>,
{
    let mut report = ClassificationReport::default();

    for file in files {
        let normalized = normalize_filename(&file.filename);
        let Some(slot) = match_slot(registry, &normalized) else {
            debug!("File '{}' matched no slot", file.filename);
            report.unmapped.push(file.filename);
            continue;
        };

        let filename = file.filename.clone();
        let size_bytes = file.size_bytes();
        match report.mapping.insert_first(slot, file) {
            Ok(()) => {
                debug!("File '{}' assigned to slot '{}'", filename, slot);
                report.assigned.push(SlotAssignment {
                    filename,
                    slot,
                    size_bytes,
                });
            }
            Err((rejected, kept_filename)) => {
                debug!(
                    "File '{}' ignored: slot '{}' already holds '{}'",
                    rejected.filename, slot, kept_filename
                );
                report.collisions.push(SlotCollision {
                    filename: rejected.filename,
                    slot,
                    kept_filename,
                });
            }
        }
    }

    report
}
