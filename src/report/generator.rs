//! Generator for the photographic installation report.
//!
//! One call to `generate` is one attempt: the ticket number is extracted
//! first, then the uploads are classified and checked against the
//! requirement table of the chosen checklist type. Missing photos block the
//! report unless the request is forced.

use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::sync::Arc;

use super::classifier::{classify, ClassificationReport};
use super::decode::{ImageDecoder, RasterDecoder};
use super::layout::{LayoutEngine, ReportContext};
use super::registry::{ChecklistType, SlotRegistry};
use super::render::PdfRenderer;
use super::traits::{Generator, Validator};
use super::validator::{
    check_requirements, extract_ticket_number, validate_ticket, RequirementCheck, ValidationErrors,
};
use super::{GeneratedReport, ReportError, UploadedFile};

/// Everything the technician submits for one report.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    /// Free-form ticket input, e.g. "Chamado 20250330762".
    pub ticket: String,
    /// Defaults to today's local date when absent.
    pub installation_date: Option<NaiveDate>,
    pub checklist_type: ChecklistType,
    /// Uploads in the order they were received.
    pub files: Vec<UploadedFile>,
    /// Generate even when mandatory photos are missing.
    pub force: bool,
}

impl ReportRequest {
    pub fn new(ticket: impl Into<String>, checklist_type: ChecklistType) -> Self {
        Self {
            ticket: ticket.into(),
            checklist_type,
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.installation_date = Some(date);
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

impl Validator for ReportRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_ticket(&self.ticket, "ticket", &mut errors);
        errors.into_result()
    }
}

/// Classification and requirement outcome, without rendering anything.
#[derive(Debug, Clone)]
pub struct ReportPreview {
    /// `None` when the ticket input carries no digits.
    pub ticket_number: Option<String>,
    pub checklist_type: ChecklistType,
    pub classification: ClassificationReport,
    pub requirements: RequirementCheck,
}

/// Builds report PDFs. Cheap to clone; the registry and decoder are shared.
#[derive(Clone)]
pub struct ReportGenerator {
    registry: Arc<SlotRegistry>,
    decoder: Arc<dyn ImageDecoder>,
    renderer: PdfRenderer,
}

impl ReportGenerator {
    pub fn new(registry: Arc<SlotRegistry>) -> Self {
        Self::with_decoder(registry, Arc::new(RasterDecoder))
    }

    pub fn with_decoder(registry: Arc<SlotRegistry>, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self {
            registry,
            decoder,
            renderer: PdfRenderer,
        }
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Map and validate only.
    pub fn preview(&self, request: ReportRequest) -> ReportPreview {
        let ticket_number = extract_ticket_number(&request.ticket).ok();
        let classification = classify(&self.registry, request.files);
        let requirements =
            check_requirements(&self.registry, &classification.mapping, request.checklist_type);

        ReportPreview {
            ticket_number,
            checklist_type: request.checklist_type,
            classification,
            requirements,
        }
    }
}

impl Generator<ReportRequest> for ReportGenerator {
    fn generate(&self, request: ReportRequest) -> Result<GeneratedReport, ReportError> {
        let ticket_number = extract_ticket_number(&request.ticket)?;
        let ReportRequest {
            installation_date,
            checklist_type,
            files,
            force,
            ..
        } = request;

        let mut classification = classify(&self.registry, files);
        let check = check_requirements(&self.registry, &classification.mapping, checklist_type);

        let mut warnings = Vec::new();
        if !check.satisfied {
            if !force {
                return Err(ReportError::MissingRequiredSlots(check.missing));
            }
            warn!(
                "Generating report {} with missing photos (forced): {}",
                ticket_number,
                check.missing.join(", ")
            );
            warnings = check.missing;
        }

        let context = ReportContext {
            ticket_number,
            installation_date: installation_date.unwrap_or_else(|| Local::now().date_naive()),
            checklist_type,
            mapping: std::mem::take(&mut classification.mapping),
            force,
        };

        let layout = LayoutEngine::new(&self.registry, self.decoder.as_ref()).layout(&context);
        let title = format!("Checklist CEF Wi-Fi - Chamado {}", context.ticket_number);
        let pdf = self.renderer.render(&layout, &title)?;

        info!(
            "Generated report {} ({}): {} photo(s), {} page(s), {} bytes",
            context.ticket_number,
            checklist_type,
            context.mapping.len(),
            layout.page_count(),
            pdf.len()
        );

        classification.mapping = context.mapping;
        Ok(GeneratedReport {
            filename: format!("{}.pdf", context.ticket_number),
            pdf,
            page_count: layout.page_count(),
            warnings,
            classification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::registry::Slot;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn generator() -> ReportGenerator {
        ReportGenerator::new(Arc::new(SlotRegistry::standard()))
    }

    fn scenario() -> ReportRequest {
        ReportRequest::new("Chamado 20250330762", ChecklistType::Improdutiva)
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 30).unwrap())
            .with_file(UploadedFile::new("rack.jpg", png(40, 30)))
            .with_file(UploadedFile::new("checklist_ok.jpg", png(30, 40)))
    }

    #[test]
    fn test_missing_photos_block_generation() {
        let missing = match generator().generate(scenario()) {
            Err(ReportError::MissingRequiredSlots(missing)) => missing,
            other => panic!("expected missing slots, got {:?}", other.map(|r| r.filename)),
        };
        for expected in [
            "local_ap",
            "area_autoatendimento",
            "equipamento",
            "mac_serial ou mac ou serial",
            "teste_velocidade",
            "rat",
        ] {
            assert!(missing.contains(&expected.to_string()), "{expected}");
        }
        assert!(!missing.contains(&"rack".to_string()));
        assert!(!missing.contains(&"checklist".to_string()));
    }

    #[test]
    fn test_forced_generation_produces_named_pdf() {
        let report = generator().generate(scenario().forced(true)).unwrap();

        assert_eq!(report.filename, "20250330762.pdf");
        assert!(report.pdf.starts_with(b"%PDF-"));
        assert_eq!(report.page_count, 6);
        assert_eq!(report.warnings.len(), 6);
        assert!(report.classification.mapping.contains(Slot::Rack));
        assert!(report.classification.mapping.contains(Slot::Checklist));
    }

    #[test]
    fn test_ticket_without_digits_fails_first() {
        let request = ReportRequest::new("sem chamado", ChecklistType::Produtiva).forced(true);
        assert!(request.validate().is_err());
        assert!(matches!(
            generator().generate(request),
            Err(ReportError::NoDigitsInTicket)
        ));
    }

    #[test]
    fn test_preview_reports_mapping_and_missing() {
        let preview = generator().preview(
            scenario().with_file(UploadedFile::new("notas.txt", b"x".to_vec())),
        );

        assert_eq!(preview.ticket_number.as_deref(), Some("20250330762"));
        assert_eq!(preview.classification.assigned.len(), 2);
        assert_eq!(preview.classification.unmapped, vec!["notas.txt".to_string()]);
        assert!(!preview.requirements.satisfied);
    }
}
