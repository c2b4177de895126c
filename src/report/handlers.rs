use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use log::{debug, error, info, warn};
use serde::Serialize;
use utoipa::ToSchema;

use super::classifier::{match_slot, SlotCollision};
use super::generator::{ReportGenerator, ReportPreview};
use super::multipart::MultipartParser;
use super::normalize::normalize_filename;
use super::registry::{ChecklistType, Slot};
use super::traits::{Generator, Validator};
use super::validator::RequirementCheck;
use super::ReportError;
use crate::ErrorResponse;

/// Shared state for the report routes.
#[derive(Clone)]
pub struct AppState {
    pub generator: ReportGenerator,
    pub max_upload_bytes: usize,
}

/// Report form (multipart).
#[derive(ToSchema)]
#[allow(unused)]
pub struct ReportForm {
    /// Ticket text; the first digit run becomes the report number
    pub ticket: String,
    /// YYYY-MM-DD, defaults to today
    pub installation_date: Option<String>,
    pub checklist_type: Option<ChecklistType>,
    /// `true`, `1` or `on` to generate with missing photos
    pub force: Option<String>,
    /// Photos, repeated; the filename decides the slot
    pub files: Vec<Vec<u8>>,
}

#[derive(Serialize, ToSchema)]
pub struct SlotKeywords {
    pub slot: Slot,
    pub keywords: Vec<String>,
    /// A filename that lands in this slot
    pub example: String,
}

#[derive(Serialize, ToSchema)]
pub struct SectionInfo {
    pub label: String,
    pub slots: Vec<Slot>,
}

#[derive(Serialize, ToSchema)]
pub struct RequirementInfo {
    pub label: String,
    pub slots: Vec<Slot>,
}

#[derive(Serialize, ToSchema)]
pub struct RequirementTable {
    pub checklist_type: ChecklistType,
    pub rules: Vec<RequirementInfo>,
}

#[derive(Serialize, ToSchema)]
pub struct RegistryResponse {
    pub version: u32,
    pub keywords: Vec<SlotKeywords>,
    pub sections: Vec<SectionInfo>,
    pub requirements: Vec<RequirementTable>,
}

#[derive(Serialize, ToSchema)]
pub struct AssignedFile {
    pub filename: String,
    pub slot: Slot,
    pub size_kb: f64,
}

#[derive(Serialize, ToSchema)]
pub struct PreviewResponse {
    pub ticket_number: Option<String>,
    pub checklist_type: ChecklistType,
    pub assigned: Vec<AssignedFile>,
    pub unmapped: Vec<String>,
    pub collisions: Vec<SlotCollision>,
    pub satisfied: bool,
    pub missing: Vec<String>,
    pub message: String,
}

impl From<ReportPreview> for PreviewResponse {
    fn from(preview: ReportPreview) -> Self {
        let message = preview.requirements.to_message(preview.checklist_type);
        let classification = preview.classification;
        Self {
            ticket_number: preview.ticket_number,
            checklist_type: preview.checklist_type,
            assigned: classification
                .assigned
                .into_iter()
                .map(|a| AssignedFile {
                    filename: a.filename,
                    slot: a.slot,
                    size_kb: size_in_kb(a.size_bytes),
                })
                .collect(),
            unmapped: classification.unmapped,
            collisions: classification.collisions,
            satisfied: preview.requirements.satisfied,
            missing: preview.requirements.missing,
            message,
        }
    }
}

/// First keyword of `slot` that classifies back into `slot`.
fn example_filename(generator: &ReportGenerator, slot: Slot) -> String {
    let registry = generator.registry();
    registry
        .keywords_for(slot)
        .iter()
        .map(|keyword| format!("{}_01.jpg", keyword))
        .find(|name| match_slot(registry, &normalize_filename(name)) == Some(slot))
        .unwrap_or_else(|| format!("{}_01.jpg", slot))
}

/// Size in KB rounded to one decimal.
fn size_in_kb(size_bytes: usize) -> f64 {
    (size_bytes as f64 / 1024.0 * 10.0).round() / 10.0
}

fn report_error_response(error: ReportError, checklist_type: ChecklistType) -> HttpResponse {
    match error {
        ReportError::NoDigitsInTicket
        | ReportError::InvalidChecklistType(_)
        | ReportError::InvalidDate(_) => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string()))
        }
        ReportError::MissingRequiredSlots(missing) => {
            let check = RequirementCheck {
                satisfied: false,
                missing,
            };
            let message = format!(
                "{}\n\n{}",
                check.to_message(checklist_type),
                check.to_validation_errors().to_message()
            );
            HttpResponse::UnprocessableEntity()
                .json(ErrorResponse::new("MissingRequiredPhotos", &message))
        }
        ReportError::ImageDecode(_) | ReportError::Render(_) | ReportError::InconsistentRegistry(_) => {
            error!("Report generation failed: {}", error);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string()))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    get,
    path = "/reports/registry",
    responses(
        (status = 200, description = "Slot vocabulary, sections and requirement tables", body = RegistryResponse)
    )
)]
pub async fn get_registry(data: web::Data<AppState>) -> impl Responder {
    let registry = data.generator.registry();

    let keywords = registry
        .keywords()
        .iter()
        .map(|(slot, keywords)| SlotKeywords {
            slot: *slot,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            example: example_filename(&data.generator, *slot),
        })
        .collect();

    let sections = registry
        .sections()
        .iter()
        .map(|section| SectionInfo {
            label: section.label.to_string(),
            slots: section.slots.to_vec(),
        })
        .collect();

    let requirements = ChecklistType::ALL
        .iter()
        .map(|checklist_type| RequirementTable {
            checklist_type: *checklist_type,
            rules: registry
                .requirements(*checklist_type)
                .iter()
                .map(|rule| RequirementInfo {
                    label: rule.label(),
                    slots: rule.slots().to_vec(),
                })
                .collect(),
        })
        .collect();

    HttpResponse::Ok().json(RegistryResponse {
        version: registry.version(),
        keywords,
        sections,
        requirements,
    })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    post,
    path = "/reports/preview",
    request_body(content = inline(ReportForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Slot mapping and missing photos", body = PreviewResponse),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse)
    )
)]
pub async fn preview_report(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing preview_report handler");
    let form = match MultipartParser::parse_report_multipart(payload, data.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => return HttpResponse::from(e),
    };
    let request = match form.into_request() {
        Ok(request) => request,
        Err(e) => return report_error_response(e, ChecklistType::default()),
    };

    debug!("Previewing {} upload(s)", request.files.len());
    let preview = data.generator.preview(request);
    HttpResponse::Ok().json(PreviewResponse::from(preview))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    post,
    path = "/reports",
    request_body(content = inline(ReportForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Report PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Invalid form or ticket without digits", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 422, description = "Mandatory photos missing and force not set", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn generate_report(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing generate_report handler");
    let form = match MultipartParser::parse_report_multipart(payload, data.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => return HttpResponse::from(e),
    };
    let request = match form.into_request() {
        Ok(request) => request,
        Err(e) => return report_error_response(e, ChecklistType::default()),
    };
    if let Err(errors) = request.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&errors.to_message()));
    }

    let checklist_type = request.checklist_type;
    let generator = data.generator.clone();
    let report = match web::block(move || generator.generate(request)).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => return report_error_response(e, checklist_type),
        Err(e) => {
            error!("Report generation task failed: {}", e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Report generation task failed"));
        }
    };

    let mut response = HttpResponse::Ok();
    response
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(report.filename.clone())],
        });
    if !report.warnings.is_empty() {
        warn!(
            "Report {} delivered without: {}",
            report.filename,
            report.warnings.join(", ")
        );
        response.insert_header(("X-Missing-Photos", report.warnings.join(", ")));
    }
    response.body(report.pdf)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/reports").route(web::post().to(generate_report)))
        .service(web::resource("/reports/registry").route(web::get().to(get_registry)))
        .service(web::resource("/reports/preview").route(web::post().to(preview_report)));
}
