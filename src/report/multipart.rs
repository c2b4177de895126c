use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use chrono::NaiveDate;
use futures_util::StreamExt;
use log::{debug, error};
use sanitize_filename::sanitize;

use super::generator::ReportRequest;
use super::registry::ChecklistType;
use super::{ReportError, UploadedFile};
use crate::ErrorResponse;

/// Raw report form as received, before any value is interpreted.
#[derive(Debug, Default)]
pub struct ParsedReportForm {
    pub ticket: Option<String>,
    pub installation_date: Option<String>,
    pub checklist_type: Option<String>,
    pub force: Option<String>,
    pub files: Vec<UploadedFile>,
}

impl ParsedReportForm {
    /// Interpret the text fields. Absent optional fields fall back to their
    /// defaults; a missing ticket becomes an empty ticket and fails later on
    /// digit extraction.
    pub fn into_request(self) -> Result<ReportRequest, ReportError> {
        let installation_date = match non_empty(self.installation_date) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| ReportError::InvalidDate(raw))?,
            ),
            None => None,
        };

        let checklist_type = match non_empty(self.checklist_type) {
            Some(raw) => raw.parse::<ChecklistType>()?,
            None => ChecklistType::default(),
        };

        Ok(ReportRequest {
            ticket: self.ticket.unwrap_or_default(),
            installation_date,
            checklist_type,
            files: self.files,
            force: self.force.as_deref().map(parse_flag).unwrap_or(false),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checkbox style flag: `true`, `1` and `on` are set, anything else is not.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "on")
}

fn is_file_field(name: &str) -> bool {
    name.starts_with("file") || name == "photos"
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("Upload exceeds the limit of {0} bytes")]
    PayloadTooLarge(usize),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::FieldError(_) | MultipartParseError::Utf8Error(_) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(&format!("{}", error)))
            }
            MultipartParseError::PayloadTooLarge(_) => HttpResponse::PayloadTooLarge().json(
                ErrorResponse::new("PayloadTooLarge", &format!("{}", error)),
            ),
            MultipartParseError::IoError(_) => {
                error!("Failed to read multipart payload: {}", error);
                HttpResponse::InternalServerError()
                    .json(ErrorResponse::internal_error(&format!("{}", error)))
            }
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    /// Read the whole report form. `max_bytes` caps the sum of all parts.
    pub async fn parse_report_multipart(
        mut multipart: Multipart,
        max_bytes: usize,
    ) -> Result<ParsedReportForm, MultipartParseError> {
        let mut form = ParsedReportForm::default();
        let mut remaining = max_bytes;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field.content_disposition().ok_or_else(|| {
                MultipartParseError::FieldError("Content disposition not found".to_string())
            })?;
            let name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
                .to_string();
            let maybe_filename = content_disposition.get_filename().map(|s| s.to_string());

            if is_file_field(&name) {
                let content = read_field(&mut field, &mut remaining, max_bytes).await?;
                let filename = match maybe_filename.filter(|f| !f.is_empty()) {
                    Some(fname) => sanitize(&fname),
                    // browsers send an empty part when no file was picked
                    None if content.is_empty() => continue,
                    None => format!("file_{}.dat", form.files.len()),
                };
                debug!("Received upload '{}' ({} bytes)", filename, content.len());
                form.files.push(UploadedFile::new(filename, content));
                continue;
            }

            let target = match name.as_str() {
                "ticket" => &mut form.ticket,
                "installation_date" => &mut form.installation_date,
                "checklist_type" => &mut form.checklist_type,
                "force" => &mut form.force,
                _ => {
                    debug!("Ignoring unknown form field '{}'", name);
                    continue;
                }
            };
            let bytes = read_field(&mut field, &mut remaining, max_bytes).await?;
            let value =
                String::from_utf8(bytes).map_err(|e| MultipartParseError::Utf8Error(e.to_string()))?;
            *target = Some(value);
        }

        Ok(form)
    }
}

async fn read_field(
    field: &mut Field,
    remaining: &mut usize,
    max_bytes: usize,
) -> Result<Vec<u8>, MultipartParseError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let data_chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        *remaining = remaining
            .checked_sub(data_chunk.len())
            .ok_or(MultipartParseError::PayloadTooLarge(max_bytes))?;
        buffer.extend_from_slice(&data_chunk);
    }
    Ok(buffer)
}
