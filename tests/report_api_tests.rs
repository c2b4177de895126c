mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use cef_wifi_report_server::report::{self, ReportGenerator, SlotRegistry};
use cef_wifi_report_server::{build_app_state, AppState, ErrorResponse, ServerConfig};
use common::{multipart_body, multipart_content_type, png_bytes};
use std::sync::Arc;

#[cfg(test)]
mod report_api_tests {
    use super::*;

    fn app_state(max_upload_bytes: usize) -> web::Data<AppState> {
        web::Data::new(AppState {
            generator: ReportGenerator::new(Arc::new(SlotRegistry::standard())),
            max_upload_bytes,
        })
    }

    fn post_form(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((header::CONTENT_TYPE, multipart_content_type()))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_registry_lists_vocabulary() {
        let state = web::Data::new(build_app_state(&ServerConfig::default()).unwrap());
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").configure(report::config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/reports/registry")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["version"], 2);
        assert_eq!(body["keywords"].as_array().unwrap().len(), 15);
        assert_eq!(body["sections"].as_array().unwrap().len(), 14);
        assert_eq!(body["requirements"][1]["checklist_type"], "improdutiva");
        assert_eq!(body["keywords"][0]["example"], "rack_01.jpg");
    }

    #[actix_web::test]
    async fn test_missing_photos_without_force_is_unprocessable() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(1024 * 1024))
                .service(web::scope("/api").configure(report::config)),
        )
        .await;

        let body = multipart_body(
            &[("ticket", "Chamado 20250330762"), ("checklist_type", "improdutiva")],
            &[],
        );
        let resp = test::call_service(&app, post_form("/api/reports", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.error, "MissingRequiredPhotos");
        assert!(error.message.contains("rat"));
    }

    #[actix_web::test]
    async fn test_forced_generation_returns_pdf_attachment() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(8 * 1024 * 1024))
                .service(web::scope("/api").configure(report::config)),
        )
        .await;

        let body = multipart_body(
            &[
                ("ticket", "Chamado 20250330762"),
                ("installation_date", "2025-03-30"),
                ("checklist_type", "improdutiva"),
                ("force", "on"),
            ],
            &[
                ("files", "rack.png", png_bytes(120, 90)),
                ("files", "checklist_ok.png", png_bytes(90, 120)),
            ],
        );
        let resp = test::call_service(&app, post_form("/api/reports", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let headers = resp.headers().clone();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("20250330762.pdf"));
        assert!(headers.get("X-Missing-Photos").is_some());

        let pdf = test::read_body(resp).await;
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[actix_web::test]
    async fn test_preview_reports_mapping() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(1024 * 1024))
                .service(web::scope("/api").configure(report::config)),
        )
        .await;

        let body = multipart_body(
            &[("ticket", "INC 42")],
            &[
                ("files", "rack.jpg", vec![0u8; 2048]),
                ("photos", "notes.txt", b"hello".to_vec()),
            ],
        );
        let resp =
            test::call_service(&app, post_form("/api/reports/preview", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["ticket_number"], "42");
        assert_eq!(body["checklist_type"], "produtiva");
        assert_eq!(body["assigned"][0]["slot"], "rack");
        assert_eq!(body["assigned"][0]["size_kb"], 2.0);
        assert_eq!(body["unmapped"][0], "notes.txt");
        assert_eq!(body["satisfied"], false);
        assert_eq!(body["missing"].as_array().unwrap().len(), 11);
    }

    #[actix_web::test]
    async fn test_ticket_without_digits_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(1024 * 1024))
                .service(web::scope("/api").configure(report::config)),
        )
        .await;

        let body = multipart_body(&[("ticket", "sem numero"), ("force", "true")], &[]);
        let resp = test::call_service(&app, post_form("/api/reports", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = multipart_body(
            &[("ticket", "123"), ("checklist_type", "parcial")],
            &[],
        );
        let resp = test::call_service(&app, post_form("/api/reports", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_oversized_upload_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(app_state(64))
                .service(web::scope("/api").configure(report::config)),
        )
        .await;

        let body = multipart_body(&[("ticket", "123")], &[("files", "rack.jpg", vec![7u8; 4096])]);
        let resp = test::call_service(&app, post_form("/api/reports", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
