use std::sync::Arc;

use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use suncity_registration::registration::export::{export_csv, ExportError, ExportRange};
use suncity_registration::registration::visitor::SessionRegistry;

use crate::infra::{parse_date, AppState, InMemoryRegistrationGateway};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    pub(crate) date: Option<String>,
}

pub(crate) fn with_registration_routes(
    registry: Arc<SessionRegistry>,
    intake: Arc<InMemoryRegistrationGateway>,
) -> axum::Router {
    suncity_registration::registration::visitor::registration_router(registry)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/registration/export",
            axum::routing::get(export_endpoint),
        )
        .layer(Extension(intake))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Back-office CSV download of the day's confirmed registrations.
pub(crate) async fn export_endpoint(
    Extension(intake): Extension<Arc<InMemoryRegistrationGateway>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let range = match query.date.as_deref() {
        Some(raw) => match parse_date(raw) {
            Ok(date) => ExportRange::On(date),
            Err(message) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": message })),
                )
                    .into_response();
            }
        },
        None => ExportRange::Today,
    };

    let today = Local::now().date_naive();
    match export_csv(&intake.export_rows(), range, today) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            csv,
        )
            .into_response(),
        Err(err @ ExportError::NoVisitors) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::infra::DEMO_OTP;
    use suncity_registration::registration::visitor::{
        City, ConfirmationMode, DeclarationForm, DeliveryForm, DeliveryTimeline,
        InMemorySnapshotStore, PersonalForm, PhotoData, PhotoForm, ProjectInterestForm,
        ReferralChannel, ReferralForm, StepForm, UnitConfiguration, VisitorWizard,
    };

    fn assembled_router(intake: Arc<InMemoryRegistrationGateway>) -> axum::Router {
        let gateway = intake.clone();
        let registry = SessionRegistry::new(Box::new(move |_key: &str| {
            VisitorWizard::new(
                Box::new(gateway.clone()),
                Box::new(Arc::new(InMemorySnapshotStore::default())),
                Box::new(crate::infra::KioskIpLookup),
                ConfirmationMode::Otp,
            )
        }));
        with_registration_routes(Arc::new(registry), intake)
    }

    fn register_one_visitor(intake: &Arc<InMemoryRegistrationGateway>) {
        let mut wizard = VisitorWizard::new(
            Box::new(intake.clone()),
            Box::new(Arc::new(InMemorySnapshotStore::default())),
            Box::new(crate::infra::KioskIpLookup),
            ConfirmationMode::Otp,
        );
        wizard.apply(StepForm::Referral(ReferralForm {
            channel: ReferralChannel::Direct,
            direct_source: Some(
                suncity_registration::registration::visitor::DirectSource::Friend,
            ),
            ..ReferralForm::default()
        }));
        wizard.advance().expect("referral");
        wizard.apply(StepForm::Personal(PersonalForm {
            name: "Divya Nair".to_string(),
            email: "divya.nair@example.com".to_string(),
            phone: "8899776655".to_string(),
            aadhaar_last4: "9876".to_string(),
            city: Some(City::Gurugram),
            pincode: "122001".to_string(),
            budget: "2 Cr".to_string(),
            ..PersonalForm::default()
        }));
        wizard.advance().expect("personal");
        wizard.apply(StepForm::ProjectInterest(ProjectInterestForm {
            configuration: Some(UnitConfiguration::FourBhk),
        }));
        wizard.advance().expect("project interest");
        wizard.apply(StepForm::DeliveryTimeline(DeliveryForm {
            timeline: Some(DeliveryTimeline::WithinThreeMonths),
        }));
        wizard.advance().expect("delivery");
        wizard.apply(StepForm::Photo(PhotoForm {
            local: Some(PhotoData {
                bytes: vec![0xFF, 0xD8],
                filename: "divya.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
            }),
            uploaded_filename: None,
        }));
        wizard.advance().expect("photo");
        wizard.apply(StepForm::Declaration(DeclarationForm {
            accepted: true,
            notes: String::new(),
        }));
        wizard.finalize().expect("finalize");
        wizard.verify_otp(DEMO_OTP).expect("otp accepted");
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn assembled_router_serves_health_sessions_and_export() {
        let intake = Arc::new(InMemoryRegistrationGateway::default());
        let router = assembled_router(intake);

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health route");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/registration/sessions")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("session route");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = router
            .oneshot(
                Request::get("/api/v1/registration/export")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("export route");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_is_not_found_before_any_registration() {
        let intake = Arc::new(InMemoryRegistrationGateway::default());
        let response = export_endpoint(Extension(intake), Query(ExportQuery::default())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_rejects_unparseable_dates() {
        let intake = Arc::new(InMemoryRegistrationGateway::default());
        let response = export_endpoint(
            Extension(intake),
            Query(ExportQuery {
                date: Some("June 1st".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn export_returns_csv_for_confirmed_registrations() {
        let intake = Arc::new(InMemoryRegistrationGateway::default());
        register_one_visitor(&intake);
        assert_eq!(intake.confirmed_count(), 1);

        let response =
            export_endpoint(Extension(intake), Query(ExportQuery::default())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let csv = String::from_utf8(body.to_vec()).expect("utf-8 csv");
        assert!(csv.starts_with("Name,Email,Phone,Project,"));
        assert!(csv.contains("Divya Nair"));
        assert!(csv.contains("4 BHK"));
        assert!(csv.contains("Gurugram"));
    }
}
