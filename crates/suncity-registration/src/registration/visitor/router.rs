//! Kiosk-facing HTTP surface over the wizard engine. Each kiosk client opens
//! a keyed session and drives it with step submissions; the engine itself is
//! synchronous, so every engine call runs on the blocking pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::domain::{PhotoData, PhotoForm, StepForm};
use super::engine::{
    AdvanceOutcome, FinalizeOutcome, FinalizeProgress, OtpError, VisitorWizard, WizardError,
    WizardPhase,
};

/// Builds the engine for a session key. The service decides what gateway and
/// snapshot store back it; keying the store on the session lets a restarted
/// service resume the same session from disk.
pub type WizardFactory = Box<dyn Fn(&str) -> VisitorWizard + Send + Sync>;

/// Keyed live sessions. Keys are service-local; the remote visitor id only
/// exists once a session's referral step commits.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, VisitorWizard>>,
    factory: WizardFactory,
    sequence: AtomicU64,
}

impl SessionRegistry {
    pub fn new(factory: WizardFactory) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            factory,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn create(&self) -> (String, SessionView) {
        let key = format!("reg-{:06}", self.sequence.fetch_add(1, Ordering::Relaxed));
        let wizard = (self.factory)(&key);
        let view = SessionView::of(&key, &wizard);
        self.lock().insert(key.clone(), wizard);
        info!(session = %key, "registration session opened");
        (key, view)
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Run one engine operation against a keyed session.
    fn with_session<R>(
        &self,
        key: &str,
        op: impl FnOnce(&mut VisitorWizard) -> R,
    ) -> Option<(R, SessionView)> {
        let mut sessions = self.lock();
        let wizard = sessions.get_mut(key)?;
        let result = op(wizard);
        Some((result, SessionView::of(key, wizard)))
    }

    fn view(&self, key: &str) -> Option<SessionView> {
        let sessions = self.lock();
        sessions.get(key).map(|wizard| SessionView::of(key, wizard))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VisitorWizard>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// What a kiosk client sees of its session after every call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_key: String,
    pub phase: WizardPhase,
    pub step: u8,
    pub step_label: &'static str,
    pub visitor_id: Option<i64>,
    pub can_retreat: bool,
    pub errors: std::collections::BTreeMap<String, String>,
    pub finalize_progress: FinalizeProgress,
}

impl SessionView {
    fn of(key: &str, wizard: &VisitorWizard) -> Self {
        let step = wizard.current_step();
        Self {
            session_key: key.to_string(),
            phase: wizard.phase(),
            step: step.ordinal(),
            step_label: step.label(),
            visitor_id: wizard.visitor_id().map(|id| id.0),
            can_retreat: step.prev().is_some() && wizard.phase() == WizardPhase::InProgress,
            errors: wizard.errors().clone(),
            finalize_progress: wizard.finalize_progress(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OtpRequest {
    otp: String,
}

pub fn registration_router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/api/v1/registration/sessions", post(create_session))
        .route("/api/v1/registration/sessions/:key", get(show_session))
        .route("/api/v1/registration/sessions/:key/forms", post(apply_form))
        .route("/api/v1/registration/sessions/:key/photo", post(attach_photo))
        .route("/api/v1/registration/sessions/:key/advance", post(advance))
        .route("/api/v1/registration/sessions/:key/retreat", post(retreat))
        .route("/api/v1/registration/sessions/:key/finalize", post(finalize))
        .route(
            "/api/v1/registration/sessions/:key/verify-otp",
            post(verify_otp),
        )
        .with_state(registry)
}

async fn create_session(State(registry): State<Arc<SessionRegistry>>) -> Response {
    let outcome = run_blocking(move || {
        let (_, view) = registry.create();
        view
    })
    .await;
    match outcome {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(response) => response,
    }
}

async fn show_session(
    State(registry): State<Arc<SessionRegistry>>,
    Path(key): Path<String>,
) -> Response {
    match registry.view(&key) {
        Some(view) => Json(view).into_response(),
        None => unknown_session(),
    }
}

async fn apply_form(
    State(registry): State<Arc<SessionRegistry>>,
    Path(key): Path<String>,
    Json(form): Json<StepForm>,
) -> Response {
    let outcome = run_blocking(move || registry.with_session(&key, |wizard| wizard.apply(form))).await;
    match outcome {
        Ok(Some(((), view))) => Json(view).into_response(),
        Ok(None) => unknown_session(),
        Err(response) => response,
    }
}

/// Raw image upload from the kiosk camera widget. The binary is held in the
/// session and only shipped to the backend when the photo step advances.
async fn attach_photo(
    State(registry): State<Arc<SessionRegistry>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    if !mime_type.starts_with("image/") {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({ "error": "photo uploads must be image content" })),
        )
            .into_response();
    }
    let filename = headers
        .get("x-filename")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("visitor-photo.jpg")
        .to_string();

    let form = PhotoForm {
        local: Some(PhotoData {
            bytes: body.to_vec(),
            filename,
            mime_type,
        }),
        uploaded_filename: None,
    };
    let outcome = run_blocking(move || {
        registry.with_session(&key, |wizard| wizard.apply(StepForm::Photo(form)))
    })
    .await;
    match outcome {
        Ok(Some(((), view))) => Json(view).into_response(),
        Ok(None) => unknown_session(),
        Err(response) => response,
    }
}

async fn advance(State(registry): State<Arc<SessionRegistry>>, Path(key): Path<String>) -> Response {
    let outcome = run_blocking(move || registry.with_session(&key, VisitorWizard::advance)).await;
    match outcome {
        Ok(Some((result, view))) => advance_response(result, view),
        Ok(None) => unknown_session(),
        Err(response) => response,
    }
}

async fn retreat(State(registry): State<Arc<SessionRegistry>>, Path(key): Path<String>) -> Response {
    let outcome = run_blocking(move || registry.with_session(&key, |wizard| wizard.retreat())).await;
    match outcome {
        Ok(Some(((), view))) => Json(view).into_response(),
        Ok(None) => unknown_session(),
        Err(response) => response,
    }
}

async fn finalize(State(registry): State<Arc<SessionRegistry>>, Path(key): Path<String>) -> Response {
    let outcome = run_blocking(move || registry.with_session(&key, VisitorWizard::finalize)).await;
    match outcome {
        Ok(Some((result, view))) => finalize_response(result, view),
        Ok(None) => unknown_session(),
        Err(response) => response,
    }
}

async fn verify_otp(
    State(registry): State<Arc<SessionRegistry>>,
    Path(key): Path<String>,
    Json(request): Json<OtpRequest>,
) -> Response {
    let outcome = run_blocking(move || {
        registry.with_session(&key, |wizard| wizard.verify_otp(&request.otp))
    })
    .await;
    match outcome {
        Ok(Some((result, view))) => otp_response(result, view),
        Ok(None) => unknown_session(),
        Err(response) => response,
    }
}

fn advance_response(result: Result<AdvanceOutcome, WizardError>, view: SessionView) -> Response {
    match result {
        Ok(AdvanceOutcome::Advanced(_)) => Json(view).into_response(),
        Ok(AdvanceOutcome::Invalid) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": view.errors, "session": view })),
        )
            .into_response(),
        Err(err) => wizard_error_response(err),
    }
}

fn finalize_response(result: Result<FinalizeOutcome, WizardError>, view: SessionView) -> Response {
    match result {
        Ok(FinalizeOutcome::AwaitingOtp | FinalizeOutcome::Completed) => {
            Json(view).into_response()
        }
        Ok(FinalizeOutcome::Invalid) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": view.errors, "session": view })),
        )
            .into_response(),
        Err(err) => wizard_error_response(err),
    }
}

fn otp_response(result: Result<(), OtpError>, view: SessionView) -> Response {
    match result {
        Ok(()) => Json(view).into_response(),
        Err(err @ (OtpError::Malformed | OtpError::Rejected(_))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(err @ OtpError::Transport(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(err @ OtpError::NotAwaitingConfirmation) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

fn wizard_error_response(err: WizardError) -> Response {
    match err {
        WizardError::Gateway(_) | WizardError::Finalize { .. } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "Something went wrong. Please try again." })),
        )
            .into_response(),
        WizardError::MissingVisitorId
        | WizardError::TerminalStep
        | WizardError::NotAtDeclaration
        | WizardError::AwaitingConfirmation => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

fn unknown_session() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "unknown registration session" })),
    )
        .into_response()
}

/// The engine blocks on network io, so it never runs on an async worker.
async fn run_blocking<R: Send + 'static>(op: impl FnOnce() -> R + Send + 'static) -> Result<R, Response> {
    tokio::task::spawn_blocking(op).await.map_err(|err| {
        tracing::error!(%err, "registration task failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal error" })),
        )
            .into_response()
    })
}
