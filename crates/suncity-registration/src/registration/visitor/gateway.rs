//! Boundary to the remote Suncity registration API. One method per remote
//! operation so the engine can be exercised against in-memory fakes.

use serde::{Deserialize, Serialize};

use super::domain::{
    DeliveryForm, PersonalForm, PhotoData, ProjectInterestForm, ReferralChannel, ReferralForm,
    VisitorId,
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("registration backend returned status {status}")]
    Status { status: u16 },
    #[error("registration backend unreachable: {0}")]
    Transport(String),
    #[error("unexpected response from registration backend: {0}")]
    Response(String),
}

/// Server-side handle for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub filename: String,
}

/// Outcome of an OTP check that reached the backend. A rejection is a normal
/// business answer, not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpVerification {
    Accepted,
    Rejected { message: Option<String> },
}

pub trait RegistrationGateway: Send + Sync {
    /// Step 1. The only call that mints a visitor id.
    fn submit_referral(&self, form: &ReferralForm) -> Result<VisitorId, GatewayError>;
    fn submit_personal(&self, id: VisitorId, form: &PersonalForm) -> Result<(), GatewayError>;
    fn submit_project_interest(
        &self,
        id: VisitorId,
        form: &ProjectInterestForm,
    ) -> Result<(), GatewayError>;
    fn submit_delivery_timeline(
        &self,
        id: VisitorId,
        form: &DeliveryForm,
    ) -> Result<(), GatewayError>;
    /// Multipart document upload; success hands ownership of the photo to the
    /// server and returns the filename it is stored under.
    fn upload_photo(&self, id: VisitorId, photo: &PhotoData) -> Result<StoredDocument, GatewayError>;
    fn submit_declaration(
        &self,
        id: VisitorId,
        accepted: bool,
        notes: Option<&str>,
    ) -> Result<(), GatewayError>;
    fn submit_for_review(&self, id: VisitorId, client_ip: &str) -> Result<(), GatewayError>;
    fn dispatch_otp(&self, id: VisitorId) -> Result<(), GatewayError>;
    fn verify_otp(&self, id: VisitorId, code: &str) -> Result<OtpVerification, GatewayError>;
}

impl<T: RegistrationGateway + ?Sized> RegistrationGateway for std::sync::Arc<T> {
    fn submit_referral(&self, form: &ReferralForm) -> Result<VisitorId, GatewayError> {
        self.as_ref().submit_referral(form)
    }

    fn submit_personal(&self, id: VisitorId, form: &PersonalForm) -> Result<(), GatewayError> {
        self.as_ref().submit_personal(id, form)
    }

    fn submit_project_interest(
        &self,
        id: VisitorId,
        form: &ProjectInterestForm,
    ) -> Result<(), GatewayError> {
        self.as_ref().submit_project_interest(id, form)
    }

    fn submit_delivery_timeline(
        &self,
        id: VisitorId,
        form: &DeliveryForm,
    ) -> Result<(), GatewayError> {
        self.as_ref().submit_delivery_timeline(id, form)
    }

    fn upload_photo(&self, id: VisitorId, photo: &PhotoData) -> Result<StoredDocument, GatewayError> {
        self.as_ref().upload_photo(id, photo)
    }

    fn submit_declaration(
        &self,
        id: VisitorId,
        accepted: bool,
        notes: Option<&str>,
    ) -> Result<(), GatewayError> {
        self.as_ref().submit_declaration(id, accepted, notes)
    }

    fn submit_for_review(&self, id: VisitorId, client_ip: &str) -> Result<(), GatewayError> {
        self.as_ref().submit_for_review(id, client_ip)
    }

    fn dispatch_otp(&self, id: VisitorId) -> Result<(), GatewayError> {
        self.as_ref().dispatch_otp(id)
    }

    fn verify_otp(&self, id: VisitorId, code: &str) -> Result<OtpVerification, GatewayError> {
        self.as_ref().verify_otp(id, code)
    }
}

/// Best-effort public IP enrichment attached to the final submission.
pub trait IpLookup: Send + Sync {
    fn client_ip(&self) -> Result<String, IpLookupError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IpLookupError {
    #[error("ip lookup failed: {0}")]
    Transport(String),
}

/// Substituted when the lookup fails; submission must never block on it.
pub const IP_PLACEHOLDER: &str = "Unable to fetch";

impl<T: IpLookup + ?Sized> IpLookup for std::sync::Arc<T> {
    fn client_ip(&self) -> Result<String, IpLookupError> {
        self.as_ref().client_ip()
    }
}

// Wire payloads. Field names follow the remote API's camelCase contract; the
// branch not taken on step 1 is nulled, matching the original client.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralPayload {
    pub referral: &'static str,
    pub broker_name: Option<String>,
    pub broker_phone: Option<String>,
    pub broker_id: Option<String>,
    pub direct_source: Option<String>,
    pub direct_source_others: Option<String>,
}

impl ReferralPayload {
    pub fn from_form(form: &ReferralForm) -> Self {
        let broker = form.channel == ReferralChannel::Broker;
        let direct = form.channel == ReferralChannel::Direct;
        let source = form.direct_source.filter(|_| direct);
        Self {
            referral: form.channel.wire_value(),
            broker_name: broker.then(|| form.broker_name.clone()),
            broker_phone: broker.then(|| form.broker_phone.clone()),
            broker_id: broker.then(|| form.broker_id.clone()),
            direct_source: source.map(|s| s.wire_value().to_string()),
            direct_source_others: source
                .filter(|s| matches!(s, super::domain::DirectSource::Others))
                .map(|_| form.direct_source_others.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalPayload {
    pub visitor_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub aadhar_last4: String,
    pub city: Option<String>,
    pub city_other: Option<String>,
    pub pincode: String,
    pub occupation: Option<String>,
    pub budget: Option<String>,
}

impl PersonalPayload {
    pub fn from_form(id: VisitorId, form: &PersonalForm) -> Self {
        let city = form.city.map(|c| c.wire_value().to_string());
        let city_other = form
            .city
            .filter(|c| matches!(c, super::domain::City::Others))
            .map(|_| form.city_other.clone());
        Self {
            visitor_id: id.0,
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            aadhar_last4: form.aadhaar_last4.clone(),
            city,
            city_other,
            pincode: form.pincode.clone(),
            occupation: non_empty(&form.occupation),
            budget: non_empty(&form.budget),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInterestPayload {
    pub visitor_id: i64,
    pub project_config: Option<String>,
}

impl ProjectInterestPayload {
    pub fn from_form(id: VisitorId, form: &ProjectInterestForm) -> Self {
        Self {
            visitor_id: id.0,
            project_config: form.configuration.map(|c| c.wire_value().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub visitor_id: i64,
    pub project_duration: Option<String>,
}

impl DeliveryPayload {
    pub fn from_form(id: VisitorId, form: &DeliveryForm) -> Self {
        Self {
            visitor_id: id.0,
            project_duration: form.timeline.map(|t| t.wire_value().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationPayload {
    pub visitor_id: i64,
    pub declaration_accepted: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub visitor_id: i64,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpPayload {
    pub visitor_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyPayload {
    pub visitor_id: i64,
    pub otp: String,
}

/// Step 1 success body: the minted session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralResponse {
    pub visitor_id: i64,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
