//! reqwest-backed gateway. The wizard engine is synchronous UI-callback code,
//! so the async client is wrapped behind a dedicated runtime and `block_on`
//! rather than leaking async through the engine's contract.

use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::config::BackendConfig;

use super::domain::{
    DeliveryForm, PersonalForm, PhotoData, ProjectInterestForm, ReferralForm, VisitorId,
};
use super::gateway::{
    DeclarationPayload, DeliveryPayload, GatewayError, IpLookup, IpLookupError, OtpPayload,
    OtpVerification, OtpVerifyPayload, PersonalPayload, ProjectInterestPayload, ReferralPayload,
    ReferralResponse, RegistrationGateway, StoredDocument, SubmitPayload,
};

pub struct HttpRegistrationGateway {
    client: reqwest::Client,
    base_url: String,
    runtime: Runtime,
}

impl HttpRegistrationGateway {
    pub fn from_config(config: &BackendConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            runtime,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/visitor/{path}", self.base_url)
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, GatewayError> {
        let url = self.url(path);
        let response = self
            .runtime
            .block_on(self.client.post(&url).json(body).send())
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(response)
    }

    fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Status {
                status: status.as_u16(),
            })
        }
    }

    fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, GatewayError> {
        self.runtime
            .block_on(response.json::<T>())
            .map_err(|err| GatewayError::Response(err.to_string()))
    }
}

impl RegistrationGateway for HttpRegistrationGateway {
    fn submit_referral(&self, form: &ReferralForm) -> Result<VisitorId, GatewayError> {
        let payload = ReferralPayload::from_form(form);
        let response = Self::expect_success(self.post_json("step1", &payload)?)?;
        let body: ReferralResponse = self.read_json(response)?;
        Ok(VisitorId(body.visitor_id))
    }

    fn submit_personal(&self, id: VisitorId, form: &PersonalForm) -> Result<(), GatewayError> {
        let payload = PersonalPayload::from_form(id, form);
        Self::expect_success(self.post_json("step2", &payload)?)?;
        Ok(())
    }

    fn submit_project_interest(
        &self,
        id: VisitorId,
        form: &ProjectInterestForm,
    ) -> Result<(), GatewayError> {
        let payload = ProjectInterestPayload::from_form(id, form);
        Self::expect_success(self.post_json("step3", &payload)?)?;
        Ok(())
    }

    fn submit_delivery_timeline(
        &self,
        id: VisitorId,
        form: &DeliveryForm,
    ) -> Result<(), GatewayError> {
        let payload = DeliveryPayload::from_form(id, form);
        Self::expect_success(self.post_json("step4", &payload)?)?;
        Ok(())
    }

    fn upload_photo(&self, id: VisitorId, photo: &PhotoData) -> Result<StoredDocument, GatewayError> {
        let part = multipart::Part::bytes(photo.bytes.clone())
            .file_name(photo.filename.clone())
            .mime_str(&photo.mime_type)
            .map_err(|err| GatewayError::Response(err.to_string()))?;
        let form = multipart::Form::new()
            .text("visitorId", id.0.to_string())
            .part("photo", part);

        let url = self.url("documents");
        let response = self
            .runtime
            .block_on(self.client.post(&url).multipart(form).send())
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let response = Self::expect_success(response)?;

        // The backend exposes the stored file by name. Older deployments
        // return an empty body, in which case the submitted name stands.
        let filename = self
            .runtime
            .block_on(response.json::<Value>())
            .ok()
            .and_then(|body| {
                body.get("fileName")
                    .or_else(|| body.get("filename"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| photo.filename.clone());

        Ok(StoredDocument { filename })
    }

    fn submit_declaration(
        &self,
        id: VisitorId,
        accepted: bool,
        notes: Option<&str>,
    ) -> Result<(), GatewayError> {
        let payload = DeclarationPayload {
            visitor_id: id.0,
            declaration_accepted: accepted,
            notes: notes.map(str::to_string),
        };
        Self::expect_success(self.post_json("declaration", &payload)?)?;
        Ok(())
    }

    fn submit_for_review(&self, id: VisitorId, client_ip: &str) -> Result<(), GatewayError> {
        let payload = SubmitPayload {
            visitor_id: id.0,
            ip: client_ip.to_string(),
        };
        Self::expect_success(self.post_json("submit", &payload)?)?;
        Ok(())
    }

    fn dispatch_otp(&self, id: VisitorId) -> Result<(), GatewayError> {
        let payload = OtpPayload { visitor_id: id.0 };
        Self::expect_success(self.post_json("send-otp", &payload)?)?;
        Ok(())
    }

    fn verify_otp(&self, id: VisitorId, code: &str) -> Result<OtpVerification, GatewayError> {
        let payload = OtpVerifyPayload {
            visitor_id: id.0,
            otp: code.to_string(),
        };
        let response = self.post_json("verify-otp", &payload)?;

        if response.status().is_success() {
            return Ok(OtpVerification::Accepted);
        }

        // A rejected code arrives as a non-success status with an optional
        // human-readable message to surface verbatim.
        let message = self
            .runtime
            .block_on(response.json::<Value>())
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        Ok(OtpVerification::Rejected { message })
    }
}

/// Public IP enrichment against an ipify-style endpoint.
pub struct HttpIpLookup {
    client: reqwest::Client,
    url: String,
    runtime: Runtime,
}

impl HttpIpLookup {
    pub fn from_config(config: &BackendConfig) -> Result<Self, IpLookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| IpLookupError::Transport(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| IpLookupError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            url: config.ip_lookup_url.clone(),
            runtime,
        })
    }
}

impl IpLookup for HttpIpLookup {
    fn client_ip(&self) -> Result<String, IpLookupError> {
        let body: Value = self
            .runtime
            .block_on(async {
                self.client
                    .get(&self.url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Value>()
                    .await
            })
            .map_err(|err| IpLookupError::Transport(err.to_string()))?;

        body.get("ip")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| IpLookupError::Transport("response carried no ip field".to_string()))
    }
}
