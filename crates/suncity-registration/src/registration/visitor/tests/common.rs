use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::registration::visitor::domain::{
    City, DeclarationForm, DeliveryForm, DeliveryTimeline, PersonalForm, PhotoData, PhotoForm,
    ProjectInterestForm, ReferralChannel, ReferralForm, StepForm, UnitConfiguration, VisitorId,
};
use crate::registration::visitor::engine::{ConfirmationMode, VisitorWizard};
use crate::registration::visitor::gateway::{
    GatewayError, IpLookup, IpLookupError, OtpVerification, RegistrationGateway, StoredDocument,
};
use crate::registration::visitor::snapshot::InMemorySnapshotStore;

pub(super) const ACCEPTED_OTP: &str = "1234";

/// Per-method call counts plus the payload details the tests assert on.
#[derive(Default, Clone)]
pub(super) struct GatewayCalls {
    pub referral: u32,
    pub personal: u32,
    pub project_interest: u32,
    pub delivery: u32,
    pub photo_uploads: u32,
    pub declarations: u32,
    pub submissions: u32,
    pub otp_dispatches: u32,
    pub otp_checks: u32,
    pub last_ip: Option<String>,
    pub last_photo_filename: Option<String>,
}

/// Which remote calls the next request should fail, plus OTP scripting.
#[derive(Default)]
pub(super) struct FailPlan {
    pub personal: bool,
    pub declaration: bool,
    pub submit: bool,
    pub otp_dispatch: bool,
    pub verify_transport: bool,
    pub reject_otp_with: Option<Option<String>>,
}

/// Scriptable in-memory stand-in for the remote registration API.
#[derive(Default)]
pub(super) struct MemoryGateway {
    next_id: AtomicI64,
    pub calls: Mutex<GatewayCalls>,
    pub plan: Mutex<FailPlan>,
}

impl MemoryGateway {
    pub(super) fn calls(&self) -> GatewayCalls {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn plan(&self, configure: impl FnOnce(&mut FailPlan)) {
        configure(&mut self.plan.lock().expect("plan mutex poisoned"));
    }

    fn down() -> GatewayError {
        GatewayError::Transport("backend offline".to_string())
    }
}

impl RegistrationGateway for MemoryGateway {
    fn submit_referral(&self, _form: &ReferralForm) -> Result<VisitorId, GatewayError> {
        let mut calls = self.calls.lock().expect("calls mutex poisoned");
        calls.referral += 1;
        Ok(VisitorId(self.next_id.fetch_add(1, Ordering::Relaxed) + 101))
    }

    fn submit_personal(&self, _id: VisitorId, _form: &PersonalForm) -> Result<(), GatewayError> {
        if self.plan.lock().expect("plan mutex poisoned").personal {
            return Err(Self::down());
        }
        self.calls.lock().expect("calls mutex poisoned").personal += 1;
        Ok(())
    }

    fn submit_project_interest(
        &self,
        _id: VisitorId,
        _form: &ProjectInterestForm,
    ) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .project_interest += 1;
        Ok(())
    }

    fn submit_delivery_timeline(
        &self,
        _id: VisitorId,
        _form: &DeliveryForm,
    ) -> Result<(), GatewayError> {
        self.calls.lock().expect("calls mutex poisoned").delivery += 1;
        Ok(())
    }

    fn upload_photo(
        &self,
        _id: VisitorId,
        photo: &PhotoData,
    ) -> Result<StoredDocument, GatewayError> {
        let mut calls = self.calls.lock().expect("calls mutex poisoned");
        calls.photo_uploads += 1;
        calls.last_photo_filename = Some(photo.filename.clone());
        Ok(StoredDocument {
            filename: format!("stored-{}", photo.filename),
        })
    }

    fn submit_declaration(
        &self,
        _id: VisitorId,
        _accepted: bool,
        _notes: Option<&str>,
    ) -> Result<(), GatewayError> {
        if self.plan.lock().expect("plan mutex poisoned").declaration {
            return Err(Self::down());
        }
        self.calls.lock().expect("calls mutex poisoned").declarations += 1;
        Ok(())
    }

    fn submit_for_review(&self, _id: VisitorId, client_ip: &str) -> Result<(), GatewayError> {
        if self.plan.lock().expect("plan mutex poisoned").submit {
            return Err(Self::down());
        }
        let mut calls = self.calls.lock().expect("calls mutex poisoned");
        calls.submissions += 1;
        calls.last_ip = Some(client_ip.to_string());
        Ok(())
    }

    fn dispatch_otp(&self, _id: VisitorId) -> Result<(), GatewayError> {
        if self.plan.lock().expect("plan mutex poisoned").otp_dispatch {
            return Err(Self::down());
        }
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .otp_dispatches += 1;
        Ok(())
    }

    fn verify_otp(&self, _id: VisitorId, code: &str) -> Result<OtpVerification, GatewayError> {
        {
            let plan = self.plan.lock().expect("plan mutex poisoned");
            if plan.verify_transport {
                return Err(Self::down());
            }
            if let Some(message) = plan.reject_otp_with.clone() {
                self.calls.lock().expect("calls mutex poisoned").otp_checks += 1;
                return Ok(OtpVerification::Rejected { message });
            }
        }
        self.calls.lock().expect("calls mutex poisoned").otp_checks += 1;
        if code == ACCEPTED_OTP {
            Ok(OtpVerification::Accepted)
        } else {
            Ok(OtpVerification::Rejected {
                message: Some("Invalid OTP".to_string()),
            })
        }
    }
}

pub(super) struct FixedIp(pub &'static str);

impl IpLookup for FixedIp {
    fn client_ip(&self) -> Result<String, IpLookupError> {
        Ok(self.0.to_string())
    }
}

pub(super) struct OfflineIp;

impl IpLookup for OfflineIp {
    fn client_ip(&self) -> Result<String, IpLookupError> {
        Err(IpLookupError::Transport("lookup host down".to_string()))
    }
}

pub(super) fn build_wizard(
    gateway: Arc<MemoryGateway>,
    store: Arc<InMemorySnapshotStore>,
    confirmation: ConfirmationMode,
) -> VisitorWizard {
    VisitorWizard::new(
        Box::new(gateway),
        Box::new(store),
        Box::new(FixedIp("203.0.113.9")),
        confirmation,
    )
}

pub(super) fn otp_wizard() -> (VisitorWizard, Arc<MemoryGateway>, Arc<InMemorySnapshotStore>) {
    let gateway = Arc::new(MemoryGateway::default());
    let store = Arc::new(InMemorySnapshotStore::default());
    let wizard = build_wizard(gateway.clone(), store.clone(), ConfirmationMode::Otp);
    (wizard, gateway, store)
}

pub(super) fn direct_referral() -> ReferralForm {
    ReferralForm {
        channel: ReferralChannel::Direct,
        direct_source: Some(crate::registration::visitor::domain::DirectSource::Google),
        ..ReferralForm::default()
    }
}

pub(super) fn broker_referral() -> ReferralForm {
    ReferralForm {
        channel: ReferralChannel::Broker,
        broker_name: "Shakti Estates".to_string(),
        broker_phone: "9812345670".to_string(),
        ..ReferralForm::default()
    }
}

pub(super) fn personal_details() -> PersonalForm {
    PersonalForm {
        name: "Asha Verma".to_string(),
        email: "asha.verma@example.com".to_string(),
        phone: "9876543210".to_string(),
        aadhaar_last4: "4321".to_string(),
        city: Some(City::Noida),
        pincode: "201301".to_string(),
        occupation: "Architect".to_string(),
        budget: "1.8 Cr".to_string(),
        ..PersonalForm::default()
    }
}

pub(super) fn camera_photo() -> PhotoForm {
    PhotoForm {
        local: Some(PhotoData {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            filename: "kiosk-cam.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
        }),
        uploaded_filename: None,
    }
}

/// Fill and commit every step up to (not including) the declaration.
pub(super) fn drive_to_declaration(wizard: &mut VisitorWizard) {
    wizard.apply(StepForm::Referral(direct_referral()));
    wizard.advance().expect("referral step");
    wizard.apply(StepForm::Personal(personal_details()));
    wizard.advance().expect("personal step");
    wizard.apply(StepForm::ProjectInterest(ProjectInterestForm {
        configuration: Some(UnitConfiguration::ThreeBhk),
    }));
    wizard.advance().expect("project step");
    wizard.apply(StepForm::DeliveryTimeline(DeliveryForm {
        timeline: Some(DeliveryTimeline::Immediate),
    }));
    wizard.advance().expect("delivery step");
    wizard.apply(StepForm::Photo(camera_photo()));
    wizard.advance().expect("photo step");
    wizard.apply(StepForm::Declaration(DeclarationForm {
        accepted: true,
        notes: String::new(),
    }));
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
