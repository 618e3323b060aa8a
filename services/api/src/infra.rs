use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate, NaiveDateTime};
use metrics_exporter_prometheus::PrometheusHandle;
use suncity_registration::registration::export::VisitorRow;
use suncity_registration::registration::visitor::{
    City, DeliveryForm, DeliveryTimeline, GatewayError, IpLookup, IpLookupError, OtpVerification,
    PersonalForm, PhotoData, ProjectInterestForm, ReferralChannel, ReferralForm,
    RegistrationGateway, StoredDocument, UnitConfiguration, VisitorId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// OTP the in-memory backend accepts, printed by the demo command.
pub(crate) const DEMO_OTP: &str = "1234";

#[derive(Default, Clone)]
struct Intake {
    referral: Option<ReferralForm>,
    personal: Option<PersonalForm>,
    configuration: Option<UnitConfiguration>,
    timeline: Option<DeliveryTimeline>,
    photo_filename: Option<String>,
    declaration_accepted: bool,
    submitted_at: Option<NaiveDateTime>,
    confirmed: bool,
}

/// Stand-in for the remote registration API: records every intake so the
/// export endpoint and the demo have real data to show.
#[derive(Default)]
pub(crate) struct InMemoryRegistrationGateway {
    next_id: AtomicI64,
    intakes: Mutex<HashMap<i64, Intake>>,
}

impl InMemoryRegistrationGateway {
    fn with_intake(
        &self,
        id: VisitorId,
        update: impl FnOnce(&mut Intake),
    ) -> Result<(), GatewayError> {
        let mut intakes = self.intakes.lock().expect("intake mutex poisoned");
        let intake = intakes
            .get_mut(&id.0)
            .ok_or(GatewayError::Status { status: 404 })?;
        update(intake);
        Ok(())
    }

    /// Confirmed registrations, flattened for the export sheet.
    pub(crate) fn export_rows(&self) -> Vec<VisitorRow> {
        let intakes = self.intakes.lock().expect("intake mutex poisoned");
        let mut rows: Vec<VisitorRow> = intakes
            .values()
            .filter(|intake| {
                intake.confirmed
                    && intake.declaration_accepted
                    && intake.photo_filename.is_some()
                    && intake.timeline.is_some()
            })
            .filter_map(row_from_intake)
            .collect();
        rows.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        rows
    }

    pub(crate) fn confirmed_count(&self) -> usize {
        self.intakes
            .lock()
            .expect("intake mutex poisoned")
            .values()
            .filter(|intake| intake.confirmed)
            .count()
    }
}

fn row_from_intake(intake: &Intake) -> Option<VisitorRow> {
    let personal = intake.personal.as_ref()?;
    let submitted_at = intake.submitted_at?;
    let location = match personal.city {
        Some(City::Others) => personal.city_other.clone(),
        Some(city) => city.wire_value().to_string(),
        None => String::new(),
    };
    let lead_type = intake
        .referral
        .as_ref()
        .map(|referral| match referral.channel {
            ReferralChannel::Broker => format!("broker ({})", referral.broker_name),
            ReferralChannel::Direct => "direct".to_string(),
        })
        .unwrap_or_default();

    Some(VisitorRow {
        name: personal.name.clone(),
        email: personal.email.clone(),
        phone: personal.phone.clone(),
        project: intake
            .configuration
            .map(|config| config.wire_value().to_string())
            .unwrap_or_default(),
        location: location.clone(),
        budget: personal.budget.clone(),
        lead_type,
        full_address: format!("{location} {}", personal.pincode).trim().to_string(),
        occupation: personal.occupation.clone(),
        aadhaar_last4: personal.aadhaar_last4.clone(),
        registered_at: submitted_at,
    })
}

impl RegistrationGateway for InMemoryRegistrationGateway {
    fn submit_referral(&self, form: &ReferralForm) -> Result<VisitorId, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.intakes
            .lock()
            .expect("intake mutex poisoned")
            .insert(
                id,
                Intake {
                    referral: Some(form.clone()),
                    ..Intake::default()
                },
            );
        Ok(VisitorId(id))
    }

    fn submit_personal(&self, id: VisitorId, form: &PersonalForm) -> Result<(), GatewayError> {
        self.with_intake(id, |intake| intake.personal = Some(form.clone()))
    }

    fn submit_project_interest(
        &self,
        id: VisitorId,
        form: &ProjectInterestForm,
    ) -> Result<(), GatewayError> {
        self.with_intake(id, |intake| intake.configuration = form.configuration)
    }

    fn submit_delivery_timeline(
        &self,
        id: VisitorId,
        form: &DeliveryForm,
    ) -> Result<(), GatewayError> {
        self.with_intake(id, |intake| intake.timeline = form.timeline)
    }

    fn upload_photo(
        &self,
        id: VisitorId,
        photo: &PhotoData,
    ) -> Result<StoredDocument, GatewayError> {
        let filename = format!("visitor-{}-{}", id.0, photo.filename);
        self.with_intake(id, |intake| intake.photo_filename = Some(filename.clone()))?;
        Ok(StoredDocument { filename })
    }

    fn submit_declaration(
        &self,
        id: VisitorId,
        accepted: bool,
        _notes: Option<&str>,
    ) -> Result<(), GatewayError> {
        self.with_intake(id, |intake| intake.declaration_accepted = accepted)
    }

    fn submit_for_review(&self, id: VisitorId, client_ip: &str) -> Result<(), GatewayError> {
        let now = Local::now().naive_local();
        tracing::debug!(visitor = id.0, ip = client_ip, "intake submitted for review");
        self.with_intake(id, |intake| intake.submitted_at = Some(now))
    }

    fn dispatch_otp(&self, id: VisitorId) -> Result<(), GatewayError> {
        self.with_intake(id, |_| {})
    }

    fn verify_otp(&self, id: VisitorId, code: &str) -> Result<OtpVerification, GatewayError> {
        if code != DEMO_OTP {
            return Ok(OtpVerification::Rejected {
                message: Some("Invalid OTP".to_string()),
            });
        }
        self.with_intake(id, |intake| intake.confirmed = true)?;
        Ok(OtpVerification::Accepted)
    }
}

/// The kiosk service fronts a local network, so the submission IP is the
/// kiosk's own address rather than an external lookup.
pub(crate) struct KioskIpLookup;

impl IpLookup for KioskIpLookup {
    fn client_ip(&self) -> Result<String, IpLookupError> {
        Ok("127.0.0.1".to_string())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
