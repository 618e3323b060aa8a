//! Step-local validation. Pure and deterministic: the same step and forms
//! always produce the same error map, and nothing here touches the network.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::domain::{fields, City, DirectSource, ReferralChannel, StepForms, WizardStep};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

fn mobile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[6-9]\d{9}$").expect("valid mobile pattern"))
}

fn aadhaar_fragment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}$").expect("valid aadhaar fragment pattern"))
}

/// Validate one step against the current forms. Returns an empty map when the
/// step is clean; otherwise field name -> visitor-facing message.
pub fn validate(step: WizardStep, forms: &StepForms) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    match step {
        WizardStep::Referral => validate_referral(forms, &mut errors),
        WizardStep::Personal => validate_personal(forms, &mut errors),
        WizardStep::ProjectInterest => {
            if forms.project_interest.configuration.is_none() {
                errors.insert(
                    fields::PROJECT_CONFIG.to_string(),
                    "Please select a configuration".to_string(),
                );
            }
        }
        WizardStep::DeliveryTimeline => {
            if forms.delivery.timeline.is_none() {
                errors.insert(
                    fields::PROJECT_DURATION.to_string(),
                    "Please select a delivery time".to_string(),
                );
            }
        }
        WizardStep::Photo => {
            if !forms.photo.has_attachment() {
                errors.insert(
                    fields::PHOTO.to_string(),
                    "Visitor photo is required".to_string(),
                );
            }
        }
        WizardStep::Declaration => {
            if !forms.declaration.accepted {
                errors.insert(
                    fields::DECLARATION.to_string(),
                    "You must accept the declaration".to_string(),
                );
            }
        }
    }

    errors
}

fn validate_referral(forms: &StepForms, errors: &mut BTreeMap<String, String>) {
    let referral = &forms.referral;
    match referral.channel {
        ReferralChannel::Broker => {
            if referral.broker_name.trim().is_empty() {
                errors.insert(
                    fields::BROKER_NAME.to_string(),
                    "Channel Partner name required".to_string(),
                );
            }
            // Partner numbers are looser than visitor mobiles: any 10
            // characters pass, matching the sales-office intake form.
            if referral.broker_phone.chars().count() != 10 {
                errors.insert(
                    fields::BROKER_PHONE.to_string(),
                    "Channel Partner phone required".to_string(),
                );
            }
            // broker_id stays optional
        }
        ReferralChannel::Direct => match referral.direct_source {
            None => {
                errors.insert(
                    fields::DIRECT_SOURCE.to_string(),
                    "Please select or enter a source".to_string(),
                );
            }
            Some(DirectSource::Others) => {
                if referral.direct_source_others.trim().is_empty() {
                    errors.insert(
                        fields::DIRECT_SOURCE_OTHERS.to_string(),
                        "Please enter a source".to_string(),
                    );
                }
            }
            Some(_) => {}
        },
    }
}

fn validate_personal(forms: &StepForms, errors: &mut BTreeMap<String, String>) {
    let personal = &forms.personal;

    if personal.name.trim().is_empty() {
        errors.insert(fields::NAME.to_string(), "Name required".to_string());
    }
    if !email_pattern().is_match(&personal.email) {
        errors.insert(
            fields::EMAIL.to_string(),
            "Invalid email address".to_string(),
        );
    }
    if !mobile_pattern().is_match(&personal.phone) {
        errors.insert(
            fields::PHONE.to_string(),
            "Enter valid 10-digit mobile number".to_string(),
        );
    }
    if !aadhaar_fragment_pattern().is_match(&personal.aadhaar_last4) {
        errors.insert(
            fields::AADHAAR_LAST4.to_string(),
            "Enter exactly 4 digits".to_string(),
        );
    }
    match personal.city {
        None => {
            errors.insert(fields::CITY.to_string(), "City required".to_string());
        }
        Some(City::Others) => {
            if personal.city_other.trim().is_empty() {
                errors.insert(fields::CITY_OTHER.to_string(), "City required".to_string());
            }
        }
        Some(_) => {}
    }
    if personal.pincode.chars().count() != 6 {
        errors.insert(fields::PINCODE.to_string(), "Pincode required".to_string());
    }
    // occupation and budget are optional
}
