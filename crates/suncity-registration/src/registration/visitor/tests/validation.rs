use super::common::*;
use crate::registration::visitor::domain::{
    fields, City, DeclarationForm, DirectSource, PersonalForm, ReferralChannel, ReferralForm,
    StepForms, WizardStep,
};
use crate::registration::visitor::validation::validate;

fn forms_with_personal(personal: PersonalForm) -> StepForms {
    StepForms {
        personal,
        ..StepForms::default()
    }
}

#[test]
fn broker_requires_name_and_phone_but_not_id() {
    let mut forms = StepForms::default();
    forms.referral = ReferralForm {
        channel: ReferralChannel::Broker,
        ..ReferralForm::default()
    };

    let errors = validate(WizardStep::Referral, &forms);
    assert_eq!(
        errors.get(fields::BROKER_NAME).map(String::as_str),
        Some("Channel Partner name required")
    );
    assert_eq!(
        errors.get(fields::BROKER_PHONE).map(String::as_str),
        Some("Channel Partner phone required")
    );

    forms.referral = broker_referral();
    assert!(validate(WizardStep::Referral, &forms).is_empty());
}

#[test]
fn broker_phone_only_needs_ten_characters() {
    let mut forms = StepForms::default();
    forms.referral = ReferralForm {
        broker_phone: "0123456789".to_string(),
        ..broker_referral()
    };
    assert!(validate(WizardStep::Referral, &forms).is_empty());

    forms.referral.broker_phone = "98123".to_string();
    let errors = validate(WizardStep::Referral, &forms);
    assert_eq!(
        errors.get(fields::BROKER_PHONE).map(String::as_str),
        Some("Channel Partner phone required")
    );
}

#[test]
fn direct_requires_a_source_and_others_requires_text() {
    let mut forms = StepForms::default();
    let errors = validate(WizardStep::Referral, &forms);
    assert_eq!(
        errors.get(fields::DIRECT_SOURCE).map(String::as_str),
        Some("Please select or enter a source")
    );

    forms.referral.direct_source = Some(DirectSource::Others);
    let errors = validate(WizardStep::Referral, &forms);
    assert_eq!(
        errors.get(fields::DIRECT_SOURCE_OTHERS).map(String::as_str),
        Some("Please enter a source")
    );

    forms.referral.direct_source_others = "Hoarding on NH-24".to_string();
    assert!(validate(WizardStep::Referral, &forms).is_empty());
}

#[test]
fn accepts_a_valid_indian_mobile_number() {
    let forms = forms_with_personal(personal_details());
    assert!(validate(WizardStep::Personal, &forms).is_empty());
}

#[test]
fn rejects_short_and_badly_prefixed_mobile_numbers() {
    for phone in ["12345", "5123456789", "98765432101", "98765 43210"] {
        let forms = forms_with_personal(PersonalForm {
            phone: phone.to_string(),
            ..personal_details()
        });
        let errors = validate(WizardStep::Personal, &forms);
        assert_eq!(
            errors.get(fields::PHONE).map(String::as_str),
            Some("Enter valid 10-digit mobile number"),
            "phone {phone:?} should be rejected"
        );
    }
}

#[test]
fn rejects_malformed_email() {
    for email in ["plainaddress", "a@b", "two words@example.com"] {
        let forms = forms_with_personal(PersonalForm {
            email: email.to_string(),
            ..personal_details()
        });
        let errors = validate(WizardStep::Personal, &forms);
        assert_eq!(
            errors.get(fields::EMAIL).map(String::as_str),
            Some("Invalid email address"),
            "email {email:?} should be rejected"
        );
    }
}

#[test]
fn aadhaar_tail_must_be_exactly_four_digits() {
    for tail in ["123", "12345", "12a4"] {
        let forms = forms_with_personal(PersonalForm {
            aadhaar_last4: tail.to_string(),
            ..personal_details()
        });
        let errors = validate(WizardStep::Personal, &forms);
        assert_eq!(
            errors.get(fields::AADHAAR_LAST4).map(String::as_str),
            Some("Enter exactly 4 digits")
        );
    }
}

#[test]
fn pincode_must_be_six_characters() {
    for pincode in ["2013", "2013011"] {
        let forms = forms_with_personal(PersonalForm {
            pincode: pincode.to_string(),
            ..personal_details()
        });
        let errors = validate(WizardStep::Personal, &forms);
        assert!(errors.contains_key(fields::PINCODE), "pincode {pincode:?}");
    }
}

#[test]
fn other_city_requires_the_city_name() {
    let forms = forms_with_personal(PersonalForm {
        city: Some(City::Others),
        city_other: String::new(),
        ..personal_details()
    });
    let errors = validate(WizardStep::Personal, &forms);
    assert!(errors.contains_key(fields::CITY_OTHER));
}

#[test]
fn choice_steps_require_a_selection() {
    let forms = StepForms::default();

    let errors = validate(WizardStep::ProjectInterest, &forms);
    assert_eq!(
        errors.get(fields::PROJECT_CONFIG).map(String::as_str),
        Some("Please select a configuration")
    );

    let errors = validate(WizardStep::DeliveryTimeline, &forms);
    assert_eq!(
        errors.get(fields::PROJECT_DURATION).map(String::as_str),
        Some("Please select a delivery time")
    );
}

#[test]
fn photo_step_requires_an_attachment() {
    let mut forms = StepForms::default();
    let errors = validate(WizardStep::Photo, &forms);
    assert_eq!(
        errors.get(fields::PHOTO).map(String::as_str),
        Some("Visitor photo is required")
    );

    forms.photo = camera_photo();
    assert!(validate(WizardStep::Photo, &forms).is_empty());

    forms.photo.local = None;
    forms.photo.uploaded_filename = Some("stored-kiosk-cam.jpg".to_string());
    assert!(validate(WizardStep::Photo, &forms).is_empty());
}

#[test]
fn declaration_must_be_accepted() {
    let mut forms = StepForms::default();
    let errors = validate(WizardStep::Declaration, &forms);
    assert_eq!(
        errors.get(fields::DECLARATION).map(String::as_str),
        Some("You must accept the declaration")
    );

    forms.declaration = DeclarationForm {
        accepted: true,
        notes: String::new(),
    };
    assert!(validate(WizardStep::Declaration, &forms).is_empty());
}
