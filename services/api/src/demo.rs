//! Scripted walkthrough of one registration against the in-memory backend.
//! Useful for sales-floor demos and for eyeballing the full flow without a
//! kiosk or the remote API.

use std::sync::Arc;

use chrono::Local;
use clap::Args;
use suncity_registration::error::AppError;
use suncity_registration::registration::export::{export_csv, ExportRange};
use suncity_registration::registration::visitor::{
    City, ConfirmationMode, DeclarationForm, DeliveryForm, DeliveryTimeline, DirectSource,
    InMemorySnapshotStore, PersonalForm, PhotoData, PhotoForm, ProjectInterestForm,
    ReferralChannel, ReferralForm, StepForm, UnitConfiguration, VisitorWizard,
};

use crate::infra::{InMemoryRegistrationGateway, KioskIpLookup, DEMO_OTP};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Walk the broker referral branch instead of the direct one
    #[arg(long)]
    pub(crate) broker: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let intake = Arc::new(InMemoryRegistrationGateway::default());
    let mut wizard = VisitorWizard::new(
        Box::new(intake.clone()),
        Box::new(Arc::new(InMemorySnapshotStore::default())),
        Box::new(KioskIpLookup),
        ConfirmationMode::Otp,
    );

    println!("== Suncity visitor registration demo ==");

    let referral = if args.broker {
        ReferralForm {
            channel: ReferralChannel::Broker,
            broker_name: "Shakti Estates".to_string(),
            broker_phone: "9812345670".to_string(),
            broker_id: "CP-1207".to_string(),
            ..ReferralForm::default()
        }
    } else {
        ReferralForm {
            channel: ReferralChannel::Direct,
            direct_source: Some(DirectSource::Google),
            ..ReferralForm::default()
        }
    };
    wizard.apply(StepForm::Referral(referral));
    wizard.advance()?;
    let visitor_id = wizard.visitor_id().map(|id| id.0).unwrap_or_default();
    println!("step 1 committed, visitor id {visitor_id}");

    // First attempt with a bad phone number to show validation in action.
    wizard.apply(StepForm::Personal(PersonalForm {
        name: "Asha Verma".to_string(),
        email: "asha.verma@example.com".to_string(),
        phone: "12345".to_string(),
        aadhaar_last4: "4321".to_string(),
        city: Some(City::Noida),
        pincode: "201301".to_string(),
        occupation: "Architect".to_string(),
        budget: "1.8 Cr".to_string(),
        ..PersonalForm::default()
    }));
    wizard.advance()?;
    for (field, message) in wizard.errors() {
        println!("rejected: {field} -> {message}");
    }

    wizard.apply(StepForm::Personal(PersonalForm {
        phone: "9876543210".to_string(),
        ..wizard.forms().personal.clone()
    }));
    wizard.advance()?;
    println!("step 2 committed with a corrected phone number");

    wizard.apply(StepForm::ProjectInterest(ProjectInterestForm {
        configuration: Some(UnitConfiguration::ThreeBhk),
    }));
    wizard.advance()?;
    wizard.apply(StepForm::DeliveryTimeline(DeliveryForm {
        timeline: Some(DeliveryTimeline::WithinTwoMonths),
    }));
    wizard.advance()?;
    println!("steps 3 and 4 committed");

    wizard.apply(StepForm::Photo(PhotoForm {
        local: Some(PhotoData {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            filename: "asha.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
        }),
        uploaded_filename: None,
    }));
    wizard.advance()?;
    println!(
        "photo stored as {}",
        wizard
            .forms()
            .photo
            .uploaded_filename
            .as_deref()
            .unwrap_or("<missing>")
    );

    wizard.apply(StepForm::Declaration(DeclarationForm {
        accepted: true,
        notes: "Demo walkthrough".to_string(),
    }));
    wizard.finalize()?;
    println!("finalized, awaiting OTP");

    // A wrong code first, then the one the in-memory backend accepts.
    match wizard.verify_otp("9999") {
        Ok(()) => println!("unexpected acceptance"),
        Err(err) => println!("otp 9999 rejected: {err}"),
    }
    match wizard.verify_otp(DEMO_OTP) {
        Ok(()) => println!("otp {DEMO_OTP} accepted, registration complete"),
        Err(err) => println!("otp {DEMO_OTP} rejected: {err}"),
    }

    let rows = intake.export_rows();
    let csv = export_csv(&rows, ExportRange::Today, Local::now().date_naive())?;
    println!("\n== Today's export ==\n{csv}");

    Ok(())
}
