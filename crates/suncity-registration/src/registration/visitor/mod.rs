//! Visitor registration wizard: typed step forms, validation, the state
//! machine that sequences remote commits, and the kiosk HTTP surface.

pub mod capture;
pub mod domain;
pub mod engine;
pub mod gateway;
pub mod http;
pub mod router;
pub mod session;
pub mod snapshot;
pub mod validation;

#[cfg(test)]
mod tests;

pub use capture::{CameraDriver, CameraStream, CaptureError, CaptureSession};
pub use domain::{
    Attachment, City, DeclarationForm, DeliveryForm, DeliveryTimeline, DirectSource, PersonalForm,
    PhotoData, PhotoForm, ProjectInterestForm, ReferralChannel, ReferralForm, StepForm, StepForms,
    UnitConfiguration, VisitorId, WizardStep,
};
pub use engine::{
    AdvanceOutcome, ConfirmationMode, FinalizeOutcome, FinalizeProgress, FinalizeStage, OtpError,
    VisitorWizard, WizardError, WizardPhase,
};
pub use gateway::{
    GatewayError, IpLookup, IpLookupError, OtpVerification, RegistrationGateway, StoredDocument,
    IP_PLACEHOLDER,
};
pub use http::{HttpIpLookup, HttpRegistrationGateway};
pub use router::{registration_router, SessionRegistry, SessionView, WizardFactory};
pub use session::WizardSession;
pub use snapshot::{
    FileSnapshotStore, InMemorySnapshotStore, Snapshot, SnapshotError, SnapshotStore, SNAPSHOT_KEY,
};
