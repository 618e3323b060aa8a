use serde::{Deserialize, Serialize};

/// Identifier the remote registration API mints when the first step commits.
/// Absent until then; every later step submission attaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitorId(pub i64);

/// Fixed, ordered step sequence of the visitor registration wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Referral,
    Personal,
    ProjectInterest,
    DeliveryTimeline,
    Photo,
    Declaration,
}

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep::Referral;
    pub const LAST: WizardStep = WizardStep::Declaration;

    /// One-based position shown on the kiosk progress rail.
    pub const fn ordinal(self) -> u8 {
        match self {
            WizardStep::Referral => 1,
            WizardStep::Personal => 2,
            WizardStep::ProjectInterest => 3,
            WizardStep::DeliveryTimeline => 4,
            WizardStep::Photo => 5,
            WizardStep::Declaration => 6,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::Referral => "Referral Source",
            WizardStep::Personal => "Personal Details",
            WizardStep::ProjectInterest => "Project Interest",
            WizardStep::DeliveryTimeline => "Project Delivery",
            WizardStep::Photo => "Photo & Document",
            WizardStep::Declaration => "Declaration",
        }
    }

    pub const fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Referral => Some(WizardStep::Personal),
            WizardStep::Personal => Some(WizardStep::ProjectInterest),
            WizardStep::ProjectInterest => Some(WizardStep::DeliveryTimeline),
            WizardStep::DeliveryTimeline => Some(WizardStep::Photo),
            WizardStep::Photo => Some(WizardStep::Declaration),
            WizardStep::Declaration => None,
        }
    }

    pub const fn prev(self) -> Option<WizardStep> {
        match self {
            WizardStep::Referral => None,
            WizardStep::Personal => Some(WizardStep::Referral),
            WizardStep::ProjectInterest => Some(WizardStep::Personal),
            WizardStep::DeliveryTimeline => Some(WizardStep::ProjectInterest),
            WizardStep::Photo => Some(WizardStep::DeliveryTimeline),
            WizardStep::Declaration => Some(WizardStep::Photo),
        }
    }
}

/// How the visitor reached the sales office.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralChannel {
    #[default]
    Direct,
    Broker,
}

impl ReferralChannel {
    pub const fn wire_value(self) -> &'static str {
        match self {
            ReferralChannel::Direct => "direct",
            ReferralChannel::Broker => "broker",
        }
    }
}

/// Marketing source options offered to direct (non-broker) visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectSource {
    Google,
    Social,
    Friend,
    Site,
    Others,
}

impl DirectSource {
    pub const fn wire_value(self) -> &'static str {
        match self {
            DirectSource::Google => "google",
            DirectSource::Social => "social",
            DirectSource::Friend => "friend",
            DirectSource::Site => "site",
            DirectSource::Others => "others",
        }
    }
}

/// Catchment cities offered on the personal details step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum City {
    EastDelhi,
    WestDelhi,
    SouthDelhi,
    NorthDelhi,
    Gurugram,
    Faridabad,
    Noida,
    Ghaziabad,
    Others,
}

impl City {
    pub const fn wire_value(self) -> &'static str {
        match self {
            City::EastDelhi => "East Delhi",
            City::WestDelhi => "West Delhi",
            City::SouthDelhi => "South Delhi",
            City::NorthDelhi => "North Delhi",
            City::Gurugram => "Gurugram",
            City::Faridabad => "Faridabad",
            City::Noida => "Noida",
            City::Ghaziabad => "Ghaziabad",
            City::Others => "others",
        }
    }
}

/// Unit configuration the visitor is shopping for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConfiguration {
    ThreeBhk,
    FourBhk,
    Both,
}

impl UnitConfiguration {
    pub const fn wire_value(self) -> &'static str {
        match self {
            UnitConfiguration::ThreeBhk => "3 BHK",
            UnitConfiguration::FourBhk => "4 BHK",
            UnitConfiguration::Both => "Both",
        }
    }
}

/// How soon the visitor wants possession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTimeline {
    Immediate,
    WithinTwoMonths,
    WithinThreeMonths,
}

impl DeliveryTimeline {
    pub const fn wire_value(self) -> &'static str {
        match self {
            DeliveryTimeline::Immediate => "Immediate",
            DeliveryTimeline::WithinTwoMonths => "With In 2 Months",
            DeliveryTimeline::WithinThreeMonths => "With In 3 Months",
        }
    }
}

/// Step 1: referral source. Broker fields only matter on the broker branch,
/// direct-source fields only on the direct branch; the unused branch is
/// nulled out at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferralForm {
    pub channel: ReferralChannel,
    pub direct_source: Option<DirectSource>,
    pub direct_source_others: String,
    pub broker_name: String,
    pub broker_phone: String,
    pub broker_id: String,
}

/// Step 2: personal details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub aadhaar_last4: String,
    pub city: Option<City>,
    pub city_other: String,
    pub pincode: String,
    pub occupation: String,
    pub budget: String,
}

/// Step 3: configuration interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectInterestForm {
    pub configuration: Option<UnitConfiguration>,
}

/// Step 4: delivery expectation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryForm {
    pub timeline: Option<DeliveryTimeline>,
}

/// In-memory photo captured from the camera or picked from the gallery.
/// Never serialized into snapshots; a binary that has not reached the server
/// cannot survive a kiosk restart, matching the original flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoData {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// Step 5: visitor photo. The local binary is owned by the session until the
/// document upload succeeds; afterwards only the server-issued filename is
/// retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhotoForm {
    #[serde(skip)]
    pub local: Option<PhotoData>,
    pub uploaded_filename: Option<String>,
}

/// View of the attachment's ownership state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment<'a> {
    Missing,
    Local(&'a PhotoData),
    Uploaded(&'a str),
}

impl PhotoForm {
    pub fn attachment(&self) -> Attachment<'_> {
        if let Some(filename) = self.uploaded_filename.as_deref() {
            Attachment::Uploaded(filename)
        } else if let Some(photo) = self.local.as_ref() {
            Attachment::Local(photo)
        } else {
            Attachment::Missing
        }
    }

    pub fn has_attachment(&self) -> bool {
        !matches!(self.attachment(), Attachment::Missing)
    }
}

/// Step 6: final declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeclarationForm {
    pub accepted: bool,
    pub notes: String,
}

/// Union of every step's typed form. One slot per step; a slot keeps its
/// last-edited value when the visitor navigates away, which is harmless
/// because validation and submission only ever read the active step's slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepForms {
    pub referral: ReferralForm,
    pub personal: PersonalForm,
    pub project_interest: ProjectInterestForm,
    pub delivery: DeliveryForm,
    pub photo: PhotoForm,
    pub declaration: DeclarationForm,
}

/// A single step's worth of input, tagged by step. This is what kiosk
/// clients send when they ask the wizard to advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepForm {
    Referral(ReferralForm),
    Personal(PersonalForm),
    ProjectInterest(ProjectInterestForm),
    DeliveryTimeline(DeliveryForm),
    Photo(PhotoForm),
    Declaration(DeclarationForm),
}

impl StepForm {
    pub const fn step(&self) -> WizardStep {
        match self {
            StepForm::Referral(_) => WizardStep::Referral,
            StepForm::Personal(_) => WizardStep::Personal,
            StepForm::ProjectInterest(_) => WizardStep::ProjectInterest,
            StepForm::DeliveryTimeline(_) => WizardStep::DeliveryTimeline,
            StepForm::Photo(_) => WizardStep::Photo,
            StepForm::Declaration(_) => WizardStep::Declaration,
        }
    }
}

impl StepForms {
    /// Store one step's input into its slot.
    pub fn apply(&mut self, form: StepForm) {
        match form {
            StepForm::Referral(form) => self.referral = form,
            StepForm::Personal(form) => self.personal = form,
            StepForm::ProjectInterest(form) => self.project_interest = form,
            StepForm::DeliveryTimeline(form) => self.delivery = form,
            StepForm::Photo(form) => self.photo = form,
            StepForm::Declaration(form) => self.declaration = form,
        }
    }
}

/// Error-map keys, matching the remote API's field names so kiosk clients can
/// attach messages to the right inputs.
pub mod fields {
    pub const BROKER_NAME: &str = "brokerName";
    pub const BROKER_PHONE: &str = "brokerPhone";
    pub const DIRECT_SOURCE: &str = "directSource";
    pub const DIRECT_SOURCE_OTHERS: &str = "directSourceOthers";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const AADHAAR_LAST4: &str = "aadharLast4";
    pub const CITY: &str = "city";
    pub const CITY_OTHER: &str = "cityOther";
    pub const PINCODE: &str = "pincode";
    pub const PROJECT_CONFIG: &str = "projectConfig";
    pub const PROJECT_DURATION: &str = "projectDuration";
    pub const PHOTO: &str = "photo";
    pub const DECLARATION: &str = "declaration";
}
