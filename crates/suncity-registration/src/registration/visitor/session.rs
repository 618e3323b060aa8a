use std::collections::BTreeMap;

use super::domain::{StepForms, VisitorId, WizardStep};
use super::snapshot::Snapshot;

/// One in-progress registration: the server-issued id (once assigned), the
/// active step, every step's typed form, and the errors shown for the latest
/// advance attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardSession {
    pub visitor_id: Option<VisitorId>,
    pub step: WizardStep,
    pub forms: StepForms,
    pub errors: BTreeMap<String, String>,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self {
            visitor_id: None,
            step: WizardStep::FIRST,
            forms: StepForms::default(),
            errors: BTreeMap::new(),
        }
    }
}

impl WizardSession {
    /// Durable view of the session. Only meaningful once the server has
    /// assigned a visitor id, so callers gate on that.
    pub fn snapshot(&self, visitor_id: VisitorId) -> Snapshot {
        Snapshot {
            visitor_id,
            step: self.step,
            forms: self.forms.clone(),
        }
    }

    pub fn restore(snapshot: Snapshot) -> Self {
        Self {
            visitor_id: Some(snapshot.visitor_id),
            step: snapshot.step,
            forms: snapshot.forms,
            errors: BTreeMap::new(),
        }
    }
}
