//! The registration wizard state machine. Sequences the fixed step list,
//! gates forward progress on step-local validation, commits each step to the
//! remote gateway before advancing, and persists a resumable snapshot after
//! every committed change.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::domain::{Attachment, StepForm, StepForms, VisitorId, WizardStep};
use super::gateway::{
    GatewayError, IpLookup, OtpVerification, RegistrationGateway, IP_PLACEHOLDER,
};
use super::session::WizardSession;
use super::snapshot::SnapshotStore;
use super::validation;

/// Whether the terminal step hands off to OTP confirmation or completes on
/// the declaration alone (the EOI-style variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    Otp,
    DeclarationOnly,
}

/// Coarse lifecycle of one wizard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    InProgress,
    AwaitingOtp,
    Completed,
}

/// Which finalize stages have already committed, so a retry after partial
/// failure re-runs only what is still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeProgress {
    pub declaration_saved: bool,
    pub submitted: bool,
    pub otp_dispatched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStage {
    Declaration,
    Submit,
    OtpDispatch,
}

impl FinalizeStage {
    pub const fn label(self) -> &'static str {
        match self {
            FinalizeStage::Declaration => "declaration",
            FinalizeStage::Submit => "submit",
            FinalizeStage::OtpDispatch => "otp dispatch",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("no registration session is open; the referral step must commit first")]
    MissingVisitorId,
    #[error("the declaration step is closed with finalize, not advance")]
    TerminalStep,
    #[error("finalize is only available from the declaration step")]
    NotAtDeclaration,
    #[error("the wizard is awaiting OTP confirmation")]
    AwaitingConfirmation,
    #[error("step submission failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("finalize {} stage failed: {source}", .stage.label())]
    Finalize {
        stage: FinalizeStage,
        #[source]
        source: GatewayError,
    },
}

/// Result of an advance or finalize attempt that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Step committed remotely; the wizard now shows the returned step.
    Advanced(WizardStep),
    /// Validation rejected the step; errors are stored, nothing was sent.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// All stages committed; OTP is on its way to the visitor's phone.
    AwaitingOtp,
    /// Declaration-only variant: registration is complete and cleared.
    Completed,
    /// Validation rejected the declaration step; nothing was sent.
    Invalid,
}

/// Failures of `verify_otp`. `Display` is the visitor-facing message.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Please enter a valid 4-digit OTP")]
    Malformed,
    #[error("{0}")]
    Rejected(String),
    #[error("Something went wrong. Please try again.")]
    Transport(#[source] GatewayError),
    #[error("no OTP confirmation is pending")]
    NotAwaitingConfirmation,
}

pub struct VisitorWizard {
    gateway: Box<dyn RegistrationGateway>,
    snapshots: Box<dyn SnapshotStore>,
    ip_lookup: Box<dyn IpLookup>,
    confirmation: ConfirmationMode,
    session: WizardSession,
    phase: WizardPhase,
    finalize_progress: FinalizeProgress,
}

impl VisitorWizard {
    /// Build the engine, resuming from a durable snapshot when one exists.
    pub fn new(
        gateway: Box<dyn RegistrationGateway>,
        snapshots: Box<dyn SnapshotStore>,
        ip_lookup: Box<dyn IpLookup>,
        confirmation: ConfirmationMode,
    ) -> Self {
        let session = match snapshots.load() {
            Ok(Some(snapshot)) => {
                info!(
                    visitor_id = snapshot.visitor_id.0,
                    step = snapshot.step.ordinal(),
                    "resuming registration from snapshot"
                );
                WizardSession::restore(snapshot)
            }
            Ok(None) => WizardSession::default(),
            Err(err) => {
                warn!(%err, "snapshot load failed; starting a fresh session");
                WizardSession::default()
            }
        };

        Self {
            gateway,
            snapshots,
            ip_lookup,
            confirmation,
            session,
            phase: WizardPhase::InProgress,
            finalize_progress: FinalizeProgress::default(),
        }
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn current_step(&self) -> WizardStep {
        self.session.step
    }

    pub fn visitor_id(&self) -> Option<VisitorId> {
        self.session.visitor_id
    }

    pub fn forms(&self) -> &StepForms {
        &self.session.forms
    }

    /// Errors from the latest advance/finalize attempt.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.session.errors
    }

    pub fn finalize_progress(&self) -> FinalizeProgress {
        self.finalize_progress
    }

    /// Record edits for one step. Edits are snapshotted immediately once a
    /// visitor id exists, so typed-but-uncommitted details survive a restart.
    /// Editing after a completed run implicitly begins the next visitor's
    /// session.
    pub fn apply(&mut self, form: StepForm) {
        if self.phase == WizardPhase::Completed {
            self.phase = WizardPhase::InProgress;
        }
        self.session.forms.apply(form);
        self.persist_snapshot();
    }

    /// Validate the current step and, when clean, commit it remotely before
    /// moving forward. Validation failures and remote failures both leave
    /// `current_step` untouched.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, WizardError> {
        match self.phase {
            WizardPhase::AwaitingOtp => return Err(WizardError::AwaitingConfirmation),
            WizardPhase::Completed => self.phase = WizardPhase::InProgress,
            WizardPhase::InProgress => {}
        }

        let step = self.session.step;
        let Some(next) = step.next() else {
            return Err(WizardError::TerminalStep);
        };

        self.session.errors = validation::validate(step, &self.session.forms);
        if !self.session.errors.is_empty() {
            return Ok(AdvanceOutcome::Invalid);
        }

        self.submit_current_step(step)?;

        self.session.step = next;
        self.persist_snapshot();
        info!(step = next.ordinal(), "registration advanced");
        Ok(AdvanceOutcome::Advanced(next))
    }

    /// Purely local backward navigation. Never below the first step, never a
    /// network call, never a re-validation.
    pub fn retreat(&mut self) {
        if self.phase != WizardPhase::InProgress {
            return;
        }
        if let Some(prev) = self.session.step.prev() {
            self.session.step = prev;
            self.session.errors.clear();
            self.persist_snapshot();
        }
    }

    /// Terminal pipeline: declaration -> submit-for-review -> OTP dispatch.
    /// Stages that already committed are skipped on retry, so a partial
    /// failure is a resumable state rather than a restart.
    pub fn finalize(&mut self) -> Result<FinalizeOutcome, WizardError> {
        if self.phase == WizardPhase::AwaitingOtp {
            return Err(WizardError::AwaitingConfirmation);
        }
        if self.session.step != WizardStep::Declaration {
            return Err(WizardError::NotAtDeclaration);
        }

        self.session.errors = validation::validate(WizardStep::Declaration, &self.session.forms);
        if !self.session.errors.is_empty() {
            return Ok(FinalizeOutcome::Invalid);
        }

        let id = self.session.visitor_id.ok_or(WizardError::MissingVisitorId)?;

        if !self.finalize_progress.declaration_saved {
            let notes = self.session.forms.declaration.notes.trim();
            let notes = (!notes.is_empty()).then_some(notes);
            self.gateway
                .submit_declaration(id, true, notes)
                .map_err(|source| WizardError::Finalize {
                    stage: FinalizeStage::Declaration,
                    source,
                })?;
            self.finalize_progress.declaration_saved = true;
        }

        if !self.finalize_progress.submitted {
            let ip = self.ip_lookup.client_ip().unwrap_or_else(|err| {
                warn!(%err, "ip lookup failed; submitting with placeholder");
                IP_PLACEHOLDER.to_string()
            });
            self.gateway
                .submit_for_review(id, &ip)
                .map_err(|source| WizardError::Finalize {
                    stage: FinalizeStage::Submit,
                    source,
                })?;
            self.finalize_progress.submitted = true;
        }

        match self.confirmation {
            ConfirmationMode::Otp => {
                if !self.finalize_progress.otp_dispatched {
                    self.gateway
                        .dispatch_otp(id)
                        .map_err(|source| WizardError::Finalize {
                            stage: FinalizeStage::OtpDispatch,
                            source,
                        })?;
                    self.finalize_progress.otp_dispatched = true;
                }
                self.phase = WizardPhase::AwaitingOtp;
                info!(visitor_id = id.0, "registration awaiting OTP confirmation");
                Ok(FinalizeOutcome::AwaitingOtp)
            }
            ConfirmationMode::DeclarationOnly => {
                self.complete_session(id);
                Ok(FinalizeOutcome::Completed)
            }
        }
    }

    /// Check the visitor's OTP. Malformed codes are rejected locally without
    /// a network call; server rejections keep the session awaiting re-entry;
    /// success is the sole destructor path for the session and its snapshot.
    pub fn verify_otp(&mut self, code: &str) -> Result<(), OtpError> {
        if self.phase != WizardPhase::AwaitingOtp {
            return Err(OtpError::NotAwaitingConfirmation);
        }

        if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::Malformed);
        }

        let id = self
            .session
            .visitor_id
            .ok_or(OtpError::NotAwaitingConfirmation)?;

        match self.gateway.verify_otp(id, code) {
            Ok(OtpVerification::Accepted) => {
                self.complete_session(id);
                Ok(())
            }
            Ok(OtpVerification::Rejected { message }) => Err(OtpError::Rejected(
                message.unwrap_or_else(|| "Invalid OTP".to_string()),
            )),
            Err(err) => Err(OtpError::Transport(err)),
        }
    }

    fn submit_current_step(&mut self, step: WizardStep) -> Result<(), WizardError> {
        let forms = &mut self.session.forms;

        if step == WizardStep::Referral {
            let id = self.gateway.submit_referral(&forms.referral)?;
            self.session.visitor_id = Some(id);
            info!(visitor_id = id.0, "registration session opened");
            return Ok(());
        }

        // Every step after the first requires the minted id; fail fast with
        // no network round-trip when it is absent.
        let id = self.session.visitor_id.ok_or(WizardError::MissingVisitorId)?;

        match step {
            WizardStep::Referral | WizardStep::Declaration => unreachable!("handled by callers"),
            WizardStep::Personal => self.gateway.submit_personal(id, &forms.personal)?,
            WizardStep::ProjectInterest => self
                .gateway
                .submit_project_interest(id, &forms.project_interest)?,
            WizardStep::DeliveryTimeline => self
                .gateway
                .submit_delivery_timeline(id, &forms.delivery)?,
            WizardStep::Photo => {
                // Hold the binary until the server confirms storage, then
                // keep only the server-issued filename.
                if let Attachment::Local(photo) = forms.photo.attachment() {
                    let stored = self.gateway.upload_photo(id, photo)?;
                    forms.photo.uploaded_filename = Some(stored.filename);
                    forms.photo.local = None;
                }
            }
        }

        Ok(())
    }

    fn complete_session(&mut self, id: VisitorId) {
        if let Err(err) = self.snapshots.clear() {
            warn!(%err, "failed to clear session snapshot");
        }
        info!(visitor_id = id.0, "registration confirmed and session cleared");
        self.session = WizardSession::default();
        self.finalize_progress = FinalizeProgress::default();
        self.phase = WizardPhase::Completed;
    }

    fn persist_snapshot(&self) {
        let Some(id) = self.session.visitor_id else {
            return;
        };
        let snapshot = self.session.snapshot(id);
        if let Err(err) = self.snapshots.save(&snapshot) {
            // The committed transition stands; resumability is best effort.
            warn!(%err, "failed to persist session snapshot");
        }
    }
}
