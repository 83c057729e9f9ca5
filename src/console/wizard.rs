//! Two-step trainer verification request: details first, documents second.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::FieldErrors;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::confirm::failure_message;
use super::notify::Notifier;
use crate::models::{VerificationDetails, VerificationSubmission, VerificationUploads};
use crate::query::MutationError;
use crate::utils::response::field_messages;
use crate::utils::validation::{Base64Upload, UploadKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    Details,
    Documents,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("Complete your details before uploading documents")]
    DetailsMissing,

    #[error("Your verification request is already being submitted")]
    Submitting,

    #[error("Please correct the highlighted fields")]
    Invalid(FieldErrors),
}

impl From<ValidationErrors> for WizardError {
    fn from(errors: ValidationErrors) -> Self {
        WizardError::Invalid(field_messages(&errors))
    }
}

/// Step-two form. Each document is optional here so a missing one is
/// reported as a field error rather than a malformed body.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsForm {
    #[serde(default)]
    pub id_proof: Option<Base64Upload>,
    #[serde(default)]
    pub certificate: Option<Base64Upload>,
    #[serde(default)]
    pub resume: Option<Base64Upload>,
}

impl DocumentsForm {
    fn decode(&self) -> Result<VerificationUploads, WizardError> {
        let mut errors = FieldErrors::new();
        let mut take = |field: &str, upload: &Option<Base64Upload>| match upload {
            Some(upload) => match upload.decode(UploadKind::Document) {
                Ok(file) => Some(file),
                Err(message) => {
                    errors.insert(field.to_string(), vec![message]);
                    None
                }
            },
            None => {
                errors.insert(field.to_string(), vec![format!("{} is required", field)]);
                None
            }
        };

        let id_proof = take("idProof", &self.id_proof);
        let certificate = take("certificate", &self.certificate);
        let resume = take("resume", &self.resume);

        match (id_proof, certificate, resume) {
            (Some(id_proof), Some(certificate), Some(resume)) => Ok(VerificationUploads {
                id_proof,
                certificate,
                resume,
            }),
            _ => Err(WizardError::Invalid(errors)),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step: WizardStep,
    pub details: Option<VerificationDetails>,
    pub submitting: bool,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct VerificationWizard {
    step: WizardStep,
    details: Option<VerificationDetails>,
    submitting: bool,
    last_error: Option<String>,
}

impl Default for VerificationWizard {
    fn default() -> Self {
        VerificationWizard {
            step: WizardStep::Details,
            details: None,
            submitting: false,
            last_error: None,
        }
    }
}

impl VerificationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn details(&self) -> Option<&VerificationDetails> {
        self.details.as_ref()
    }

    /// Validates step one. Invalid input keeps the wizard on `Details`.
    pub fn submit_details(&mut self, details: VerificationDetails) -> Result<(), WizardError> {
        if self.submitting {
            return Err(WizardError::Submitting);
        }
        details.validate()?;
        self.details = Some(details);
        self.step = WizardStep::Documents;
        self.last_error = None;
        Ok(())
    }

    /// Returns to step one with the entered details kept for editing.
    pub fn back(&mut self) {
        if !self.submitting {
            self.step = WizardStep::Details;
        }
    }

    /// Builds the request from the held details and the three documents and
    /// marks the wizard as submitting.
    pub fn prepare(&mut self, documents: &DocumentsForm) -> Result<VerificationSubmission, WizardError> {
        if self.submitting {
            return Err(WizardError::Submitting);
        }
        let details = match (&self.step, &self.details) {
            (WizardStep::Documents, Some(details)) => details.clone(),
            _ => return Err(WizardError::DetailsMissing),
        };
        let uploads = documents.decode()?;
        let submission = VerificationSubmission::new(details, uploads)?;
        self.submitting = true;
        Ok(submission)
    }

    /// A failed submission stays on `Documents` with the details intact.
    pub fn settle(&mut self, result: &Result<Value, MutationError>, notifier: &Notifier) {
        self.submitting = false;
        match result {
            Ok(_) => {
                notifier.success("Verification submitted successfully");
                *self = VerificationWizard::default();
            }
            Err(err) => {
                let message = failure_message(err);
                notifier.error(message.clone());
                self.last_error = Some(message);
            }
        }
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.step,
            details: self.details.clone(),
            submitting: self.submitting,
            last_error: self.last_error.clone(),
        }
    }
}
