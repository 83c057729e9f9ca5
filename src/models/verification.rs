use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::StatusFilter;
use crate::client::{FormPart, Upload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    /// Allowed review decisions: a pending request may go either way and a
    /// decision may be reversed, but nothing returns to pending.
    pub fn can_transition_to(self, next: VerificationStatus) -> bool {
        matches!(
            (self, next),
            (VerificationStatus::Pending, VerificationStatus::Verified)
                | (VerificationStatus::Pending, VerificationStatus::Rejected)
                | (VerificationStatus::Verified, VerificationStatus::Rejected)
                | (VerificationStatus::Rejected, VerificationStatus::Verified)
        )
    }
}

impl StatusFilter for VerificationStatus {
    const ALL: &'static [Self] = &[
        VerificationStatus::Pending,
        VerificationStatus::Verified,
        VerificationStatus::Rejected,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Stored document URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDocuments {
    #[serde(default)]
    pub id_proof: Option<String>,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default)]
    pub resume: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainerVerification {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub trainer_id: String,
    #[serde(default)]
    pub trainer_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub qualification: String,
    #[serde(default)]
    pub specialisation: String,
    #[serde(default)]
    pub experience: Option<u32>,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub documents: VerificationDocuments,
    pub status: VerificationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RejectVerificationDto {
    pub reason: String,
}

/// Step-one answers of a trainer's verification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    #[validate(length(min = 2, max = 120, message = "Qualification must be at least 2 characters"))]
    pub qualification: String,
    #[validate(length(min = 2, max = 120, message = "Specialisation must be at least 2 characters"))]
    pub specialisation: String,
    #[validate(range(max = 60, message = "Experience must be between 0 and 60 years"))]
    pub experience: u32,
    #[validate(length(min = 20, max = 1000, message = "Tell us about yourself in at least 20 characters"))]
    pub about: String,
}

/// The three documents every verification request carries.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationUploads {
    pub id_proof: Upload,
    pub certificate: Upload,
    pub resume: Upload,
}

/// A complete verification request. It can only be built from validated
/// details plus all three documents, so a partial request is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSubmission {
    details: VerificationDetails,
    uploads: VerificationUploads,
}

impl VerificationSubmission {
    pub fn new(
        details: VerificationDetails,
        uploads: VerificationUploads,
    ) -> Result<Self, ValidationErrors> {
        details.validate()?;
        Ok(VerificationSubmission { details, uploads })
    }

    pub fn details(&self) -> &VerificationDetails {
        &self.details
    }

    pub fn into_parts(self) -> Vec<FormPart> {
        let VerificationSubmission { details, uploads } = self;
        vec![
            FormPart::text("qualification", details.qualification),
            FormPart::text("specialisation", details.specialisation),
            FormPart::text("experience", details.experience.to_string()),
            FormPart::text("about", details.about),
            FormPart::file("idProof", uploads.id_proof),
            FormPart::file("certificate", uploads.certificate),
            FormPart::file("resume", uploads.resume),
        ]
    }
}
