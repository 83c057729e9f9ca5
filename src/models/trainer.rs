use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::VerificationStatus;
use crate::utils::validation::{Base64Upload, validate_phone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainerProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub verification_status: Option<VerificationStatus>,
}

/// Profile edit form; the image is optional.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateInput {
    #[validate(length(min = 2, max = 80, message = "Name must be 2-80 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "phone_number")]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<Base64Upload>,
}

fn phone_number(phone: &str) -> Result<(), ValidationError> {
    if validate_phone(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Enter a valid phone number".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_is_checked_only_when_present() {
        let mut input = ProfileUpdateInput {
            name: "Meera".to_string(),
            phone: None,
            bio: None,
            image: None,
        };
        assert!(input.validate().is_ok());

        input.phone = Some("call me".to_string());
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
    }
}
