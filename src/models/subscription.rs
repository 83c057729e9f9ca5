use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::StatusFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Inactive,
}

impl PlanStatus {
    pub fn toggled(self) -> Self {
        match self {
            PlanStatus::Active => PlanStatus::Inactive,
            PlanStatus::Inactive => PlanStatus::Active,
        }
    }

    pub fn applied_verb(self) -> &'static str {
        match self {
            PlanStatus::Active => "activated",
            PlanStatus::Inactive => "deactivated",
        }
    }
}

impl StatusFilter for PlanStatus {
    const ALL: &'static [Self] = &[PlanStatus::Active, PlanStatus::Inactive];

    fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    #[serde(alias = "_id")]
    pub id: String,
    pub plan_name: String,
    pub price: f64,
    #[serde(default)]
    pub duration_months: Option<u32>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: PlanStatus,
}

/// Create/edit form for a plan.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_duration"))]
pub struct PlanInput {
    #[validate(length(min = 3, max = 60, message = "Plan name must be 3-60 characters"))]
    pub plan_name: String,
    #[validate(range(min = 1.0, message = "Price must be at least 1"))]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 36, message = "Duration must be 1-36 months"))]
    pub duration_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 1095, message = "Duration must be 1-1095 days"))]
    pub duration_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

fn validate_duration(input: &PlanInput) -> Result<(), ValidationError> {
    if input.duration_months.is_none() && input.duration_days.is_none() {
        let mut err = ValidationError::new("duration_required");
        err.message = Some("Set a duration in months or days".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct UpdatePlanStatusDto {
    pub status: PlanStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> PlanInput {
        PlanInput {
            plan_name: "Pro Monthly".to_string(),
            price: 49.0,
            duration_months: Some(1),
            duration_days: None,
            description: None,
        }
    }

    #[test]
    fn valid_plan_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn plan_needs_a_duration_and_a_name() {
        let mut plan = input();
        plan.duration_months = None;
        plan.plan_name = "P".to_string();
        let errors = plan.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("plan_name"));
        assert!(fields.contains_key("__all__"));
    }

    #[test]
    fn plan_payload_omits_unset_fields() {
        let body = serde_json::to_value(input()).unwrap();
        assert_eq!(
            body,
            json!({"planName": "Pro Monthly", "price": 49.0, "durationMonths": 1})
        );
    }

    #[test]
    fn status_wire_values() {
        let dto = UpdatePlanStatusDto { status: PlanStatus::Active.toggled() };
        assert_eq!(serde_json::to_value(dto).unwrap(), json!({"status": "inactive"}));
    }
}
