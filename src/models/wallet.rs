use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    #[serde(alias = "_id")]
    pub id: String,
    pub amount: f64,
    #[serde(alias = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub pending_payout: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub transactions: Vec<WalletTransaction>,
}

fn default_currency() -> String {
    "INR".to_string()
}
