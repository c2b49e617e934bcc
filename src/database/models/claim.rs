use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub claim_date: NaiveDate,
    pub category: String,
    pub amount: BigDecimal,
    pub receipt_ref: Option<String>,
    pub status: ClaimStatus,
    pub auto_approved: bool,
    pub auto_approval_reason: Option<AutoDecisionReason>,
    pub receipt_hash: Option<String>,
    pub extracted_fields: Option<serde_json::Value>,
    /// Set exactly once, inside the finalize transaction of the consuming run.
    pub consumed_by_payroll_item_id: Option<Uuid>,
    pub decided_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    pub fn is_consumed(&self) -> bool {
        self.consumed_by_payroll_item_id.is_some()
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum ClaimStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum AutoDecisionReason {
        DuplicateReceipt => "duplicate_receipt",
        MealCap => "meal_cap",
        AiVerified => "ai_verified",
    }
}

/// A newly submitted expense claim, before the auto-decision pipeline runs.
/// `receipt_bytes` are the normalized image bytes; the core only digests
/// them, storage of the image itself happens elsewhere.
#[derive(Debug, Clone)]
pub struct ClaimSubmission {
    pub employee_id: Uuid,
    pub claim_date: NaiveDate,
    pub category: String,
    pub amount: BigDecimal,
    pub receipt_ref: Option<String>,
    pub receipt_bytes: Option<Vec<u8>>,
    /// Fields the receipt-verification service extracted, when enabled.
    /// `{"amount": "12.50", "verdict": "auto_approve"}` is the shape the
    /// decision pipeline reads.
    pub extracted_fields: Option<serde_json::Value>,
}
