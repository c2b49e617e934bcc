use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::money;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum RunStatus {
        Draft => "draft",
        Finalized => "finalized",
        Approved => "approved",
    }
}

impl RunStatus {
    /// draft -> finalized -> approved, no back-transitions.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Draft, RunStatus::Finalized) | (RunStatus::Finalized, RunStatus::Approved)
        )
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum ItemStatus {
        Ok => "ok",
        Error => "error",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum ItemWarning {
        NegativeNetPay => "negative_net_pay",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRun {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub year: i64,
    pub month: i64,
    /// None covers the whole tenant; otherwise a department/outlet name.
    pub group_scope: Option<String>,
    pub status: RunStatus,
    pub tenant_tz: String,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Identity fields copied from the employee snapshot onto the item, so a
/// finalized payslip never joins back to the live employee row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeIdentity {
    pub employee_name: String,
    pub nric: Option<String>,
    pub group_name: Option<String>,
    pub epf_no: Option<String>,
    pub socso_no: Option<String>,
    pub tax_no: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsBreakdown {
    pub basic: BigDecimal,
    pub fixed_allowance: BigDecimal,
    pub ot_amount: BigDecimal,
    pub ph_pay: BigDecimal,
    pub commission: BigDecimal,
    pub trade_commission: BigDecimal,
    pub incentive: BigDecimal,
    pub outstation: BigDecimal,
    pub claims_amount: BigDecimal,
    pub bonus: BigDecimal,
}

impl EarningsBreakdown {
    pub fn gross(&self) -> BigDecimal {
        money::round2(
            &(&self.basic
                + &self.fixed_allowance
                + &self.ot_amount
                + &self.ph_pay
                + &self.commission
                + &self.trade_commission
                + &self.incentive
                + &self.outstation
                + &self.claims_amount
                + &self.bonus),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionsBreakdown {
    pub epf_employee: BigDecimal,
    pub socso_employee: BigDecimal,
    pub eis_employee: BigDecimal,
    pub pcb: BigDecimal,
    pub unpaid_leave_days: BigDecimal,
    pub unpaid_leave_amount: BigDecimal,
    pub advance_repayment: BigDecimal,
    pub other_deductions: BigDecimal,
    pub other_deductions_note: Option<String>,
}

impl DeductionsBreakdown {
    pub fn total(&self) -> BigDecimal {
        money::round2(
            &(&self.epf_employee
                + &self.socso_employee
                + &self.eis_employee
                + &self.pcb
                + &self.unpaid_leave_amount
                + &self.advance_repayment
                + &self.other_deductions),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerContributions {
    pub epf_employer: BigDecimal,
    pub socso_employer: BigDecimal,
    pub eis_employer: BigDecimal,
    /// EPF detail kept for statutory submissions.
    pub epf_base: BigDecimal,
    pub epf_rounded_base: BigDecimal,
}

impl EmployerContributions {
    pub fn total(&self) -> BigDecimal {
        money::round2(&(&self.epf_employer + &self.socso_employer + &self.eis_employer))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayTotals {
    pub gross: BigDecimal,
    pub total_deductions: BigDecimal,
    pub net: BigDecimal,
    pub employer_cost: BigDecimal,
}

/// One employee's snapshotted payslip within a run. Immutable once the
/// owning run is finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollItem {
    pub id: Uuid,
    pub run_id: Uuid,
    pub employee_id: Uuid,
    pub status: ItemStatus,
    pub error_message: Option<String>,
    pub identity: EmployeeIdentity,
    pub earnings: EarningsBreakdown,
    pub deductions: DeductionsBreakdown,
    pub employer: EmployerContributions,
    pub totals: PayTotals,
    /// Approved claims folded into `claims_amount`, consumed at finalize.
    pub claim_ids: Vec<Uuid>,
    pub warnings: Vec<ItemWarning>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Builder output: everything a payroll item holds except storage identity.
/// Ids and timestamps are assigned at persist time, which keeps the builder
/// deterministic for identical inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub employee_id: Uuid,
    pub identity: EmployeeIdentity,
    pub earnings: EarningsBreakdown,
    pub deductions: DeductionsBreakdown,
    pub employer: EmployerContributions,
    pub totals: PayTotals,
    pub claim_ids: Vec<Uuid>,
    pub warnings: Vec<ItemWarning>,
}

/// Run-level roll-up for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub item_count: i64,
    pub error_count: i64,
    pub warning_count: i64,
    pub gross_total: BigDecimal,
    pub net_total: BigDecimal,
    pub employer_cost_total: BigDecimal,
}
