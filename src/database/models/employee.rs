use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

/// Point-in-time view of an employee record. The payroll core only ever
/// reads this; identity and compensation fields are copied onto payroll
/// items so later edits never reach a finalized payslip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSnapshot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub nric: Option<String>,
    /// Department or outlet name, per the tenant's grouping mode.
    pub group_name: Option<String>,
    pub employment_type: EmploymentType,
    pub employment_status: EmploymentStatus,
    pub basic: BigDecimal,
    pub fixed_allowance: BigDecimal,
    pub hourly_rate: Option<BigDecimal>,
    pub daily_rate: Option<BigDecimal>,
    pub overtime_rate: Option<BigDecimal>,
    pub ph_rate: Option<BigDecimal>,
    pub commission_rate: Option<BigDecimal>,
    pub epf_no: Option<String>,
    pub socso_no: Option<String>,
    pub tax_no: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub epf_contribution_type: EpfContributionType,
    pub employee_epf_rate: BigDecimal,
    pub join_date: Option<NaiveDate>,
    pub last_working_day: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeSnapshot {
    /// Employees still on payroll for the period. Resigned and inactive
    /// records are excluded from run materialization.
    pub fn is_payable(&self) -> bool {
        matches!(
            self.employment_status,
            EmploymentStatus::Active | EmploymentStatus::Notice | EmploymentStatus::Clearing
        )
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum EmploymentType {
        Probation => "probation",
        Confirmed => "confirmed",
        Contract => "contract",
        Resigned => "resigned",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum EmploymentStatus {
        Active => "active",
        Notice => "notice",
        Clearing => "clearing",
        Resigned => "resigned",
        Inactive => "inactive",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub enum EpfContributionType {
        Standard => "standard",
        Foreign => "foreign",
        Exempt => "exempt",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeInput {
    pub tenant_id: Uuid,
    pub name: String,
    pub nric: Option<String>,
    pub group_name: Option<String>,
    pub employment_type: EmploymentType,
    pub basic: BigDecimal,
    pub fixed_allowance: BigDecimal,
    pub hourly_rate: Option<BigDecimal>,
    pub daily_rate: Option<BigDecimal>,
    pub overtime_rate: Option<BigDecimal>,
    pub ph_rate: Option<BigDecimal>,
    pub commission_rate: Option<BigDecimal>,
    pub epf_no: Option<String>,
    pub socso_no: Option<String>,
    pub tax_no: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub epf_contribution_type: EpfContributionType,
    pub employee_epf_rate: Option<BigDecimal>,
    pub join_date: Option<NaiveDate>,
}
