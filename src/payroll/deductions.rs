//! Deductions assembly: statutory employee contributions, PCB, unpaid
//! leave, advances and ad-hoc deductions into one vector.

use bigdecimal::BigDecimal;

use crate::database::models::{DeductionsBreakdown, TenantConfig, WageComponents};
use crate::error::PayrollError;
use crate::money;
use crate::payroll::statutory::StatutoryResult;

/// Unpaid leave is prorated against the tenant's working-days divisor:
/// `days x basic / working_days`, rounded to sen.
pub fn unpaid_leave_amount(
    days: &BigDecimal,
    basic: &BigDecimal,
    working_days: i64,
) -> BigDecimal {
    if days == &BigDecimal::from(0) {
        return money::zero();
    }
    money::round2(&(days * basic / BigDecimal::from(working_days)))
}

pub fn assemble(
    components: &WageComponents,
    statutory: &StatutoryResult,
    pcb: BigDecimal,
    basic: &BigDecimal,
    config: &TenantConfig,
) -> Result<DeductionsBreakdown, PayrollError> {
    let working_days = config
        .working_days_per_month
        .filter(|days| *days > 0)
        .ok_or_else(|| PayrollError::ConfigMissing("workingDaysPerMonth".to_string()))?;

    validate_non_negative("advanceRepayment", &components.advance_repayment)?;
    validate_non_negative("otherDeductions", &components.other_deductions)?;

    Ok(DeductionsBreakdown {
        epf_employee: statutory.epf.employee.clone(),
        socso_employee: statutory.socso.employee.clone(),
        eis_employee: statutory.eis.employee.clone(),
        pcb,
        unpaid_leave_days: components.unpaid_leave_days.clone(),
        unpaid_leave_amount: unpaid_leave_amount(
            &components.unpaid_leave_days,
            basic,
            working_days,
        ),
        advance_repayment: components.advance_repayment.clone(),
        other_deductions: components.other_deductions.clone(),
        other_deductions_note: components.other_deductions_note.clone(),
    })
}

fn validate_non_negative(field: &str, value: &BigDecimal) -> Result<(), PayrollError> {
    if money::is_negative(value) {
        return Err(PayrollError::InvalidWageInput(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}
