//! Earnings assembly: raw period activity into the earnings vector stored
//! on the payroll item.

use bigdecimal::BigDecimal;

use crate::database::models::{EarningsBreakdown, EmployeeSnapshot, WageComponents};
use crate::error::PayrollError;
use crate::money;

/// Normalize the raw components into the earnings breakdown.
///
/// Overtime and public-holiday pay are taken as given when supplied,
/// otherwise derived from hours/days and the snapshot rates. The claims
/// total is the caller's sum of approved, unconsumed claims for the
/// period window.
pub fn assemble(
    components: &WageComponents,
    snapshot: &EmployeeSnapshot,
    claims_total: &BigDecimal,
) -> Result<EarningsBreakdown, PayrollError> {
    let basic = components
        .basic
        .clone()
        .unwrap_or_else(|| snapshot.basic.clone());
    let fixed_allowance = components
        .fixed_allowance
        .clone()
        .unwrap_or_else(|| snapshot.fixed_allowance.clone());

    let ot_amount = match &components.ot_amount {
        Some(amount) => amount.clone(),
        None => derive_pay(&components.ot_hours, snapshot.overtime_rate.as_ref()),
    };
    let ph_pay = match &components.ph_pay {
        Some(amount) => amount.clone(),
        None => derive_pay(&components.ph_days_worked, snapshot.ph_rate.as_ref()),
    };

    let earnings = EarningsBreakdown {
        basic,
        fixed_allowance,
        ot_amount,
        ph_pay,
        commission: components.commission.clone(),
        trade_commission: components.trade_commission.clone(),
        incentive: components.incentive.clone(),
        outstation: components.outstation.clone(),
        claims_amount: claims_total.clone(),
        bonus: components.bonus.clone(),
    };

    validate_non_negative("basic", &earnings.basic)?;
    validate_non_negative("fixedAllowance", &earnings.fixed_allowance)?;
    validate_non_negative("otAmount", &earnings.ot_amount)?;
    validate_non_negative("phPay", &earnings.ph_pay)?;
    validate_non_negative("commission", &earnings.commission)?;
    validate_non_negative("tradeCommission", &earnings.trade_commission)?;
    validate_non_negative("incentive", &earnings.incentive)?;
    validate_non_negative("outstation", &earnings.outstation)?;
    validate_non_negative("claimsAmount", &earnings.claims_amount)?;
    validate_non_negative("bonus", &earnings.bonus)?;
    validate_non_negative("unpaidLeaveDays", &components.unpaid_leave_days)?;

    Ok(earnings)
}

fn derive_pay(units: &BigDecimal, rate: Option<&BigDecimal>) -> BigDecimal {
    match rate {
        Some(rate) => money::round2(&(units * rate)),
        None => money::zero(),
    }
}

fn validate_non_negative(field: &str, value: &BigDecimal) -> Result<(), PayrollError> {
    if money::is_negative(value) {
        return Err(PayrollError::InvalidWageInput(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{
        EmploymentStatus, EmploymentType, EpfContributionType,
    };
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn snapshot() -> EmployeeSnapshot {
        let now = Utc::now();
        EmployeeSnapshot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Aminah binti Hassan".to_string(),
            nric: None,
            group_name: Some("Kitchen".to_string()),
            employment_type: EmploymentType::Confirmed,
            employment_status: EmploymentStatus::Active,
            basic: dec("3000"),
            fixed_allowance: dec("500"),
            hourly_rate: None,
            daily_rate: None,
            overtime_rate: Some(dec("12.50")),
            ph_rate: Some(dec("150")),
            commission_rate: None,
            epf_no: None,
            socso_no: None,
            tax_no: None,
            bank_name: None,
            bank_account: None,
            epf_contribution_type: EpfContributionType::Standard,
            employee_epf_rate: dec("0.1100"),
            join_date: None,
            last_working_day: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn empty_components(snapshot: &EmployeeSnapshot) -> WageComponents {
        WageComponents::empty(snapshot.tenant_id, snapshot.id, 2024, 6)
    }

    #[test]
    fn test_defaults_come_from_snapshot() {
        let snapshot = snapshot();
        let components = empty_components(&snapshot);

        let earnings = assemble(&components, &snapshot, &money::zero()).unwrap();

        assert_eq!(earnings.basic, dec("3000"));
        assert_eq!(earnings.fixed_allowance, dec("500"));
        assert_eq!(earnings.ot_amount, dec("0.00"));
        assert_eq!(earnings.gross(), dec("3500.00"));
    }

    #[test]
    fn test_overtime_derived_from_hours() {
        let snapshot = snapshot();
        let mut components = empty_components(&snapshot);
        components.ot_hours = dec("10.5");

        let earnings = assemble(&components, &snapshot, &money::zero()).unwrap();
        // 10.5h x 12.50
        assert_eq!(earnings.ot_amount, dec("131.25"));
    }

    #[test]
    fn test_supplied_overtime_wins_over_derivation() {
        let snapshot = snapshot();
        let mut components = empty_components(&snapshot);
        components.ot_hours = dec("10");
        components.ot_amount = Some(dec("200"));

        let earnings = assemble(&components, &snapshot, &money::zero()).unwrap();
        assert_eq!(earnings.ot_amount, dec("200"));
    }

    #[test]
    fn test_ph_pay_derived_from_days() {
        let snapshot = snapshot();
        let mut components = empty_components(&snapshot);
        components.ph_days_worked = dec("2");

        let earnings = assemble(&components, &snapshot, &money::zero()).unwrap();
        assert_eq!(earnings.ph_pay, dec("300.00"));
    }

    #[test]
    fn test_claims_total_lands_in_gross() {
        let snapshot = snapshot();
        let components = empty_components(&snapshot);

        let earnings = assemble(&components, &snapshot, &dec("85.40")).unwrap();
        assert_eq!(earnings.claims_amount, dec("85.40"));
        assert_eq!(earnings.gross(), dec("3585.40"));
    }

    #[test]
    fn test_negative_component_rejected() {
        let snapshot = snapshot();
        let mut components = empty_components(&snapshot);
        components.commission = dec("-10");

        assert!(matches!(
            assemble(&components, &snapshot, &money::zero()).unwrap_err(),
            PayrollError::InvalidWageInput(_)
        ));
    }

    #[test]
    fn test_missing_rate_means_zero_derived_pay() {
        let mut snapshot = snapshot();
        snapshot.overtime_rate = None;
        let mut components = empty_components(&snapshot);
        components.ot_hours = dec("8");

        let earnings = assemble(&components, &snapshot, &money::zero()).unwrap();
        assert_eq!(earnings.ot_amount, dec("0.00"));
    }
}
