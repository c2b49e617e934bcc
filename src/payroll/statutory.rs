//! Employee/employer statutory contributions (EPF, SOCSO, EIS) for one
//! month of wages.
//!
//! EPF is the subtle one: only basic + commission + bonus is pensionable,
//! the base is rounded up to the next RM100 band before the rate applies
//! (except for commission-only earners receiving a bonus, who contribute
//! on the raw base), and the employer rate is tiered on the rounded base.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::error::PayrollError;
use crate::money;
use crate::payroll::tables;

#[derive(Debug, Clone, Default)]
pub struct StatutoryInput {
    pub basic: BigDecimal,
    pub commission: BigDecimal,
    pub allowance: BigDecimal,
    pub overtime: BigDecimal,
    pub bonus: BigDecimal,
    /// Defaults to 11% when absent.
    pub employee_epf_rate: Option<BigDecimal>,
    /// Bypasses the employer tier rule when set.
    pub employer_epf_rate_override: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpfResult {
    pub base: BigDecimal,
    pub rounded_base: BigDecimal,
    pub employee: BigDecimal,
    pub employer: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionPair {
    pub employee: BigDecimal,
    pub employer: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatutoryResult {
    pub epf: EpfResult,
    pub socso: ContributionPair,
    pub eis: ContributionPair,
}

impl StatutoryResult {
    /// Combined PERKESO employee deduction (SOCSO + EIS).
    pub fn perkeso(&self) -> BigDecimal {
        money::round2(&(&self.socso.employee + &self.eis.employee))
    }

    pub fn total_employee_deductions(&self) -> BigDecimal {
        money::round2(&(&self.epf.employee + &self.socso.employee + &self.eis.employee))
    }

    pub fn total_employer_contributions(&self) -> BigDecimal {
        money::round2(&(&self.epf.employer + &self.socso.employer + &self.eis.employer))
    }
}

/// Compute EPF, SOCSO and EIS for one month. Pure; negative inputs are
/// rejected with `InvalidWageInput`.
pub fn calculate(input: &StatutoryInput) -> Result<StatutoryResult, PayrollError> {
    validate_non_negative("basic", &input.basic)?;
    validate_non_negative("commission", &input.commission)?;
    validate_non_negative("allowance", &input.allowance)?;
    validate_non_negative("overtime", &input.overtime)?;
    validate_non_negative("bonus", &input.bonus)?;
    if let Some(rate) = &input.employee_epf_rate {
        validate_non_negative("employeeEpfRate", rate)?;
    }
    if let Some(rate) = &input.employer_epf_rate_override {
        validate_non_negative("employerEpfRate", rate)?;
    }

    let epf = calculate_epf(input);

    // SOCSO and EIS contribute on basic + commission only; allowance,
    // overtime and bonus stay outside the insured wage.
    let insured_wage = &input.basic + &input.commission;
    let (socso, eis) = if insured_wage.is_zero() {
        (zero_pair(), zero_pair())
    } else {
        let socso = tables::socso_table().lookup(&insured_wage);
        let eis = tables::eis_table().lookup(&insured_wage);
        (
            ContributionPair {
                employee: socso.employee,
                employer: socso.employer,
            },
            ContributionPair {
                employee: eis.employee,
                employer: eis.employer,
            },
        )
    };

    Ok(StatutoryResult { epf, socso, eis })
}

fn calculate_epf(input: &StatutoryInput) -> EpfResult {
    let base = money::round2(&(&input.basic + &input.commission + &input.bonus));

    // Commission-only earners receiving a bonus contribute on the raw
    // base; everyone else rounds up to the next RM100 band.
    let rounded_base = if input.basic.is_zero() && input.bonus > BigDecimal::zero() {
        base.clone()
    } else {
        money::ceil_to_hundred(&base)
    };

    let employee_rate = input
        .employee_epf_rate
        .clone()
        .unwrap_or_else(tables::default_employee_epf_rate);
    let employer_rate = input
        .employer_epf_rate_override
        .clone()
        .unwrap_or_else(|| tables::employer_epf_rate(&rounded_base));

    // Whole-ringgit rounding, ties away from zero.
    let employee = money::round_ringgit(&(&rounded_base * &employee_rate));
    let employer = money::round_ringgit(&(&rounded_base * &employer_rate));

    EpfResult {
        base,
        rounded_base,
        employee,
        employer,
    }
}

fn zero_pair() -> ContributionPair {
    ContributionPair {
        employee: money::zero(),
        employer: money::zero(),
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
