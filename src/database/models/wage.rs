use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money;

/// One employee's raw period activity: everything the assemblers need to
/// produce a payslip. `basic` and `fixed_allowance` fall back to the
/// employee snapshot defaults when absent; `ot_amount` and `ph_pay` are
/// derived from hours/days and snapshot rates when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WageComponents {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub year: i64,
    pub month: i64,
    pub basic: Option<BigDecimal>,
    pub fixed_allowance: Option<BigDecimal>,
    pub ot_hours: BigDecimal,
    pub ot_amount: Option<BigDecimal>,
    pub ph_days_worked: BigDecimal,
    pub ph_pay: Option<BigDecimal>,
    pub commission: BigDecimal,
    pub trade_commission: BigDecimal,
    pub incentive: BigDecimal,
    pub outstation: BigDecimal,
    pub bonus: BigDecimal,
    pub unpaid_leave_days: BigDecimal,
    /// Precomputed monthly tax withholding supplied by the tenant.
    pub pcb: Option<BigDecimal>,
    pub advance_repayment: BigDecimal,
    pub other_deductions: BigDecimal,
    pub other_deductions_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WageComponents {
    /// A quiet month: no activity recorded, everything comes from the
    /// employee snapshot defaults.
    pub fn empty(tenant_id: Uuid, employee_id: Uuid, year: i64, month: i64) -> Self {
        let now = Utc::now();
        WageComponents {
            id: Uuid::new_v4(),
            tenant_id,
            employee_id,
            year,
            month,
            basic: None,
            fixed_allowance: None,
            ot_hours: money::zero(),
            ot_amount: None,
            ph_days_worked: money::zero(),
            ph_pay: None,
            commission: money::zero(),
            trade_commission: money::zero(),
            incentive: money::zero(),
            outstation: money::zero(),
            bonus: money::zero(),
            unpaid_leave_days: money::zero(),
            pcb: None,
            advance_repayment: money::zero(),
            other_deductions: money::zero(),
            other_deductions_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_overrides(&mut self, overrides: &WageOverrides) {
        if let Some(v) = &overrides.basic {
            self.basic = Some(v.clone());
        }
        if let Some(v) = &overrides.fixed_allowance {
            self.fixed_allowance = Some(v.clone());
        }
        if let Some(v) = &overrides.ot_hours {
            self.ot_hours = v.clone();
            self.ot_amount = None;
        }
        if let Some(v) = &overrides.ot_amount {
            self.ot_amount = Some(v.clone());
        }
        if let Some(v) = &overrides.ph_days_worked {
            self.ph_days_worked = v.clone();
            self.ph_pay = None;
        }
        if let Some(v) = &overrides.ph_pay {
            self.ph_pay = Some(v.clone());
        }
        if let Some(v) = &overrides.commission {
            self.commission = v.clone();
        }
        if let Some(v) = &overrides.trade_commission {
            self.trade_commission = v.clone();
        }
        if let Some(v) = &overrides.incentive {
            self.incentive = v.clone();
        }
        if let Some(v) = &overrides.outstation {
            self.outstation = v.clone();
        }
        if let Some(v) = &overrides.bonus {
            self.bonus = v.clone();
        }
        if let Some(v) = &overrides.unpaid_leave_days {
            self.unpaid_leave_days = v.clone();
        }
        if let Some(v) = &overrides.pcb {
            self.pcb = Some(v.clone());
        }
        if let Some(v) = &overrides.advance_repayment {
            self.advance_repayment = v.clone();
        }
        if let Some(v) = &overrides.other_deductions {
            self.other_deductions = v.clone();
        }
        if let Some(v) = &overrides.other_deductions_note {
            self.other_deductions_note = Some(v.clone());
        }
    }
}

/// Partial edits applied to a single draft item's raw inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WageOverrides {
    pub basic: Option<BigDecimal>,
    pub fixed_allowance: Option<BigDecimal>,
    pub ot_hours: Option<BigDecimal>,
    pub ot_amount: Option<BigDecimal>,
    pub ph_days_worked: Option<BigDecimal>,
    pub ph_pay: Option<BigDecimal>,
    pub commission: Option<BigDecimal>,
    pub trade_commission: Option<BigDecimal>,
    pub incentive: Option<BigDecimal>,
    pub outstation: Option<BigDecimal>,
    pub bonus: Option<BigDecimal>,
    pub unpaid_leave_days: Option<BigDecimal>,
    pub pcb: Option<BigDecimal>,
    pub advance_repayment: Option<BigDecimal>,
    pub other_deductions: Option<BigDecimal>,
    pub other_deductions_note: Option<String>,
}

/// Tenant-local calendar month. Months are 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i64,
    pub month: i64,
}

impl Period {
    pub fn new(year: i64, month: i64) -> Self {
        Period { year, month }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    }

    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        Period::new(next_year, next_month)
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 31).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_period_bounds() {
        let p = Period::new(2024, 2);
        assert_eq!(p.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(p.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let december = Period::new(2024, 12);
        assert_eq!(
            december.last_day(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }
}
