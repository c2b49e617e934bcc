//! Monthly tax withholding (PCB) resolution.
//!
//! The schedule itself is not computed here: tenants supply a precomputed
//! amount on the period's wage components, typically from their tax agent
//! or an external PCB calculator. Absent a supplied value the withholding
//! is zero.

use bigdecimal::BigDecimal;

use crate::database::models::WageComponents;
use crate::error::PayrollError;
use crate::money;

pub fn resolve(components: &WageComponents) -> Result<BigDecimal, PayrollError> {
    match &components.pcb {
        Some(amount) => {
            if money::is_negative(amount) {
                return Err(PayrollError::InvalidWageInput(format!(
                    "pcb must not be negative, got {amount}"
                )));
            }
            Ok(money::round2(amount))
        }
        None => Ok(money::zero()),
    }
}
