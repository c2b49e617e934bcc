//! Payroll item assembly: one employee's period activity, snapshot and
//! tenant policy into a complete, deterministic payslip draft.

use bigdecimal::BigDecimal;

use crate::database::models::{
    Claim, EmployeeIdentity, EmployeeSnapshot, EmployerContributions, EpfContributionType,
    ItemDraft, ItemWarning, PayTotals, TenantConfig, WageComponents,
};
use crate::error::PayrollError;
use crate::money;
use crate::payroll::{deductions, earnings, pcb, statutory};

/// Build the payslip draft for one employee. Pure: identical inputs
/// produce identical output, which is what makes finalized items safe to
/// snapshot.
pub fn build(
    components: &WageComponents,
    snapshot: &EmployeeSnapshot,
    config: &TenantConfig,
    claims: &[Claim],
) -> Result<ItemDraft, PayrollError> {
    let claims_total = claims
        .iter()
        .fold(money::zero(), |acc, claim| acc + &claim.amount);

    let earnings = earnings::assemble(components, snapshot, &claims_total)?;

    // Trade commission reaches the statutory base only when the tenant
    // opted in; the default keeps it out.
    let statutory_commission = if config.include_trade_commission_in_statutory {
        money::round2(&(&earnings.commission + &earnings.trade_commission))
    } else {
        earnings.commission.clone()
    };

    let statutory_input = statutory::StatutoryInput {
        basic: earnings.basic.clone(),
        commission: statutory_commission,
        allowance: earnings.fixed_allowance.clone(),
        overtime: earnings.ot_amount.clone(),
        bonus: earnings.bonus.clone(),
        employee_epf_rate: epf_rate_for(snapshot),
        employer_epf_rate_override: employer_override_for(snapshot),
    };
    let statutory = statutory::calculate(&statutory_input)?;

    let pcb_amount = pcb::resolve(components)?;
    let deductions = deductions::assemble(
        components,
        &statutory,
        pcb_amount,
        &earnings.basic,
        config,
    )?;

    let gross = earnings.gross();
    let total_deductions = deductions.total();
    let net = money::round2(&(&gross - &total_deductions));

    let employer = EmployerContributions {
        epf_employer: statutory.epf.employer.clone(),
        socso_employer: statutory.socso.employer.clone(),
        eis_employer: statutory.eis.employer.clone(),
        epf_base: statutory.epf.base.clone(),
        epf_rounded_base: statutory.epf.rounded_base.clone(),
    };
    let employer_cost = money::round2(&(&gross + &employer.total()));

    let mut warnings = Vec::new();
    if money::is_negative(&net) {
        warnings.push(ItemWarning::NegativeNetPay);
    }

    Ok(ItemDraft {
        employee_id: snapshot.id,
        identity: identity_of(snapshot),
        earnings,
        deductions,
        employer,
        totals: PayTotals {
            gross,
            total_deductions,
            net,
            employer_cost,
        },
        claim_ids: claims.iter().map(|claim| claim.id).collect(),
        warnings,
    })
}

/// EPF-exempt employees contribute nothing on either side; everyone else
/// uses their configured rate.
fn epf_rate_for(snapshot: &EmployeeSnapshot) -> Option<BigDecimal> {
    match snapshot.epf_contribution_type {
        EpfContributionType::Exempt => Some(money::zero()),
        _ => Some(snapshot.employee_epf_rate.clone()),
    }
}

fn employer_override_for(snapshot: &EmployeeSnapshot) -> Option<BigDecimal> {
    match snapshot.epf_contribution_type {
        EpfContributionType::Exempt => Some(money::zero()),
        _ => None,
    }
}

fn identity_of(snapshot: &EmployeeSnapshot) -> EmployeeIdentity {
    EmployeeIdentity {
        employee_name: snapshot.name.clone(),
        nric: snapshot.nric.clone(),
        group_name: snapshot.group_name.clone(),
        epf_no: snapshot.epf_no.clone(),
        socso_no: snapshot.socso_no.clone(),
        tax_no: snapshot.tax_no.clone(),
        bank_name: snapshot.bank_name.clone(),
        bank_account: snapshot.bank_account.clone(),
    }
}
