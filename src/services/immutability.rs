//! Write-path guard for finalized runs.
//!
//! Every mutation of a run or its items goes through `ensure_mutable`
//! first. Items additionally carry their own copies of employee fields,
//! so even a bypassed guard could not make a historical payslip track
//! later employee edits.

use crate::database::models::{PayrollRun, RunStatus};
use crate::error::PayrollError;

pub fn ensure_mutable(run: &PayrollRun) -> Result<(), PayrollError> {
    match run.status {
        RunStatus::Draft => Ok(()),
        RunStatus::Finalized | RunStatus::Approved => {
            Err(PayrollError::FinalizedRunImmutable(run.id))
        }
    }
}
