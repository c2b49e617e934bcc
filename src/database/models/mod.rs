pub mod claim;
pub mod employee;
pub(crate) mod macros;
pub mod payroll;
pub mod tenant;
pub mod wage;

pub use claim::{AutoDecisionReason, Claim, ClaimStatus, ClaimSubmission};
pub use employee::{
    CreateEmployeeInput, EmployeeSnapshot, EmploymentStatus, EmploymentType, EpfContributionType,
};
pub use payroll::{
    DeductionsBreakdown, EarningsBreakdown, EmployeeIdentity, EmployerContributions, ItemDraft,
    ItemStatus, ItemWarning, PayTotals, PayrollItem, PayrollRun, RunStatus, RunSummary,
};
pub use tenant::{GroupingMode, Tenant, TenantConfig};
pub use wage::{Period, WageComponents, WageOverrides};
