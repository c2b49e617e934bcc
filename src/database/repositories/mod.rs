pub mod claim;
pub mod employee;
pub mod payroll_item;
pub mod payroll_run;
pub mod tenant;
pub mod wage;

pub use claim::ClaimRepository;
pub use employee::EmployeeRepository;
pub use payroll_item::PayrollItemRepository;
pub use payroll_run::PayrollRunRepository;
pub use tenant::TenantRepository;
pub use wage::WageComponentsRepository;
