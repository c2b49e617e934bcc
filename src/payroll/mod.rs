//! The pure computation core: rate tables, statutory contributions and
//! payslip assembly. Nothing in here touches the database.

pub mod builder;
pub mod deductions;
pub mod earnings;
pub mod pcb;
pub mod statutory;
pub mod tables;

pub use builder::build;
pub use statutory::{StatutoryInput, StatutoryResult};
