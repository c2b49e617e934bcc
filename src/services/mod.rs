pub mod claims;
pub mod immutability;
pub mod run_coordinator;

pub use claims::ClaimService;
pub use run_coordinator::{MaterializeOutcome, RunCoordinator};
