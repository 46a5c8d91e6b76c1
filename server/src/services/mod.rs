//! Business logic services for the oracle relay

pub mod dispatcher;
pub mod flight_status;
pub mod oracle_registry;
pub mod response_submitter;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use flight_status::FlightStatusCell;
pub use oracle_registry::{OracleRegistry, RegistryError, RegistrySettings};
pub use response_submitter::{ResponseSubmitter, SubmissionOutcome};
