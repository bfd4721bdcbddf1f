mod error;
#[allow(clippy::module_inception)]
mod executor;
pub mod job_manager;

pub use error::ExecError;
pub use executor::{Executor, LineStatus};
