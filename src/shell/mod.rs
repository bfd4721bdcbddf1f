pub mod executor;
pub mod parser;
mod readline;
#[allow(clippy::module_inception)]
mod shell;
pub mod signals;

pub use shell::{Shell, SYNTAX_EXIT_CODE};
