pub mod ast;
mod error;
pub mod lexer;
#[allow(clippy::module_inception)]
mod parser;

pub use error::ParseError;
pub use parser::{parse, Parser, MAXARGS};
