//! Front end: turns kernel source into the generic [ast](crate::ast).

mod parser;
mod scanner;
mod token;

use crate::ast::Program;
use anyhow::Result;

pub use parser::Parser;
pub use scanner::Scanner;
pub use token::Location;
pub use token::Token;
pub use token::TokenKind;

/// Interface to plug a parser into the [Compiler](crate::Compiler).
///
/// The compiler only relies on the generic tree that comes out. Invalid
/// syntax must be reported as [CompileError::Syntax](crate::CompileError).
pub trait Frontend {
    /// Preprocess the source before parsing.
    fn preprocess(src: &str) -> String {
        src.to_string()
    }
    fn parse(src: &str) -> Result<Program>;
}

/// Default front end for the TypeScript-flavoured kernel language.
pub struct DefaultFrontend;

impl Frontend for DefaultFrontend {
    fn parse(src: &str) -> Result<Program> {
        let src = Self::preprocess(src);
        Parser::parse(&src)
    }
}
