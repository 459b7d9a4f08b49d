use crate::targ3t::Target;

/// Errors that stop a compilation.
///
/// These travel through `anyhow::Result`; callers that need to react to a
/// specific failure can `downcast_ref::<CompileError>()`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CompileError {
    #[error("syntax error:\n{message}")]
    Syntax { message: String },
    #[error("unknown construct: {kind}")]
    UnknownConstruct { kind: String },
    #[error("{target} supports at most {limit} bindings per stage, but the kernel needs {requested}")]
    BindingLimitExceeded {
        target: Target,
        requested: u32,
        limit: u32,
    },
}
