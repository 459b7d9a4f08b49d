//! Intermediate representation (IR) for the compiler.
//!
//! The transformer lowers the generic [ast](crate::ast) into a
//! [ShaderProgram]: an arena of typed [Node]s plus the [Scopes] that were
//! built while walking it. Code generators only read this tree.

mod arena;
mod node;
mod scope;
mod typ;

pub use arena::Arena;
pub use arena::Handle;
pub use node::Node;
pub use node::NodeId;
pub use node::NodeKind;
pub use node::Param;
pub use node::ShaderProgram;
pub use scope::Scope;
pub use scope::ScopeEntry;
pub use scope::ScopeId;
pub use scope::ScopeKind;
pub use scope::Scopes;
pub use scope::Symbol;
pub use typ::compare_data_type_priority;
pub use typ::Builtin;
pub use typ::DataType;
pub use typ::ScalarKind;
pub use typ::StorageClass;

pub fn spaces(indent: i32) -> String {
    "  ".repeat(indent as usize)
}

/// Render a float so that it always carries a decimal point (`10.0`, `0.5`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[test]
fn test_format_float() {
    assert_eq!(format_float(10.0), "10.0");
    assert_eq!(format_float(-2.0), "-2.0");
    assert_eq!(format_float(0.25), "0.25");
    assert_eq!(spaces(2), "    ");
}
