//! Pieces shared by the GLSL dialects.

use crate::context::CompileContext;
use crate::ir::spaces;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::targ3t::CodeGenerator;

/// GLSL spelling of `typ`. Without `unsigned`, unsigned types map onto their
/// signed counterparts.
pub(super) fn type_name(typ: DataType, unsigned: bool) -> String {
    use DataType::*;
    let typ = match typ {
        Uint32 if !unsigned => Int32,
        Vector2Uint if !unsigned => Vector2Int,
        Vector3Uint if !unsigned => Vector3Int,
        Vector4Uint if !unsigned => Vector4Int,
        FloatArray => Float,
        Vector4FloatArray => Vector4Float,
        other => other,
    };
    typ.to_string()
}

pub(super) fn defines<G: CodeGenerator + ?Sized>(generator: &G, context: &CompileContext) -> Vec<String> {
    context
        .defines
        .iter()
        .map(|d| format!("#define {} {}", d.name, generator.define_value(d)))
        .collect()
}

/// Workgroup arrays, declared as plain globals when `qualifier` is empty.
pub(super) fn shared_arrays<G: CodeGenerator + ?Sized>(
    generator: &G,
    context: &CompileContext,
    qualifier: &str,
) -> Vec<String> {
    context
        .global_declarations
        .iter()
        .filter(|g| g.shared)
        .map(|g| {
            let typ = generator.type_name(g.typ.component());
            format!("{qualifier}{typ} {}[{}];", g.name, g.length)
        })
        .collect()
}

/// Global variables holding the built-ins, assigned in the entry prologue.
pub(super) fn builtin_globals<G: CodeGenerator + ?Sized>(generator: &G, builtins: &[Builtin]) -> Vec<String> {
    builtins
        .iter()
        .map(|b| format!("{} {};", generator.type_name(b.data_type()), b.name()))
        .collect()
}

/// `name = value;` for each built-in, indented.
pub(super) fn assignments(values: &[(Builtin, String)], indent: i32) -> Vec<String> {
    values
        .iter()
        .map(|(b, value)| format!("{}{} = {value};", spaces(indent), b.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(DataType::Vector3Uint, true), "uvec3");
        assert_eq!(type_name(DataType::Vector3Uint, false), "ivec3");
        assert_eq!(type_name(DataType::Uint32, false), "int");
        assert_eq!(type_name(DataType::FloatArray, true), "float");
        assert_eq!(type_name(DataType::Matrix4x4Float, false), "mat4");
    }
}
