use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;

/// The closed set of types a kernel can use.
///
/// Declaration order matches [DataType::priority] so that the derived
/// ordering and the priority table never disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Void,
    Float,
    Int32,
    Uint32,
    Boolean,
    Vector2Float,
    Vector3Float,
    Vector4Float,
    Vector2Int,
    Vector3Int,
    Vector4Int,
    Vector2Uint,
    Vector3Uint,
    Vector4Uint,
    Vector2Boolean,
    Vector3Boolean,
    Vector4Boolean,
    Matrix3x3Float,
    Matrix4x4Float,
    FloatArray,
    Vector4FloatArray,
}

/// The component kind of a scalar, vector or matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
    Boolean,
}

impl DataType {
    /// Position in the promotion table; the higher one wins in a mixed
    /// binary operation.
    pub fn priority(self) -> u8 {
        self as u8
    }
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            DataType::Float | DataType::Int32 | DataType::Uint32 | DataType::Boolean
        )
    }
    pub fn is_vector(self) -> bool {
        self.vector_width().is_some()
    }
    pub fn is_matrix(self) -> bool {
        matches!(self, DataType::Matrix3x3Float | DataType::Matrix4x4Float)
    }
    pub fn is_array(self) -> bool {
        matches!(self, DataType::FloatArray | DataType::Vector4FloatArray)
    }
    pub fn is_integer(self) -> bool {
        matches!(self.scalar_kind(), Some(ScalarKind::Int | ScalarKind::Uint))
    }
    /// Number of components of a vector type.
    pub fn vector_width(self) -> Option<usize> {
        use DataType::*;
        match self {
            Vector2Float | Vector2Int | Vector2Uint | Vector2Boolean => Some(2),
            Vector3Float | Vector3Int | Vector3Uint | Vector3Boolean => Some(3),
            Vector4Float | Vector4Int | Vector4Uint | Vector4Boolean => Some(4),
            _ => None,
        }
    }
    pub fn scalar_kind(self) -> Option<ScalarKind> {
        use DataType::*;
        match self {
            Float | Vector2Float | Vector3Float | Vector4Float => Some(ScalarKind::Float),
            Matrix3x3Float | Matrix4x4Float => Some(ScalarKind::Float),
            Int32 | Vector2Int | Vector3Int | Vector4Int => Some(ScalarKind::Int),
            Uint32 | Vector2Uint | Vector3Uint | Vector4Uint => Some(ScalarKind::Uint),
            Boolean | Vector2Boolean | Vector3Boolean | Vector4Boolean => Some(ScalarKind::Boolean),
            FloatArray | Vector4FloatArray => Some(ScalarKind::Float),
            Void => None,
        }
    }
    /// The scalar (width 1) or vector type of the given kind and width.
    ///
    /// Widths outside `1..=4` have no vector type and return `None`.
    pub fn vector(kind: ScalarKind, width: usize) -> Option<DataType> {
        use DataType::*;
        let typ = match (kind, width) {
            (ScalarKind::Float, 1) => Float,
            (ScalarKind::Float, 2) => Vector2Float,
            (ScalarKind::Float, 3) => Vector3Float,
            (ScalarKind::Float, 4) => Vector4Float,
            (ScalarKind::Int, 1) => Int32,
            (ScalarKind::Int, 2) => Vector2Int,
            (ScalarKind::Int, 3) => Vector3Int,
            (ScalarKind::Int, 4) => Vector4Int,
            (ScalarKind::Uint, 1) => Uint32,
            (ScalarKind::Uint, 2) => Vector2Uint,
            (ScalarKind::Uint, 3) => Vector3Uint,
            (ScalarKind::Uint, 4) => Vector4Uint,
            (ScalarKind::Boolean, 1) => Boolean,
            (ScalarKind::Boolean, 2) => Vector2Boolean,
            (ScalarKind::Boolean, 3) => Vector3Boolean,
            (ScalarKind::Boolean, 4) => Vector4Boolean,
            _ => return None,
        };
        Some(typ)
    }
    /// The type of a single component.
    ///
    /// Vectors narrow to their scalar, matrices to a column vector and arrays
    /// to their element type. Scalars are their own component.
    pub fn component(self) -> DataType {
        use DataType::*;
        match self {
            Matrix3x3Float => Vector3Float,
            Matrix4x4Float => Vector4Float,
            FloatArray => Float,
            Vector4FloatArray => Vector4Float,
            Void => Void,
            _ => match self.scalar_kind() {
                Some(kind) => DataType::vector(kind, 1).unwrap_or(Float),
                None => Float,
            },
        }
    }
    /// Number of scalar values a literal of this type holds.
    pub fn scalar_count(self) -> usize {
        match self {
            DataType::Matrix3x3Float => 9,
            DataType::Matrix4x4Float => 16,
            DataType::Void => 0,
            _ => self.vector_width().unwrap_or(1),
        }
    }
    /// Parse a source-level type annotation such as `vec3` or `float[]`.
    pub fn from_annotation(name: &str) -> Option<DataType> {
        use DataType::*;
        let typ = match name.trim() {
            "void" => Void,
            "bool" | "boolean" => Boolean,
            "int" => Int32,
            "uint" => Uint32,
            "float" | "number" => Float,
            "vec2" => Vector2Float,
            "vec3" => Vector3Float,
            "vec4" => Vector4Float,
            "ivec2" => Vector2Int,
            "ivec3" => Vector3Int,
            "ivec4" => Vector4Int,
            "uvec2" => Vector2Uint,
            "uvec3" => Vector3Uint,
            "uvec4" => Vector4Uint,
            "bvec2" => Vector2Boolean,
            "bvec3" => Vector3Boolean,
            "bvec4" => Vector4Boolean,
            "mat3" => Matrix3x3Float,
            "mat4" => Matrix4x4Float,
            "float[]" | "number[]" => FloatArray,
            "vec4[]" => Vector4FloatArray,
            _ => return None,
        };
        Some(typ)
    }
    /// The fixed result type of a type-cast function such as `vec3(...)`.
    pub fn from_cast_function(name: &str) -> Option<DataType> {
        match name {
            "float" | "int" | "uint" | "bool" => DataType::from_annotation(name),
            "void" | "number" | "boolean" => None,
            _ if name.ends_with("[]") => None,
            _ => DataType::from_annotation(name),
        }
    }
}

/// Source-level spelling, which is also the spelling of the cast function.
impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use DataType::*;
        let name = match self {
            Void => "void",
            Float => "float",
            Int32 => "int",
            Uint32 => "uint",
            Boolean => "bool",
            Vector2Float => "vec2",
            Vector3Float => "vec3",
            Vector4Float => "vec4",
            Vector2Int => "ivec2",
            Vector3Int => "ivec3",
            Vector4Int => "ivec4",
            Vector2Uint => "uvec2",
            Vector3Uint => "uvec3",
            Vector4Uint => "uvec4",
            Vector2Boolean => "bvec2",
            Vector3Boolean => "bvec3",
            Vector4Boolean => "bvec4",
            Matrix3x3Float => "mat3",
            Matrix4x4Float => "mat4",
            FloatArray => "float[]",
            Vector4FloatArray => "vec4[]",
        };
        write!(f, "{name}")
    }
}

/// Return the type with the higher priority; ties keep `a`.
pub fn compare_data_type_priority(a: DataType, b: DataType) -> DataType {
    if b.priority() > a.priority() {
        b
    } else {
        a
    }
}

/// The binding category of a declared identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    /// Ordinary local or global variable.
    #[default]
    Private,
    /// Read-only scalar, vector or matrix kernel field.
    Uniform,
    /// Array kernel field.
    StorageBuffer,
    /// Compile-time constant emitted as a define or module constant.
    UniformConstant,
}

/// Compute built-ins that every backend must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    GlobalInvocationId,
    LocalInvocationId,
    WorkGroupId,
    NumWorkGroups,
    WorkGroupSize,
    LocalInvocationIndex,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::GlobalInvocationId,
        Builtin::LocalInvocationId,
        Builtin::WorkGroupId,
        Builtin::NumWorkGroups,
        Builtin::WorkGroupSize,
        Builtin::LocalInvocationIndex,
    ];
    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }
    /// Name under which kernels refer to the built-in.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::GlobalInvocationId => "globalInvocationID",
            Builtin::LocalInvocationId => "localInvocationID",
            Builtin::WorkGroupId => "workGroupID",
            Builtin::NumWorkGroups => "numWorkGroups",
            Builtin::WorkGroupSize => "workGroupSize",
            Builtin::LocalInvocationIndex => "localInvocationIndex",
        }
    }
    pub fn data_type(self) -> DataType {
        match self {
            Builtin::LocalInvocationIndex => DataType::Int32,
            _ => DataType::Vector3Int,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        use DataType::*;
        let order = [
            Void,
            Float,
            Int32,
            Uint32,
            Boolean,
            Vector2Float,
            Vector3Float,
            Vector4Float,
            Vector2Int,
            Vector4Uint,
            Vector4Boolean,
            Matrix3x3Float,
            Matrix4x4Float,
            FloatArray,
            Vector4FloatArray,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].priority() < pair[1].priority(), "{pair:?}");
        }
        assert_eq!(compare_data_type_priority(Float, Int32), Int32);
        assert_eq!(compare_data_type_priority(Int32, Float), Int32);
        assert_eq!(compare_data_type_priority(Vector3Float, Float), Vector3Float);
        assert_eq!(compare_data_type_priority(Float, Float), Float);
    }

    #[test]
    fn test_components() {
        use DataType::*;
        assert_eq!(Vector3Int.component(), Int32);
        assert_eq!(Vector2Boolean.component(), Boolean);
        assert_eq!(Matrix4x4Float.component(), Vector4Float);
        assert_eq!(FloatArray.component(), Float);
        assert_eq!(Vector4FloatArray.component(), Vector4Float);
        assert_eq!(Uint32.component(), Uint32);
        assert_eq!(DataType::vector(ScalarKind::Uint, 3), Some(Vector3Uint));
        assert_eq!(DataType::vector(ScalarKind::Float, 5), None);
        assert_eq!(Matrix3x3Float.scalar_count(), 9);
        assert!(Vector2Uint.is_integer());
        assert!(!Vector2Float.is_integer());
    }

    #[test]
    fn test_annotations() {
        assert_eq!(DataType::from_annotation("float[]"), Some(DataType::FloatArray));
        assert_eq!(DataType::from_annotation("vec4[]"), Some(DataType::Vector4FloatArray));
        assert_eq!(DataType::from_annotation("uvec2"), Some(DataType::Vector2Uint));
        assert_eq!(DataType::from_annotation("string"), None);
        assert_eq!(DataType::from_cast_function("mat4"), Some(DataType::Matrix4x4Float));
        assert_eq!(DataType::from_cast_function("void"), None);
        assert_eq!(DataType::Vector3Int.to_string(), "ivec3");
        assert_eq!(Builtin::from_name("workGroupID"), Some(Builtin::WorkGroupId));
        assert_eq!(Builtin::LocalInvocationIndex.data_type(), DataType::Int32);
    }
}
