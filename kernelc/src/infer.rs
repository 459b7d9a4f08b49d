//! Type inference for expressions of the generic tree.

use crate::ast::BinaryOperator;
use crate::ast::Expression;
use crate::ast::Literal;
use crate::ast::UnaryOperator;
use crate::ir::compare_data_type_priority;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::ScalarKind;
use crate::ir::ScopeId;
use crate::ir::Scopes;

/// Functions every backend provides natively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinFunction {
    /// Applies per component; the result has the type of the arguments.
    ComponentWise,
    /// Always returns the given type, such as `dot` or `length`.
    Fixed(DataType),
    /// Workgroup barrier.
    Barrier,
}

const COMPONENT_WISE: [&str; 34] = [
    "abs",
    "acos",
    "asin",
    "atan",
    "ceil",
    "clamp",
    "cos",
    "degrees",
    "exp",
    "exp2",
    "faceforward",
    "floor",
    "fract",
    "inversesqrt",
    "log",
    "log2",
    "max",
    "min",
    "mix",
    "mod",
    "normalize",
    "pow",
    "radians",
    "reflect",
    "refract",
    "round",
    "sign",
    "sin",
    "smoothstep",
    "sqrt",
    "step",
    "tan",
    "tanh",
    "trunc",
];

impl BuiltinFunction {
    pub fn from_name(name: &str) -> Option<BuiltinFunction> {
        match name {
            "dot" | "length" | "distance" => Some(BuiltinFunction::Fixed(DataType::Float)),
            "cross" => Some(BuiltinFunction::Fixed(DataType::Vector3Float)),
            "barrier" => Some(BuiltinFunction::Barrier),
            _ if COMPONENT_WISE.contains(&name) => Some(BuiltinFunction::ComponentWise),
            _ => None,
        }
    }
}

/// Index of the argument that decides the type of a component-wise call.
///
/// Edges come first for `step` and `smoothstep` and may be scalars, so the
/// last argument is used there.
pub fn typed_argument(name: &str, argument_count: usize) -> usize {
    match name {
        "step" | "smoothstep" => argument_count.saturating_sub(1),
        _ => 0,
    }
}

/// Type of a binary operation.
///
/// Comparisons yield Boolean. A matrix combined with a vector yields the
/// vector; everything else yields the operand type with the higher priority.
pub fn binary_result(operator: BinaryOperator, left: DataType, right: DataType) -> DataType {
    if operator.is_comparison() {
        return DataType::Boolean;
    }
    match (left.is_matrix(), right.is_matrix()) {
        (true, false) if right.is_vector() => right,
        (false, true) if left.is_vector() => left,
        _ => compare_data_type_priority(left, right),
    }
}

/// Type that both operands of a binary operation are cast to.
///
/// `None` means each operand keeps its own type, which is the case when a
/// matrix is combined with a vector or a scalar.
pub fn operand_type(left: DataType, right: DataType) -> Option<DataType> {
    if left.is_matrix() != right.is_matrix() {
        return None;
    }
    Some(compare_data_type_priority(left, right))
}

/// Whether `property` is a swizzle such as `x`, `xy` or `rgba`.
pub fn is_swizzle(property: &str) -> bool {
    let sets = ["xyzw", "rgba", "stpq"];
    (1..=4).contains(&property.len())
        && sets
            .iter()
            .any(|set| property.chars().all(|c| set.contains(c)))
}

/// Infers the [DataType] of expressions against a scope.
///
/// Inference never fails; shapes it does not recognize are Float.
pub struct DataTypeInference<'a> {
    scopes: &'a Scopes,
    scope: ScopeId,
}

impl<'a> DataTypeInference<'a> {
    pub fn new(scopes: &'a Scopes, scope: ScopeId) -> Self {
        Self { scopes, scope }
    }
    pub fn infer(&self, expression: &Expression) -> DataType {
        match expression {
            Expression::Literal(Literal::Boolean(_)) => DataType::Boolean,
            Expression::Literal(_) => DataType::Float,
            Expression::Array(elements) => self.array(elements),
            Expression::Identifier(name) => self.identifier(name),
            Expression::Call { callee, arguments } => self.call(callee, arguments),
            Expression::Binary {
                operator,
                left,
                right,
            } => binary_result(*operator, self.infer(left), self.infer(right)),
            Expression::Logical { .. } => DataType::Boolean,
            Expression::Unary {
                operator: UnaryOperator::Not,
                ..
            } => DataType::Boolean,
            Expression::Unary { argument, .. } | Expression::Update { argument, .. } => {
                self.infer(argument)
            }
            Expression::Assignment { left, .. } => self.infer(left),
            Expression::Member {
                object,
                property,
                computed,
            } => self.member(object, property, *computed),
            Expression::Conditional {
                consequent,
                alternate,
                ..
            } => compare_data_type_priority(self.infer(consequent), self.infer(alternate)),
            Expression::This | Expression::Unknown(_) => DataType::Float,
        }
    }
    fn array(&self, elements: &[Expression]) -> DataType {
        let n = elements.len();
        let boolean = n > 0 && elements.iter().all(|e| self.infer(e) == DataType::Boolean);
        let kind = if boolean {
            ScalarKind::Boolean
        } else {
            ScalarKind::Float
        };
        match n {
            1..=4 => DataType::vector(kind, n).unwrap_or(DataType::Float),
            9 => DataType::Matrix3x3Float,
            16 => DataType::Matrix4x4Float,
            _ => DataType::Float,
        }
    }
    fn identifier(&self, name: &str) -> DataType {
        if let Some(entry) = self.scopes.lookup(self.scope, name) {
            return entry.id.typ;
        }
        match Builtin::from_name(name) {
            Some(builtin) => builtin.data_type(),
            None => DataType::Float,
        }
    }
    /// Return type of calling `name`.
    pub fn function(&self, name: &str, arguments: &[Expression]) -> DataType {
        if let Some(entry) = self.scopes.lookup_function(self.scope, name) {
            return entry.id.typ;
        }
        if let Some(typ) = DataType::from_cast_function(name) {
            return typ;
        }
        match BuiltinFunction::from_name(name) {
            Some(BuiltinFunction::Fixed(typ)) => typ,
            Some(BuiltinFunction::ComponentWise) => {
                let index = typed_argument(name, arguments.len());
                match arguments.get(index) {
                    Some(argument) => self.infer(argument),
                    None => DataType::Float,
                }
            }
            Some(BuiltinFunction::Barrier) => DataType::Void,
            None => DataType::Float,
        }
    }
    fn call(&self, callee: &Expression, arguments: &[Expression]) -> DataType {
        match callee {
            Expression::Identifier(name) => self.function(name, arguments),
            // `this.method()` and `Math.sqrt()`.
            Expression::Member {
                object,
                property,
                computed: false,
            } if matches!(**object, Expression::This)
                || object.as_identifier() == Some("Math") =>
            {
                match property.as_identifier() {
                    Some(name) => self.function(name, arguments),
                    None => DataType::Float,
                }
            }
            _ => DataType::Float,
        }
    }
    fn member(&self, object: &Expression, property: &Expression, computed: bool) -> DataType {
        if computed {
            let base = self.infer(object);
            return if base.is_vector() || base.is_array() || base.is_matrix() {
                base.component()
            } else {
                DataType::Float
            };
        }
        let Some(name) = property.as_identifier() else {
            return DataType::Float;
        };
        if matches!(object, Expression::This) {
            return self.identifier(name);
        }
        let base = self.infer(object);
        match (base.scalar_kind(), base.is_vector() && is_swizzle(name)) {
            (Some(kind), true) => DataType::vector(kind, name.len()).unwrap_or(DataType::Float),
            _ => DataType::Float,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ScopeKind;
    use crate::ir::StorageClass;
    use crate::ir::Symbol;

    fn number(n: f64) -> Expression {
        Expression::number(n)
    }

    fn boolean(b: bool) -> Expression {
        Expression::Literal(Literal::Boolean(b))
    }

    fn member(object: Expression, property: &str) -> Expression {
        Expression::Member {
            object: Box::new(object),
            property: Box::new(Expression::identifier(property)),
            computed: false,
        }
    }

    fn setup() -> (Scopes, ScopeId) {
        let mut scopes = Scopes::new();
        let root = scopes.push(ScopeKind::Program, None);
        let private = StorageClass::Private;
        scopes.register(root, Symbol::new("a", DataType::Int32, private), false);
        scopes.register(root, Symbol::new("v", DataType::Vector4Float, private), false);
        scopes.register(root, Symbol::new("m", DataType::Matrix3x3Float, private), false);
        let buffer = StorageClass::StorageBuffer;
        scopes.register(root, Symbol::new("data", DataType::FloatArray, buffer), false);
        scopes.register(root, Symbol::new("sum", DataType::Int32, private), true);
        (scopes, root)
    }

    #[test]
    fn test_literals() {
        let (scopes, root) = setup();
        let infer = DataTypeInference::new(&scopes, root);
        assert_eq!(infer.infer(&number(1.0)), DataType::Float);
        assert_eq!(infer.infer(&boolean(true)), DataType::Boolean);

        let array = |n: usize| Expression::Array((0..n).map(|i| number(i as f64)).collect());
        assert_eq!(infer.infer(&array(1)), DataType::Float);
        assert_eq!(infer.infer(&array(3)), DataType::Vector3Float);
        assert_eq!(infer.infer(&array(4)), DataType::Vector4Float);
        assert_eq!(infer.infer(&array(9)), DataType::Matrix3x3Float);
        assert_eq!(infer.infer(&array(16)), DataType::Matrix4x4Float);
        assert_eq!(infer.infer(&array(5)), DataType::Float);
        let booleans = Expression::Array(vec![boolean(true), boolean(false)]);
        assert_eq!(infer.infer(&booleans), DataType::Vector2Boolean);
    }

    #[test]
    fn test_identifiers_and_calls() {
        let (scopes, root) = setup();
        let infer = DataTypeInference::new(&scopes, root);
        assert_eq!(infer.infer(&Expression::identifier("a")), DataType::Int32);
        assert_eq!(infer.infer(&Expression::identifier("unknown")), DataType::Float);
        assert_eq!(
            infer.infer(&Expression::identifier("globalInvocationID")),
            DataType::Vector3Int
        );

        let call = |callee: Expression, arguments: Vec<Expression>| Expression::Call {
            callee: Box::new(callee),
            arguments,
        };
        let sum = call(Expression::identifier("sum"), vec![]);
        assert_eq!(infer.infer(&sum), DataType::Int32);
        let this_sum = call(member(Expression::This, "sum"), vec![]);
        assert_eq!(infer.infer(&this_sum), DataType::Int32);
        let cast = call(Expression::identifier("ivec2"), vec![number(1.0)]);
        assert_eq!(infer.infer(&cast), DataType::Vector2Int);
        let max = call(Expression::identifier("max"), vec![Expression::identifier("v"), number(0.0)]);
        assert_eq!(infer.infer(&max), DataType::Vector4Float);
        let step = call(Expression::identifier("step"), vec![number(0.5), Expression::identifier("v")]);
        assert_eq!(infer.infer(&step), DataType::Vector4Float);
        let dot = call(Expression::identifier("dot"), vec![Expression::identifier("v")]);
        assert_eq!(infer.infer(&dot), DataType::Float);
        let sqrt = call(member(Expression::identifier("Math"), "sqrt"), vec![Expression::identifier("a")]);
        assert_eq!(infer.infer(&sqrt), DataType::Int32);
        let other = call(Expression::identifier("random"), vec![]);
        assert_eq!(infer.infer(&other), DataType::Float);
    }

    #[test]
    fn test_operators() {
        let (scopes, root) = setup();
        let infer = DataTypeInference::new(&scopes, root);
        let binary = |operator, left: Expression, right: Expression| Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
        let a = || Expression::identifier("a");
        let add = binary(BinaryOperator::Add, a(), number(1.0));
        assert_eq!(infer.infer(&add), DataType::Int32);
        let lt = binary(BinaryOperator::Lt, a(), number(1.0));
        assert_eq!(infer.infer(&lt), DataType::Boolean);
        let mv = binary(BinaryOperator::Mul, Expression::identifier("m"), member(Expression::identifier("v"), "xyz"));
        assert_eq!(infer.infer(&mv), DataType::Vector3Float);
        let ms = binary(BinaryOperator::Mul, Expression::identifier("m"), number(2.0));
        assert_eq!(infer.infer(&ms), DataType::Matrix3x3Float);

        let not = Expression::Unary {
            operator: UnaryOperator::Not,
            argument: Box::new(a()),
        };
        assert_eq!(infer.infer(&not), DataType::Boolean);
        let conditional = Expression::Conditional {
            test: Box::new(boolean(true)),
            consequent: Box::new(number(1.0)),
            alternate: Box::new(a()),
        };
        assert_eq!(infer.infer(&conditional), DataType::Int32);

        assert_eq!(operand_type(DataType::Int32, DataType::Float), Some(DataType::Int32));
        assert_eq!(operand_type(DataType::Matrix4x4Float, DataType::Vector4Float), None);
    }

    #[test]
    fn test_members() {
        let (scopes, root) = setup();
        let infer = DataTypeInference::new(&scopes, root);
        let v = || Expression::identifier("v");
        assert_eq!(infer.infer(&member(v(), "x")), DataType::Float);
        assert_eq!(infer.infer(&member(v(), "xy")), DataType::Vector2Float);
        assert_eq!(infer.infer(&member(v(), "rgba")), DataType::Vector4Float);
        let id = Expression::identifier("globalInvocationID");
        assert_eq!(infer.infer(&member(id, "x")), DataType::Int32);
        assert_eq!(infer.infer(&member(Expression::This, "data")), DataType::FloatArray);

        let index = |object: Expression| Expression::Member {
            object: Box::new(object),
            property: Box::new(number(0.0)),
            computed: true,
        };
        assert_eq!(infer.infer(&index(Expression::identifier("data"))), DataType::Float);
        assert_eq!(infer.infer(&index(v())), DataType::Float);
        assert_eq!(infer.infer(&index(Expression::identifier("m"))), DataType::Vector3Float);
        assert!(!is_swizzle("xyzwx"));
        assert!(!is_swizzle("xr"));
    }
}
