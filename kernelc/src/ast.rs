//! Generic statement and expression tree handed over by a [Frontend].
//!
//! The tree only describes syntax. Nothing here is typed or resolved; that
//! happens in the [Transformer](crate::Transformer).
//!
//! [Frontend]: crate::frontend::Frontend

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
}

/// `@name` or `@name(arguments)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Decorator {
    pub name: String,
    pub arguments: Vec<Expression>,
}

impl Decorator {
    /// The arguments that are numeric literals, in order.
    pub fn numbers(&self) -> Vec<f64> {
        self.arguments
            .iter()
            .filter_map(|a| match a {
                Expression::Literal(Literal::Number(n)) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Const,
    Let,
    Var,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub annotation: Option<String>,
    pub init: Option<Expression>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub params: Vec<Param>,
    pub return_annotation: Option<String>,
    pub body: Vec<Statement>,
    pub decorators: Vec<Decorator>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub annotation: Option<String>,
    pub decorators: Vec<Decorator>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    Field(Field),
    Method(FunctionDeclaration),
}

/// A kernel: a class whose decorated fields and methods describe one compute
/// program.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDeclaration {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub members: Vec<ClassMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `import { a, b } from 'source';`
    Import {
        specifiers: Vec<String>,
        source: String,
    },
    VariableDeclaration {
        kind: DeclarationKind,
        declarators: Vec<Declarator>,
    },
    FunctionDeclaration(FunctionDeclaration),
    ClassDeclaration(ClassDeclaration),
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },
    For {
        init: Option<Box<Statement>>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },
    While {
        test: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        test: Expression,
    },
    Break,
    Continue,
    Return(Option<Expression>),
    Expression(Expression),
    Block(Vec<Statement>),
    Empty,
    /// A statement the front end recognized but the compiler does not support.
    Unknown(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Boolean(bool),
    String(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
        }
    }
    pub fn is_comparison(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
    Plus,
    BitNot,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Neg => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::BitNot => "~",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

impl UpdateOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOperator::Increment => "++",
            UpdateOperator::Decrement => "--",
        }
    }
    /// The operator used when the update is spelled out as `x = x op 1`.
    pub fn binary(self) -> BinaryOperator {
        match self {
            UpdateOperator::Increment => BinaryOperator::Add,
            UpdateOperator::Decrement => BinaryOperator::Sub,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    /// Compound assignment such as `+=`.
    Compound(BinaryOperator),
}

impl AssignmentOperator {
    pub fn as_str(self) -> String {
        match self {
            AssignmentOperator::Assign => "=".to_string(),
            AssignmentOperator::Compound(op) => format!("{}=", op.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    This,
    Array(Vec<Expression>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        argument: Box<Expression>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: Box<Expression>,
    },
    Assignment {
        operator: AssignmentOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// `object.property` or, when `computed`, `object[property]`.
    Member {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    /// An expression the front end recognized but the compiler does not support.
    Unknown(String),
}

impl Expression {
    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(value))
    }
    pub fn identifier(name: &str) -> Self {
        Expression::Identifier(name.to_string())
    }
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expression::Identifier(name) => Some(name),
            _ => None,
        }
    }
}
