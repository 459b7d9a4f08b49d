//! Code generators for the supported shading languages.
//!
//! Every backend implements [CodeGenerator]. Most of the expression and
//! statement printing is shared through provided methods; backends override
//! the hooks where their dialect differs.
//!
//! This module is called `targ3t` because `target` created issues with `cargo
//! watch`.

mod glsl;
pub mod glsl100;
pub mod glsl450;
pub mod wgsl;

use crate::ast::AssignmentOperator;
use crate::ast::BinaryOperator;
use crate::ast::Literal;
use crate::ast::UnaryOperator;
use crate::ast::UpdateOperator;
use crate::context::CompileContext;
use crate::context::Define;
use crate::context::DefineValue;
use crate::error::CompileError;
use crate::infer::operand_type;
use crate::infer::BuiltinFunction;
use crate::ir::format_float;
use crate::ir::spaces;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::NodeId;
use crate::ir::NodeKind;
use crate::ir::ScalarKind;
use crate::ir::ShaderProgram;
use crate::ir::StorageClass;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

pub use glsl100::Glsl100Generator;
pub use glsl450::Glsl450Generator;
pub use wgsl::WgslGenerator;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// GLSL ES 1.00 (WebGL 1)
    #[value(name = "glsl100")]
    Glsl100,
    /// GLSL 4.50 (Vulkan)
    #[value(name = "glsl450")]
    Glsl450,
    /// WGSL (WebGPU)
    #[value(name = "wgsl")]
    Wgsl,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Glsl100, Target::Glsl450, Target::Wgsl];

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Glsl100 => "glsl100",
            Target::Glsl450 => "glsl450",
            Target::Wgsl => "wgsl",
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Target::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown target: {s}"))
    }
}

pub fn create_generator(target: Target) -> Box<dyn CodeGenerator> {
    match target {
        Target::Glsl100 => Box::new(Glsl100Generator::new()),
        Target::Glsl450 => Box::new(Glsl450Generator::new()),
        Target::Wgsl => Box::new(WgslGenerator::new()),
    }
}

/// Storage buffers a single stage may bind next to the uniform block.
pub const MAX_STORAGE_BUFFERS: u32 = 8;

/// Binding-index cursor for backends with explicit bindings.
#[derive(Debug, Default)]
pub struct BindingCursor {
    next: u32,
}

impl BindingCursor {
    pub fn reset(&mut self) {
        self.next = 0;
    }
    fn take(&mut self) -> u32 {
        let binding = self.next;
        self.next += 1;
        binding
    }
    /// Assign bindings in field declaration order and return the binding of
    /// the uniform block, if there is one.
    ///
    /// The uniform block takes its index when its first field is seen; every
    /// storage buffer takes its own.
    pub fn assign(&mut self, target: Target, context: &mut CompileContext) -> Result<Option<u32>> {
        let requested = context.storage_buffers().count() as u32;
        if requested > MAX_STORAGE_BUFFERS {
            return Err(CompileError::BindingLimitExceeded {
                target,
                requested,
                limit: MAX_STORAGE_BUFFERS,
            }
            .into());
        }
        let mut block = None;
        for uniform in context.uniforms.iter_mut() {
            let binding = match uniform.storage_class {
                StorageClass::Uniform => *block.get_or_insert_with(|| self.take()),
                StorageClass::StorageBuffer => self.take(),
                _ => continue,
            };
            uniform.binding = Some(binding);
        }
        Ok(block)
    }
}

/// Built-ins the kernel refers to, or all of them with `all`.
fn used_builtins(program: &ShaderProgram, all: bool) -> Vec<Builtin> {
    Builtin::ALL
        .into_iter()
        .filter(|b| all || program.uses_builtin(*b))
        .collect()
}

fn needs_cast(from: DataType, to: DataType) -> bool {
    from != to
        && from != DataType::Void
        && to != DataType::Void
        && !from.is_array()
        && !to.is_array()
}

/// Turns a [ShaderProgram] into source text for one [Target].
pub trait CodeGenerator {
    fn target(&self) -> Target;
    /// Reset per-compile state such as the binding cursor.
    fn clear(&mut self);
    /// Generate the whole program. Calls [CodeGenerator::clear] first.
    fn generate(&mut self, program: &ShaderProgram, context: &mut CompileContext) -> Result<String>;
    fn type_name(&self, typ: DataType) -> String;

    fn uint_suffix(&self) -> &'static str {
        "u"
    }
    fn cast(&self, typ: DataType, value: &str) -> String {
        format!("{}({value})", self.type_name(typ))
    }
    fn identifier(&self, _context: &CompileContext, name: &str, _storage: StorageClass) -> String {
        name.to_string()
    }
    /// `%` truncates the quotient toward zero like the source language.
    fn remainder(&self, typ: DataType, left: &str, right: &str) -> String {
        if typ.scalar_kind() == Some(ScalarKind::Float) {
            format!("({left} - {right} * trunc({left} / {right}))")
        } else {
            format!("({left} % {right})")
        }
    }
    fn conditional(&self, test: &str, consequent: &str, alternate: &str) -> String {
        format!("({test} ? {consequent} : {alternate})")
    }
    fn function_call(&self, name: &str, arguments: &[String]) -> String {
        match BuiltinFunction::from_name(name) {
            Some(BuiltinFunction::Barrier) => "barrier()".to_string(),
            _ => format!("{name}({})", arguments.join(", ")),
        }
    }
    fn update(&self, operator: UpdateOperator, prefix: bool, argument: &str, _typ: DataType) -> String {
        if prefix {
            format!("{}{argument}", operator.as_str())
        } else {
            format!("{argument}{}", operator.as_str())
        }
    }
    /// Whether `a += b` must be written as `a = a + b`.
    fn expand_compound(&self) -> bool {
        false
    }
    /// Read from a storage buffer when the dialect cannot index it directly.
    fn buffer_read(&self, _context: &CompileContext, _name: &str, _typ: DataType, _index: &str) -> Option<String> {
        None
    }
    /// Write to the kernel output when the dialect redirects it.
    fn output_write(
        &self,
        _program: &ShaderProgram,
        _context: &CompileContext,
        _target: NodeId,
        _value: &str,
    ) -> Option<String> {
        None
    }
    /// One variable declarator, already indented.
    fn declaration(
        &self,
        program: &ShaderProgram,
        context: &CompileContext,
        declarator: NodeId,
        _constant: bool,
        indent: i32,
    ) -> String {
        let node = &program[declarator];
        let NodeKind::VariableDeclarator { name, init, .. } = &node.kind else {
            return String::new();
        };
        let typ = self.type_name(node.typ);
        match init {
            Some(init) => {
                let value = self.generate_expression(program, context, *init, Some(node.typ));
                format!("{}{typ} {name} = {value};", spaces(indent))
            }
            None => format!("{}{typ} {name};", spaces(indent)),
        }
    }
    fn function_signature(&self, program: &ShaderProgram, _context: &CompileContext, function: NodeId) -> String {
        let node = &program[function];
        let NodeKind::Function { name, params, .. } = &node.kind else {
            return String::new();
        };
        let params = params
            .iter()
            .map(|p| format!("{} {}", self.type_name(p.typ), p.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {name}({params})", self.type_name(node.typ))
    }
    /// Statements at the start of every function body.
    fn function_prologue(&self, _program: &ShaderProgram, _function: NodeId, _indent: i32) -> Vec<String> {
        vec![]
    }
    /// Statements at the start of the entry point.
    fn entry_prologue(&self, _program: &ShaderProgram, _context: &CompileContext, _indent: i32) -> Vec<String> {
        vec![]
    }

    /// A scalar literal of the given type.
    fn scalar_literal(&self, value: f64, typ: DataType) -> String {
        let integral = value.fract() == 0.0 && value.is_finite();
        match typ.scalar_kind() {
            Some(ScalarKind::Boolean) => (value != 0.0).to_string(),
            Some(ScalarKind::Int) if integral && typ.is_scalar() => format!("{}", value as i64),
            Some(ScalarKind::Uint) if integral && typ.is_scalar() => match self.uint_suffix() {
                // Unsigned values are plain ints in this dialect.
                "" => format!("{}", value as i64),
                suffix => format!("{}{suffix}", (value as i64).rem_euclid(1 << 32)),
            },
            Some(ScalarKind::Float) if typ.is_scalar() => format_float(value),
            _ => self.cast(typ, &format_float(value)),
        }
    }
    /// Right-hand side of a define or module constant.
    fn define_value(&self, define: &Define) -> String {
        match &define.value {
            DefineValue::Number(n) => self.scalar_literal(*n, define.typ.component()),
            DefineValue::Boolean(b) => b.to_string(),
            DefineValue::Vector(values) => {
                let component = match define.typ.scalar_kind() {
                    Some(kind) => DataType::vector(kind, 1).unwrap_or(DataType::Float),
                    None => DataType::Float,
                };
                let values = values
                    .iter()
                    .map(|v| self.scalar_literal(*v, component))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({values})", self.type_name(define.typ))
            }
            DefineValue::Placeholder(placeholder) => placeholder.clone(),
        }
    }
    fn binary(&self, operator: BinaryOperator, typ: DataType, left: &str, right: &str) -> String {
        match operator {
            BinaryOperator::Rem => self.remainder(typ, left, right),
            _ => format!("({left} {} {right})", operator.as_str()),
        }
    }
    /// `!test`, without doubling the parentheses of binary expressions.
    fn negate(&self, program: &ShaderProgram, test: NodeId, text: &str) -> String {
        match program[test].kind {
            NodeKind::Binary { .. } | NodeKind::Logical { .. } => format!("!{text}"),
            _ => format!("!({text})"),
        }
    }

    /// Generate an expression, casting it when `expected` differs from its
    /// own type.
    fn generate_expression(
        &self,
        program: &ShaderProgram,
        context: &CompileContext,
        id: NodeId,
        expected: Option<DataType>,
    ) -> String {
        let node = &program[id];
        let Some(expected) = expected.filter(|t| *t != DataType::Void) else {
            return self.expression_text(program, context, id);
        };
        let numeric = expected.scalar_kind() != Some(ScalarKind::Boolean) && !expected.is_array();
        // A negated literal under an unsigned type is written as its wrapped value.
        if let NodeKind::Unary {
            operator: UnaryOperator::Neg,
            argument,
        } = &node.kind
        {
            if let (DataType::Uint32, NodeKind::Literal(Literal::Number(n))) = (expected, &program[*argument].kind) {
                return self.scalar_literal(-*n, expected);
            }
        }
        match &node.kind {
            NodeKind::Literal(Literal::Number(n)) if expected.is_scalar() => {
                return self.scalar_literal(*n, expected);
            }
            NodeKind::Unary {
                operator: operator @ (UnaryOperator::Neg | UnaryOperator::Plus),
                argument,
            } if numeric => {
                let argument = self.generate_expression(program, context, *argument, Some(expected));
                return format!("{}{argument}", operator.as_str());
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.generate_expression(program, context, *test, Some(DataType::Boolean));
                let consequent = self.generate_expression(program, context, *consequent, Some(expected));
                let alternate = self.generate_expression(program, context, *alternate, Some(expected));
                return self.conditional(&test, &consequent, &alternate);
            }
            _ => (),
        }
        let text = self.expression_text(program, context, id);
        if needs_cast(node.typ, expected) {
            self.cast(expected, &text)
        } else {
            text
        }
    }
    /// Generate an expression in its own type.
    fn expression_text(&self, program: &ShaderProgram, context: &CompileContext, id: NodeId) -> String {
        let node = &program[id];
        let expression = |id: NodeId, expected: Option<DataType>| {
            self.generate_expression(program, context, id, expected)
        };
        match &node.kind {
            NodeKind::Literal(Literal::Number(n)) => self.scalar_literal(*n, DataType::Float),
            NodeKind::Literal(Literal::Boolean(b)) => b.to_string(),
            NodeKind::Identifier { name, storage, .. } => self.identifier(context, name, *storage),
            NodeKind::Array { elements } => {
                let component = if node.typ.is_matrix() {
                    DataType::Float
                } else {
                    node.typ.component()
                };
                let elements = elements
                    .iter()
                    .map(|e| expression(*e, Some(component)))
                    .collect::<Vec<_>>();
                if node.typ.is_vector() || node.typ.is_matrix() {
                    format!("{}({})", self.type_name(node.typ), elements.join(", "))
                } else {
                    elements.into_iter().next().unwrap_or_else(|| format_float(0.0))
                }
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let operand = operand_type(program[*left].typ, program[*right].typ);
                let left = expression(*left, operand);
                let right = expression(*right, operand);
                self.binary(*operator, operand.unwrap_or(node.typ), &left, &right)
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let operand = |id: NodeId| {
                    let typ = program[id].typ;
                    expression(id, typ.is_scalar().then_some(DataType::Boolean))
                };
                format!("({} {} {})", operand(*left), operator.as_str(), operand(*right))
            }
            NodeKind::Unary { operator, argument } => {
                let typ = program[*argument].typ;
                let expected = match operator {
                    UnaryOperator::Not => typ.is_scalar().then_some(DataType::Boolean),
                    _ => None,
                };
                format!("{}{}", operator.as_str(), expression(*argument, expected))
            }
            NodeKind::Update {
                operator,
                prefix,
                argument,
            } => {
                let typ = program[*argument].typ;
                let target = expression(*argument, None);
                if self.output_write(program, context, *argument, "").is_some() {
                    let one = self.scalar_literal(1.0, typ.component());
                    let value = self.binary(operator.binary(), typ, &target, &one);
                    if let Some(write) = self.output_write(program, context, *argument, &value) {
                        return write;
                    }
                }
                self.update(*operator, *prefix, &target, typ)
            }
            NodeKind::Assignment {
                operator,
                left,
                right,
            } => self.assignment(program, context, *operator, *left, *right),
            NodeKind::Call { callee, arguments } => self.call(program, context, id, callee, arguments),
            NodeKind::Member { object, property } => {
                format!("{}.{property}", expression(*object, None))
            }
            NodeKind::Index { object, index } => {
                let index_type = match program[*index].typ {
                    DataType::Uint32 => DataType::Uint32,
                    _ => DataType::Int32,
                };
                let index_text = expression(*index, Some(index_type));
                if let NodeKind::Identifier {
                    name,
                    storage: StorageClass::StorageBuffer,
                    ..
                } = &program[*object].kind
                {
                    let typ = program[*object].typ;
                    let raw_index = expression(*index, None);
                    if let Some(read) = self.buffer_read(context, name, typ, &raw_index) {
                        return read;
                    }
                }
                format!("{}[{index_text}]", expression(*object, None))
            }
            NodeKind::Conditional { .. } => {
                self.generate_expression(program, context, id, Some(node.typ))
            }
            NodeKind::Literal(Literal::String(_)) | NodeKind::Unknown { .. } => String::new(),
            _ => String::new(),
        }
    }
    fn assignment(
        &self,
        program: &ShaderProgram,
        context: &CompileContext,
        operator: AssignmentOperator,
        left: NodeId,
        right: NodeId,
    ) -> String {
        let typ = program[left].typ;
        let target = self.generate_expression(program, context, left, None);
        let value = self.generate_expression(program, context, right, Some(typ));
        let value = match operator {
            AssignmentOperator::Assign => value,
            AssignmentOperator::Compound(op) => {
                let expand = self.expand_compound() || op == BinaryOperator::Rem;
                let is_output_write = self.output_write(program, context, left, "").is_some();
                if !expand && !is_output_write {
                    return format!("{target} {}= {value}", op.as_str());
                }
                self.binary(op, typ, &target, &value)
            }
        };
        if let Some(write) = self.output_write(program, context, left, &value) {
            return write;
        }
        format!("{target} = {value}")
    }
    fn call(
        &self,
        program: &ShaderProgram,
        context: &CompileContext,
        id: NodeId,
        callee: &str,
        arguments: &[NodeId],
    ) -> String {
        let typ = program[id].typ;
        let expected: Vec<Option<DataType>> = if let Some(function) = program.function(callee) {
            match &program[function].kind {
                NodeKind::Function { params, .. } => {
                    let mut types: Vec<_> = params.iter().map(|p| Some(p.typ)).collect();
                    types.resize(arguments.len(), None);
                    types
                }
                _ => vec![None; arguments.len()],
            }
        } else if DataType::from_cast_function(callee).is_some() {
            let component = if typ.is_matrix() {
                DataType::Float
            } else {
                typ.component()
            };
            let constructor = typ.is_vector() || typ.is_matrix();
            arguments
                .iter()
                .map(|a| (constructor && program[*a].typ.is_scalar()).then_some(component))
                .collect()
        } else {
            match BuiltinFunction::from_name(callee) {
                Some(BuiltinFunction::ComponentWise) => vec![Some(typ); arguments.len()],
                _ => vec![None; arguments.len()],
            }
        };
        let arguments = arguments
            .iter()
            .zip(expected)
            .map(|(a, e)| self.generate_expression(program, context, *a, e))
            .collect::<Vec<_>>();
        match DataType::from_cast_function(callee) {
            Some(cast) if program.function(callee).is_none() => {
                format!("{}({})", self.type_name(cast), arguments.join(", "))
            }
            _ => self.function_call(callee, &arguments),
        }
    }

    /// Header lines followed by the top-level statements.
    fn assemble(&self, program: &ShaderProgram, context: &CompileContext, header: Vec<String>) -> String {
        let mut parts = vec![header.join("\n")];
        parts.extend(
            program
                .body()
                .iter()
                .map(|s| self.generate_statement(program, context, *s, 0)),
        );
        parts.retain(|s| !s.trim().is_empty());
        parts.join("\n\n") + "\n"
    }
    /// Nested statement rendered as a braced block.
    fn body(&self, program: &ShaderProgram, context: &CompileContext, id: NodeId, indent: i32) -> String {
        let statements = match &program[id].kind {
            NodeKind::Block { body, .. } => body.clone(),
            _ => vec![id],
        };
        let lines = self.statements(program, context, &statements, indent + 1);
        if lines.is_empty() {
            "{\n".to_string() + &spaces(indent) + "}"
        } else {
            format!("{{\n{lines}\n{}}}", spaces(indent))
        }
    }
    /// Statements joined by newlines, skipping those that produce nothing.
    fn statements(&self, program: &ShaderProgram, context: &CompileContext, body: &[NodeId], indent: i32) -> String {
        body.iter()
            .map(|s| self.generate_statement(program, context, *s, indent))
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
    fn generate_statement(&self, program: &ShaderProgram, context: &CompileContext, id: NodeId, indent: i32) -> String {
        self.common_statement(program, context, id, indent)
    }
    /// Statement printing shared by all dialects.
    fn common_statement(&self, program: &ShaderProgram, context: &CompileContext, id: NodeId, indent: i32) -> String {
        let node = &program[id];
        let pad = spaces(indent);
        let expression = |id: NodeId, expected: Option<DataType>| {
            self.generate_expression(program, context, id, expected)
        };
        match &node.kind {
            NodeKind::VariableDeclaration {
                constant,
                declarators,
            } => declarators
                .iter()
                .filter(|d| {
                    matches!(
                        program[**d].kind,
                        NodeKind::VariableDeclarator {
                            storage: StorageClass::Private,
                            alias_of: None,
                            ..
                        }
                    )
                })
                .map(|d| self.declaration(program, context, *d, *constant, indent))
                .collect::<Vec<_>>()
                .join("\n"),
            NodeKind::Function { body, entry, .. } => {
                let signature = self.function_signature(program, context, id);
                let mut lines = self.function_prologue(program, id, indent + 1);
                if *entry {
                    lines.extend(self.entry_prologue(program, context, indent + 1));
                }
                let body = self.statements(program, context, body, indent + 1);
                if !body.is_empty() {
                    lines.push(body);
                }
                format!("{pad}{signature} {{\n{}\n{pad}}}", lines.join("\n"))
            }
            NodeKind::Block { .. } => format!("{pad}{}", self.body(program, context, id, indent)),
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                let test = expression(*test, Some(DataType::Boolean));
                let consequent = self.body(program, context, *consequent, indent);
                let mut text = format!("{pad}if ({test}) {consequent}");
                if let Some(alternate) = alternate {
                    let alternate = match program[*alternate].kind {
                        NodeKind::If { .. } => {
                            let nested = self.generate_statement(program, context, *alternate, indent);
                            nested.trim_start().to_string()
                        }
                        _ => self.body(program, context, *alternate, indent),
                    };
                    text.push_str(&format!(" else {alternate}"));
                }
                text
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                let init = match init {
                    Some(init) => {
                        let text = self.generate_statement(program, context, *init, 0);
                        text.trim().trim_end_matches(';').to_string()
                    }
                    None => String::new(),
                };
                let test = test
                    .map(|t| expression(t, Some(DataType::Boolean)))
                    .unwrap_or_default();
                let update = update.map(|u| expression(u, None)).unwrap_or_default();
                let body = self.body(program, context, *body, indent);
                format!("{pad}for ({init}; {test}; {update}) {body}")
            }
            NodeKind::While { test, body } => {
                let test = expression(*test, Some(DataType::Boolean));
                let body = self.body(program, context, *body, indent);
                format!("{pad}while ({test}) {body}")
            }
            NodeKind::DoWhile { body, test } => {
                let body = self.body(program, context, *body, indent);
                let test = expression(*test, Some(DataType::Boolean));
                format!("{pad}do {body} while ({test});")
            }
            NodeKind::Break => format!("{pad}break;"),
            NodeKind::Continue => format!("{pad}continue;"),
            NodeKind::Return { argument } => {
                let function_type = program
                    .enclosing_function(id)
                    .map(|f| program[f].typ)
                    .unwrap_or(DataType::Void);
                match argument {
                    Some(argument) if function_type != DataType::Void => {
                        format!("{pad}return {};", expression(*argument, Some(function_type)))
                    }
                    _ => format!("{pad}return;"),
                }
            }
            NodeKind::ExpressionStatement { expression: e } => {
                let text = expression(*e, None);
                if text.is_empty() {
                    text
                } else {
                    format!("{pad}{text};")
                }
            }
            NodeKind::Program { body, .. } => self.statements(program, context, body, indent),
            _ => String::new(),
        }
    }
}
