//! Lowering of the generic tree into the typed [ShaderProgram].

use crate::ast;
use crate::ast::Expression;
use crate::ast::Literal;
use crate::ast::Statement;
use crate::ast::UnaryOperator;
use crate::context::CompileContext;
use crate::context::Define;
use crate::context::DefineValue;
use crate::context::DiagnosticKind;
use crate::context::GlobalDeclaration;
use crate::context::OutputDescriptor;
use crate::context::UniformDescriptor;
use crate::infer::is_swizzle;
use crate::infer::BuiltinFunction;
use crate::infer::DataTypeInference;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::NodeId;
use crate::ir::NodeKind;
use crate::ir::Param;
use crate::ir::ScopeId;
use crate::ir::ScopeKind;
use crate::ir::ShaderProgram;
use crate::ir::StorageClass;
use crate::ir::Symbol;
use tracing::debug;

/// Function whose return type may still be refined by its first `return`.
struct FunctionFrame {
    name: String,
    declared_in: ScopeId,
    refine: bool,
}

/// Walks the generic tree, builds the scope chain and fills the
/// [CompileContext].
pub struct Transformer<'a> {
    program: ShaderProgram,
    context: &'a mut CompileContext,
    /// Scope that new declarations go into.
    scope: ScopeId,
    functions: Vec<FunctionFrame>,
    entry_point: bool,
}

impl<'a> Transformer<'a> {
    pub fn new(context: &'a mut CompileContext) -> Self {
        let program = ShaderProgram::new();
        let scope = program.root_scope();
        Self {
            program,
            context,
            scope,
            functions: vec![],
            entry_point: false,
        }
    }
    pub fn transform(mut self, program: &ast::Program) -> ShaderProgram {
        debug!("Transforming {} top-level statements", program.body.len());
        let mut body = vec![];
        for statement in &program.body {
            body.extend(self.statement(statement));
        }
        let root = self.program.root();
        let scope = self.program.root_scope();
        self.program.set_kind(root, NodeKind::Program { body, scope });
        self.program
    }
    fn infer(&self, expression: &Expression) -> DataType {
        DataTypeInference::new(&self.program.scopes, self.scope).infer(expression)
    }
    fn append(&mut self, kind: NodeKind, typ: DataType) -> NodeId {
        self.program.append(kind, typ)
    }
    fn enter(&mut self, kind: ScopeKind) -> ScopeId {
        self.scope = self.program.scopes.push(kind, Some(self.scope));
        self.scope
    }
    fn leave(&mut self) {
        if let Some(parent) = self.program.scopes.get(self.scope).parent {
            self.scope = parent;
        }
    }
    fn unknown(&mut self, kind: &str) -> NodeId {
        self.context.unknown_construct(kind);
        let kind = NodeKind::Unknown {
            kind: kind.to_string(),
        };
        self.append(kind, DataType::Void)
    }
    /// Resolve a type annotation; unknown names fall back to Float.
    fn annotation(&mut self, annotation: &Option<String>) -> Option<DataType> {
        let name = annotation.as_ref()?;
        match DataType::from_annotation(name) {
            Some(typ) => Some(typ),
            None => {
                let message = format!("unknown type `{name}`, using float");
                self.context.warn(DiagnosticKind::UnknownType, message);
                Some(DataType::Float)
            }
        }
    }
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// The value of a literal that is known at compile time.
fn static_value(expression: &Expression) -> Option<DefineValue> {
    match expression {
        Expression::Literal(Literal::Number(n)) => Some(DefineValue::Number(*n)),
        Expression::Literal(Literal::Boolean(b)) => Some(DefineValue::Boolean(*b)),
        Expression::Unary {
            operator: UnaryOperator::Neg,
            argument,
        } => match **argument {
            Expression::Literal(Literal::Number(n)) => Some(DefineValue::Number(-n)),
            _ => None,
        },
        Expression::Array(elements) => elements
            .iter()
            .map(|e| match static_value(e)? {
                DefineValue::Number(n) => Some(n),
                DefineValue::Boolean(b) => Some(if b { 1.0 } else { 0.0 }),
                _ => None,
            })
            .collect::<Option<Vec<f64>>>()
            .map(DefineValue::Vector),
        _ => None,
    }
}

/// Name of the field that `const a = b` or `const a = this.b` refers to.
fn referenced_name(expression: &Expression) -> Option<&str> {
    match expression {
        Expression::Identifier(name) => Some(name),
        Expression::Member {
            object,
            property,
            computed: false,
        } if matches!(**object, Expression::This) => property.as_identifier(),
        _ => None,
    }
}

/// Statements.
impl Transformer<'_> {
    fn statement(&mut self, statement: &Statement) -> Vec<NodeId> {
        let kind = match statement {
            Statement::Import { specifiers, source } => {
                self.import(specifiers, source);
                return vec![];
            }
            Statement::VariableDeclaration { kind, declarators } => {
                let constant = *kind == ast::DeclarationKind::Const;
                return vec![self.variable_declaration(constant, declarators)];
            }
            Statement::FunctionDeclaration(function) => {
                return vec![self.function(function, false)];
            }
            Statement::ClassDeclaration(class) => return self.kernel(class),
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                let test = self.expression(test);
                let consequent = self.nested(consequent);
                let alternate = alternate.as_ref().map(|a| self.nested(a));
                NodeKind::If {
                    test,
                    consequent,
                    alternate,
                }
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = self.enter(ScopeKind::Block);
                let init = init.as_ref().map(|s| self.nested(s));
                let test = test.as_ref().map(|e| self.expression(e));
                let update = update.as_ref().map(|e| self.expression(e));
                let body = self.nested(body);
                self.leave();
                NodeKind::For {
                    init,
                    test,
                    update,
                    body,
                    scope,
                }
            }
            Statement::While { test, body } => {
                let test = self.expression(test);
                let body = self.nested(body);
                NodeKind::While { test, body }
            }
            Statement::DoWhile { body, test } => {
                let body = self.nested(body);
                let test = self.expression(test);
                NodeKind::DoWhile { body, test }
            }
            Statement::Break => NodeKind::Break,
            Statement::Continue => NodeKind::Continue,
            Statement::Return(argument) => {
                if let Some(argument) = argument {
                    self.refine_return_type(argument);
                }
                let argument = argument.as_ref().map(|e| self.expression(e));
                NodeKind::Return { argument }
            }
            Statement::Expression(expression) => NodeKind::ExpressionStatement {
                expression: self.expression(expression),
            },
            Statement::Block(statements) => {
                let scope = self.enter(ScopeKind::Block);
                let body = statements.iter().flat_map(|s| self.statement(s)).collect();
                self.leave();
                NodeKind::Block { body, scope }
            }
            Statement::Empty => NodeKind::Empty,
            Statement::Unknown(kind) => return vec![self.unknown(kind)],
        };
        vec![self.append(kind, DataType::Void)]
    }
    /// A statement in a position that holds exactly one node.
    fn nested(&mut self, statement: &Statement) -> NodeId {
        let mut nodes = self.statement(statement);
        match nodes.len() {
            0 => self.append(NodeKind::Empty, DataType::Void),
            1 => nodes.remove(0),
            _ => {
                let scope = self.scope;
                self.append(NodeKind::Block { body: nodes, scope }, DataType::Void)
            }
        }
    }
    fn import(&mut self, specifiers: &[String], source: &str) {
        let root = self.program.root_scope();
        for specifier in specifiers {
            match Builtin::from_name(specifier) {
                Some(builtin) => {
                    debug!("Importing {specifier} from {source}");
                    self.program
                        .scopes
                        .register(root, Symbol::builtin(builtin), false);
                }
                None if BuiltinFunction::from_name(specifier).is_some() => {
                    debug!("Importing function {specifier} from {source}");
                }
                None => self
                    .context
                    .unknown_construct(&format!("import {specifier} from '{source}'")),
            }
        }
    }
    fn variable_declaration(&mut self, constant: bool, declarators: &[ast::Declarator]) -> NodeId {
        let declarators = declarators
            .iter()
            .map(|d| self.declarator(constant, d))
            .collect();
        let kind = NodeKind::VariableDeclaration {
            constant,
            declarators,
        };
        self.append(kind, DataType::Void)
    }
    fn declarator(&mut self, constant: bool, declarator: &ast::Declarator) -> NodeId {
        let name = &declarator.name;
        let annotated = self.annotation(&declarator.annotation);
        let typ = match (annotated, &declarator.init) {
            (Some(typ), _) => typ,
            (None, Some(init)) => self.infer(init),
            (None, None) => DataType::Float,
        };
        let init = declarator.init.as_ref();

        if let Some(target) = init.and_then(referenced_name).filter(|_| constant) {
            let field = self
                .program
                .scopes
                .lookup(self.scope, target)
                .filter(|e| matches!(e.id.storage, StorageClass::Uniform | StorageClass::StorageBuffer))
                .map(|e| (e.id.name.clone(), e.id.typ));
            if let Some((field, field_typ)) = field {
                debug!("Aliasing {name} to field {field}");
                self.program.scopes.add_alias(self.scope, &field, name);
                let kind = NodeKind::VariableDeclarator {
                    name: name.clone(),
                    storage: StorageClass::Private,
                    init: None,
                    alias_of: Some(field),
                };
                return self.append(kind, field_typ);
            }
            self.program.scopes.add_alias(self.scope, target, name);
        }

        let root = self.scope == self.program.root_scope();
        if constant && root && is_constant_name(name) {
            let (value, runtime) = match init.and_then(static_value) {
                Some(value) => (value, false),
                None => {
                    let placeholder = CompileContext::define_placeholder(name);
                    (DefineValue::Placeholder(placeholder), true)
                }
            };
            self.context.add_define(Define {
                name: name.clone(),
                typ,
                value,
                runtime,
            });
            let symbol = Symbol::new(name, typ, StorageClass::UniformConstant);
            self.program.scopes.register(self.scope, symbol, false);
            let kind = NodeKind::VariableDeclarator {
                name: name.clone(),
                storage: StorageClass::UniformConstant,
                init: None,
                alias_of: None,
            };
            return self.append(kind, typ);
        }

        let symbol = Symbol::new(name, typ, StorageClass::Private);
        self.program.scopes.register(self.scope, symbol, false);
        let init = init.map(|e| self.expression(e));
        let kind = NodeKind::VariableDeclarator {
            name: name.clone(),
            storage: StorageClass::Private,
            init,
            alias_of: None,
        };
        self.append(kind, typ)
    }
    fn refine_return_type(&mut self, argument: &Expression) {
        let typ = self.infer(argument);
        let Some(frame) = self.functions.last_mut() else {
            return;
        };
        if !frame.refine {
            return;
        }
        frame.refine = false;
        let (scope, name) = (frame.declared_in, frame.name.clone());
        if let Some(entry) = self.program.scopes.lookup_function_mut(scope, &name) {
            entry.id.typ = typ;
        }
    }
    /// Transform a function; `entry` turns it into the niladic `main`.
    fn function(&mut self, function: &ast::FunctionDeclaration, entry: bool) -> NodeId {
        let name = if entry {
            "main".to_string()
        } else {
            function.name.clone()
        };
        let annotated = if entry {
            Some(DataType::Void)
        } else {
            self.annotation(&function.return_annotation)
        };
        let declared_in = self.scope;
        let symbol = Symbol::new(&name, annotated.unwrap_or(DataType::Void), StorageClass::Private);
        self.program.scopes.register(declared_in, symbol, true);
        self.functions.push(FunctionFrame {
            name: name.clone(),
            declared_in,
            refine: annotated.is_none(),
        });

        let scope = self.enter(ScopeKind::Function);
        let mut params = vec![];
        if !entry {
            for param in &function.params {
                let typ = self.annotation(&param.annotation).unwrap_or(DataType::Float);
                let symbol = Symbol::new(&param.name, typ, StorageClass::Private);
                self.program.scopes.register(scope, symbol, false);
                params.push(Param {
                    name: param.name.clone(),
                    typ,
                });
            }
        }
        let body = function
            .body
            .iter()
            .flat_map(|s| self.statement(s))
            .collect();
        self.leave();
        self.functions.pop();

        let typ = self
            .program
            .scopes
            .lookup_function(declared_in, &name)
            .map(|e| e.id.typ)
            .unwrap_or(DataType::Void);
        debug!("Function {name} returns {typ}");
        let kind = NodeKind::Function {
            name,
            params,
            body,
            scope,
            entry,
        };
        self.append(kind, typ)
    }
}

/// Kernel classes.
impl Transformer<'_> {
    fn kernel(&mut self, class: &ast::ClassDeclaration) -> Vec<NodeId> {
        debug!("Transforming kernel {}", class.name);
        let mut nodes = vec![];
        for decorator in &class.decorators {
            let numbers = decorator.numbers();
            let size = [0, 1, 2].map(|i| numbers.get(i).map_or(1, |n| n.max(1.0) as u32));
            match decorator.name.as_str() {
                "numthreads" => {
                    self.context.thread_group_size = size;
                    let [x, y, z] = size;
                    nodes.push(self.append(NodeKind::NumThreads { x, y, z }, DataType::Void));
                }
                "dispatch" => self.context.dispatch = size,
                other => self.context.unknown_construct(&format!("@{other}")),
            }
        }
        let mut methods = vec![];
        for member in &class.members {
            match member {
                ast::ClassMember::Field(field) => {
                    if let Some(node) = self.field(field) {
                        nodes.push(node);
                    }
                }
                ast::ClassMember::Method(method) => methods.push(method),
            }
        }
        // Helpers go first so that they are declared before `main` uses them.
        let is_main = |m: &&ast::FunctionDeclaration| m.decorators.iter().any(|d| d.name == "main");
        let (mains, helpers): (Vec<_>, Vec<_>) = methods.into_iter().partition(is_main);
        for method in helpers {
            nodes.push(self.function(method, false));
        }
        for method in mains {
            if self.entry_point {
                let message = format!("more than one @main method, `{}` is not the entry point", method.name);
                self.context.warn(DiagnosticKind::DuplicateEntryPoint, message);
                nodes.push(self.function(method, false));
            } else {
                self.entry_point = true;
                nodes.push(self.function(method, true));
            }
        }
        nodes
    }
    fn field(&mut self, field: &ast::Field) -> Option<NodeId> {
        let name = &field.name;
        let typ = self.annotation(&field.annotation).unwrap_or(DataType::Float);
        let mut input = None;
        let mut output = None;
        let mut shared = None;
        for decorator in &field.decorators {
            let count = decorator.numbers().first().map(|n| *n as u32);
            match decorator.name.as_str() {
                "in" => input = Some(count),
                "out" => output = Some(count),
                "shared" => shared = Some(count.unwrap_or(1)),
                other => self.context.unknown_construct(&format!("@{other} on {name}")),
            }
        }
        let root = self.program.root_scope();

        if let Some(length) = shared {
            self.context.global_declarations.push(GlobalDeclaration {
                name: name.clone(),
                typ,
                length,
                shared: true,
            });
            let symbol = Symbol::new(name, typ, StorageClass::Private);
            self.program.scopes.register(root, symbol, false);
            return None;
        }

        let storage = if typ.is_array() {
            StorageClass::StorageBuffer
        } else {
            StorageClass::Uniform
        };
        if input.is_some() && output.is_some() {
            self.context.need_pingpong = true;
        }
        let size = output.flatten().or(input.flatten());
        if let Some(length) = output {
            self.context.output = Some(OutputDescriptor::new(name, length.or(size)));
        }
        self.context.add_uniform(UniformDescriptor {
            name: name.clone(),
            typ,
            storage_class: storage,
            readonly: storage == StorageClass::Uniform || output.is_none() && input.is_some(),
            writeonly: output.is_some() && input.is_none(),
            size,
            binding: None,
        });
        self.program
            .scopes
            .register(root, Symbol::new(name, typ, storage), false);
        let declarator = NodeKind::VariableDeclarator {
            name: name.clone(),
            storage,
            init: None,
            alias_of: None,
        };
        let declarator = self.append(declarator, typ);
        let kind = NodeKind::VariableDeclaration {
            constant: false,
            declarators: vec![declarator],
        };
        Some(self.append(kind, DataType::Void))
    }
}

/// Expressions.
impl Transformer<'_> {
    fn expressions(&mut self, expressions: &[Expression]) -> Vec<NodeId> {
        expressions.iter().map(|e| self.expression(e)).collect()
    }
    fn identifier(&mut self, name: &str) -> NodeId {
        let resolved = self
            .program
            .scopes
            .lookup(self.scope, name)
            .map(|e| (e.id.name.clone(), e.id.typ, e.id.storage, e.id.builtin));
        let (name, typ, storage, builtin) = match resolved {
            Some(resolved) => resolved,
            None => match Builtin::from_name(name) {
                Some(b) => (name.to_string(), b.data_type(), StorageClass::Private, Some(b)),
                None => (name.to_string(), DataType::Float, StorageClass::Private, None),
            },
        };
        let kind = NodeKind::Identifier {
            name,
            storage,
            builtin,
        };
        self.append(kind, typ)
    }
    /// Name of the function that a callee expression refers to.
    fn callee(callee: &Expression) -> Option<&str> {
        match callee {
            Expression::Identifier(name) => Some(name),
            Expression::Member {
                object,
                property,
                computed: false,
            } if matches!(**object, Expression::This)
                || object.as_identifier() == Some("Math") =>
            {
                property.as_identifier()
            }
            _ => None,
        }
    }
    pub fn expression(&mut self, expression: &Expression) -> NodeId {
        let typ = self.infer(expression);
        let kind = match expression {
            Expression::Literal(Literal::String(_)) => return self.unknown("string literal"),
            Expression::Literal(literal) => NodeKind::Literal(literal.clone()),
            Expression::Identifier(name) => return self.identifier(name),
            Expression::This => return self.unknown("this"),
            Expression::Array(elements) => NodeKind::Array {
                elements: self.expressions(elements),
            },
            Expression::Binary {
                operator,
                left,
                right,
            } => NodeKind::Binary {
                operator: *operator,
                left: self.expression(left),
                right: self.expression(right),
            },
            Expression::Logical {
                operator,
                left,
                right,
            } => NodeKind::Logical {
                operator: *operator,
                left: self.expression(left),
                right: self.expression(right),
            },
            Expression::Unary { operator, argument } => NodeKind::Unary {
                operator: *operator,
                argument: self.expression(argument),
            },
            Expression::Update {
                operator,
                prefix,
                argument,
            } => NodeKind::Update {
                operator: *operator,
                prefix: *prefix,
                argument: self.expression(argument),
            },
            Expression::Assignment {
                operator,
                left,
                right,
            } => NodeKind::Assignment {
                operator: *operator,
                left: self.expression(left),
                right: self.expression(right),
            },
            Expression::Call { callee, arguments } => match Self::callee(callee) {
                Some(name) => NodeKind::Call {
                    callee: name.to_string(),
                    arguments: self.expressions(arguments),
                },
                None => return self.unknown("call of a computed function"),
            },
            Expression::Member {
                object,
                property,
                computed: true,
            } => NodeKind::Index {
                object: self.expression(object),
                index: self.expression(property),
            },
            Expression::Member {
                object, property, ..
            } => {
                let Some(name) = property.as_identifier() else {
                    return self.unknown("member access");
                };
                match &**object {
                    Expression::This => return self.identifier(name),
                    Expression::Identifier(math) if math == "Math" => match name {
                        "PI" => NodeKind::Literal(Literal::Number(std::f64::consts::PI)),
                        "E" => NodeKind::Literal(Literal::Number(std::f64::consts::E)),
                        _ => return self.unknown(&format!("Math.{name}")),
                    },
                    _ if is_swizzle(name) => NodeKind::Member {
                        object: self.expression(object),
                        property: name.to_string(),
                    },
                    _ => return self.unknown(&format!("property .{name}")),
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => NodeKind::Conditional {
                test: self.expression(test),
                consequent: self.expression(consequent),
                alternate: self.expression(alternate),
            },
            Expression::Unknown(kind) => return self.unknown(kind),
        };
        self.append(kind, typ)
    }
}
