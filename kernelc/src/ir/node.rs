use crate::ast::AssignmentOperator;
use crate::ast::BinaryOperator;
use crate::ast::Literal;
use crate::ast::LogicalOperator;
use crate::ast::UnaryOperator;
use crate::ast::UpdateOperator;
use crate::ir::arena::Arena;
use crate::ir::arena::Handle;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::ScopeId;
use crate::ir::ScopeKind;
use crate::ir::Scopes;
use crate::ir::StorageClass;
use std::ops::Index;

pub type NodeId = Handle<Node>;

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub typ: DataType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Program {
        body: Vec<NodeId>,
        scope: ScopeId,
    },
    /// Placeholder for statements that produce no output.
    Empty,
    NumThreads {
        x: u32,
        y: u32,
        z: u32,
    },
    VariableDeclaration {
        constant: bool,
        declarators: Vec<NodeId>,
    },
    VariableDeclarator {
        name: String,
        storage: StorageClass,
        init: Option<NodeId>,
        /// Set when the declarator only renames a kernel field.
        alias_of: Option<String>,
    },
    Function {
        name: String,
        params: Vec<Param>,
        body: Vec<NodeId>,
        scope: ScopeId,
        /// Whether this is the kernel entry point.
        entry: bool,
    },
    Block {
        body: Vec<NodeId>,
        scope: ScopeId,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
        scope: ScopeId,
    },
    While {
        test: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        test: NodeId,
    },
    Break,
    Continue,
    Return {
        argument: Option<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    /// A construct that was dropped with a diagnostic.
    Unknown {
        kind: String,
    },
    Literal(Literal),
    Identifier {
        name: String,
        storage: StorageClass,
        builtin: Option<Builtin>,
    },
    Array {
        elements: Vec<NodeId>,
    },
    Binary {
        operator: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    Logical {
        operator: LogicalOperator,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        operator: UnaryOperator,
        argument: NodeId,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: NodeId,
    },
    Assignment {
        operator: AssignmentOperator,
        left: NodeId,
        right: NodeId,
    },
    Call {
        callee: String,
        arguments: Vec<NodeId>,
    },
    /// Swizzle such as `v.xy`.
    Member {
        object: NodeId,
        property: String,
    },
    Index {
        object: NodeId,
        index: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
}

impl NodeKind {
    pub fn children(&self) -> Vec<NodeId> {
        use NodeKind::*;
        match self {
            Program { body, .. } | Block { body, .. } | Function { body, .. } => body.clone(),
            VariableDeclaration { declarators, .. } => declarators.clone(),
            VariableDeclarator { init, .. } => init.iter().copied().collect(),
            If {
                test,
                consequent,
                alternate,
            } => {
                let mut children = vec![*test, *consequent];
                children.extend(alternate);
                children
            }
            For {
                init,
                test,
                update,
                body,
                ..
            } => init
                .iter()
                .chain(test)
                .chain(update)
                .copied()
                .chain([*body])
                .collect(),
            While { test, body } | DoWhile { body, test } => vec![*test, *body],
            Return { argument } => argument.iter().copied().collect(),
            ExpressionStatement { expression } => vec![*expression],
            Array { elements } => elements.clone(),
            Binary { left, right, .. }
            | Logical { left, right, .. }
            | Assignment { left, right, .. } => vec![*left, *right],
            Unary { argument, .. } | Update { argument, .. } => vec![*argument],
            Call { arguments, .. } => arguments.clone(),
            Member { object, .. } => vec![*object],
            Index { object, index } => vec![*object, *index],
            Conditional {
                test,
                consequent,
                alternate,
            } => vec![*test, *consequent, *alternate],
            Empty | NumThreads { .. } | Break | Continue | Unknown { .. } | Literal(_) => vec![],
            Identifier { .. } => vec![],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Inferred or declared type. Statements are `Void`; functions carry
    /// their return type.
    pub typ: DataType,
    pub parent: Option<NodeId>,
}

/// The typed tree produced by the transformer.
///
/// Nodes live in an arena and refer to their children and parent through
/// handles.
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    nodes: Arena<Node>,
    pub scopes: Scopes,
    root: NodeId,
}

impl Default for ShaderProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderProgram {
    pub fn new() -> Self {
        let mut scopes = Scopes::new();
        let scope = scopes.push(ScopeKind::Program, None);
        let mut nodes = Arena::new();
        let root = nodes.append(Node {
            kind: NodeKind::Program {
                body: vec![],
                scope,
            },
            typ: DataType::Void,
            parent: None,
        });
        Self {
            nodes,
            scopes,
            root,
        }
    }
    pub fn root(&self) -> NodeId {
        self.root
    }
    pub fn root_scope(&self) -> ScopeId {
        match &self.nodes[self.root].kind {
            NodeKind::Program { scope, .. } => *scope,
            _ => panic!("root is not a program node"),
        }
    }
    /// Top-level statements.
    pub fn body(&self) -> &[NodeId] {
        match &self.nodes[self.root].kind {
            NodeKind::Program { body, .. } => body,
            _ => &[],
        }
    }
    /// Append a node and make it the parent of the children it refers to.
    pub fn append(&mut self, kind: NodeKind, typ: DataType) -> NodeId {
        let children = kind.children();
        let id = self.nodes.append(Node {
            kind,
            typ,
            parent: None,
        });
        for child in children {
            self.nodes[child].parent = Some(id);
        }
        id
    }
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        for child in kind.children() {
            self.nodes[child].parent = Some(id);
        }
        self.nodes[id].kind = kind;
    }
    pub fn set_type(&mut self, id: NodeId, typ: DataType) {
        self.nodes[id].typ = typ;
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }
    /// Nearest function node containing `id`.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id].parent;
        while let Some(node) = current {
            if matches!(self.nodes[node].kind, NodeKind::Function { .. }) {
                return Some(node);
            }
            current = self.nodes[node].parent;
        }
        None
    }
    pub fn function(&self, name: &str) -> Option<NodeId> {
        self.body().iter().copied().find(|id| {
            matches!(&self.nodes[*id].kind, NodeKind::Function { name: n, .. } if n == name)
        })
    }
    pub fn entry_point(&self) -> Option<NodeId> {
        self.body().iter().copied().find(|id| {
            matches!(self.nodes[*id].kind, NodeKind::Function { entry: true, .. })
        })
    }
    /// Whether any identifier in the tree refers to `builtin`.
    pub fn uses_builtin(&self, builtin: Builtin) -> bool {
        self.walk(self.root).into_iter().any(|id| {
            matches!(self.nodes[id].kind, NodeKind::Identifier { builtin: Some(b), .. } if b == builtin)
        })
    }
    /// Whether the tree calls the function `name`.
    pub fn calls(&self, name: &str) -> bool {
        self.walk(self.root).into_iter().any(|id| {
            matches!(&self.nodes[id].kind, NodeKind::Call { callee, .. } if callee == name)
        })
    }
    /// All nodes reachable from `id` in pre-order.
    pub fn walk(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = self.nodes[current].kind.children();
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

impl Index<NodeId> for ShaderProgram {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_links() {
        let mut program = ShaderProgram::new();
        let scope = program.scopes.push(ScopeKind::Function, Some(program.root_scope()));
        let one = program.append(NodeKind::Literal(Literal::Number(1.0)), DataType::Float);
        let ret = program.append(NodeKind::Return { argument: Some(one) }, DataType::Void);
        let func = program.append(
            NodeKind::Function {
                name: "f".to_string(),
                params: vec![],
                body: vec![ret],
                scope,
                entry: false,
            },
            DataType::Float,
        );
        let scope = program.root_scope();
        program.set_kind(
            program.root(),
            NodeKind::Program {
                body: vec![func],
                scope,
            },
        );

        assert_eq!(program[one].parent, Some(ret));
        assert_eq!(program[func].parent, Some(program.root()));
        assert_eq!(program.enclosing_function(one), Some(func));
        assert_eq!(program.function("f"), Some(func));
        assert_eq!(program.entry_point(), None);
        assert_eq!(program.walk(program.root()), vec![program.root(), func, ret, one]);
    }
}
