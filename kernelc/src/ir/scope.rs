//! Symbol tables for the program, function and block levels.

use crate::ir::arena::Arena;
use crate::ir::arena::Handle;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::StorageClass;

pub type ScopeId = Handle<Scope>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
}

/// A declared name together with what is known about it.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub typ: DataType,
    pub storage: StorageClass,
    pub builtin: Option<Builtin>,
}

impl Symbol {
    pub fn new(name: &str, typ: DataType, storage: StorageClass) -> Self {
        Self {
            name: name.to_string(),
            typ,
            storage,
            builtin: None,
        }
    }
    pub fn builtin(builtin: Builtin) -> Self {
        Self {
            name: builtin.name().to_string(),
            typ: builtin.data_type(),
            storage: StorageClass::Private,
            builtin: Some(builtin),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScopeEntry {
    pub id: Symbol,
    /// Names that resolve to this entry. Non-empty only on entries added by
    /// [Scopes::add_alias], which are not reachable under `id.name`.
    pub alias: Vec<String>,
    pub is_function: bool,
}

impl ScopeEntry {
    pub fn is_alias(&self) -> bool {
        !self.alias.is_empty()
    }
    fn matches(&self, name: &str) -> bool {
        if self.is_alias() {
            self.alias.iter().any(|a| a == name)
        } else {
            self.id.name == name
        }
    }
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    entries: Vec<ScopeEntry>,
}

impl Scope {
    pub fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }
    /// Later declarations shadow earlier ones.
    fn find(&self, name: &str, function: bool) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, e)| !function || e.is_function)
            .find(|(_, e)| e.matches(name))
            .map(|(i, _)| i)
    }
}

/// Arena of scopes linked through parent handles.
#[derive(Clone, Debug, Default)]
pub struct Scopes {
    arena: Arena<Scope>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.arena.append(Scope {
            kind,
            parent,
            entries: vec![],
        })
    }
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }
    pub fn len(&self) -> usize {
        self.arena.len()
    }
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
    pub fn register(&mut self, scope: ScopeId, symbol: Symbol, is_function: bool) {
        self.arena[scope].entries.push(ScopeEntry {
            id: symbol,
            alias: vec![],
            is_function,
        });
    }
    fn locate(&self, scope: ScopeId, name: &str, function: bool) -> Option<(ScopeId, usize)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.arena[id];
            if let Some(index) = scope.find(name, function) {
                return Some((id, index));
            }
            current = scope.parent;
        }
        None
    }
    /// Walk from `scope` up to the root and return the first matching entry.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&ScopeEntry> {
        self.locate(scope, name, false)
            .map(|(id, index)| &self.arena[id].entries[index])
    }
    /// Like [Scopes::lookup] but only considers function entries.
    pub fn lookup_function(&self, scope: ScopeId, name: &str) -> Option<&ScopeEntry> {
        self.locate(scope, name, true)
            .map(|(id, index)| &self.arena[id].entries[index])
    }
    pub fn lookup_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut ScopeEntry> {
        let (id, index) = self.locate(scope, name, false)?;
        Some(&mut self.arena[id].entries[index])
    }
    pub fn lookup_function_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut ScopeEntry> {
        let (id, index) = self.locate(scope, name, true)?;
        Some(&mut self.arena[id].entries[index])
    }
    /// Declare `alias` in `scope` as another name for the entry visible as
    /// `target`. The alias goes out of scope with `scope`.
    ///
    /// Returns false when `target` is not visible.
    pub fn add_alias(&mut self, scope: ScopeId, target: &str, alias: &str) -> bool {
        let Some(entry) = self.lookup(scope, target) else {
            return false;
        };
        let entry = ScopeEntry {
            id: entry.id.clone(),
            alias: vec![alias.to_string()],
            is_function: entry.is_function,
        };
        self.arena[scope].entries.push(entry);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(name: &str) -> Symbol {
        Symbol::new(name, DataType::Float, StorageClass::Private)
    }

    #[test]
    fn test_lookup_walks_upward() {
        let mut scopes = Scopes::new();
        let root = scopes.push(ScopeKind::Program, None);
        let func = scopes.push(ScopeKind::Function, Some(root));
        let block = scopes.push(ScopeKind::Block, Some(func));

        scopes.register(root, Symbol::new("x", DataType::Int32, StorageClass::Private), false);
        scopes.register(func, float("y"), false);
        assert_eq!(scopes.lookup(block, "x").unwrap().id.typ, DataType::Int32);
        assert_eq!(scopes.lookup(block, "y").unwrap().id.typ, DataType::Float);
        assert!(scopes.lookup(root, "y").is_none());

        // Shadowing.
        scopes.register(block, Symbol::new("x", DataType::Vector2Float, StorageClass::Private), false);
        assert_eq!(scopes.lookup(block, "x").unwrap().id.typ, DataType::Vector2Float);
        assert_eq!(scopes.lookup(func, "x").unwrap().id.typ, DataType::Int32);
    }

    #[test]
    fn test_alias() {
        let mut scopes = Scopes::new();
        let root = scopes.push(ScopeKind::Program, None);
        let func = scopes.push(ScopeKind::Function, Some(root));
        let field = Symbol::new("vectorA", DataType::FloatArray, StorageClass::StorageBuffer);
        scopes.register(root, field, false);

        assert!(scopes.add_alias(func, "vectorA", "a"));
        let entry = scopes.lookup(func, "a").unwrap();
        assert_eq!(entry.id.name, "vectorA");
        assert_eq!(entry.id.storage, StorageClass::StorageBuffer);
        assert_eq!(entry.alias, vec!["a".to_string()]);
        assert!(!scopes.add_alias(func, "missing", "b"));

        // The field itself is still found under its own name.
        assert!(!scopes.lookup(func, "vectorA").unwrap().is_alias());
    }

    #[test]
    fn test_alias_ends_with_its_scope() {
        let mut scopes = Scopes::new();
        let root = scopes.push(ScopeKind::Program, None);
        let func = scopes.push(ScopeKind::Function, Some(root));
        let block = scopes.push(ScopeKind::Block, Some(func));
        scopes.register(root, Symbol::new("data", DataType::FloatArray, StorageClass::StorageBuffer), false);

        assert!(scopes.add_alias(block, "data", "a"));
        assert_eq!(scopes.lookup(block, "a").unwrap().id.name, "data");
        assert!(scopes.lookup(func, "a").is_none());
        assert!(scopes.lookup(root, "a").is_none());

        // An alias in an inner scope shadows an outer variable of that name.
        scopes.register(func, float("b"), false);
        assert!(scopes.add_alias(block, "data", "b"));
        assert_eq!(scopes.lookup(block, "b").unwrap().id.typ, DataType::FloatArray);
        assert_eq!(scopes.lookup(func, "b").unwrap().id.typ, DataType::Float);
    }

    #[test]
    fn test_lookup_function() {
        let mut scopes = Scopes::new();
        let root = scopes.push(ScopeKind::Program, None);
        let func = scopes.push(ScopeKind::Function, Some(root));
        scopes.register(root, Symbol::new("sum", DataType::Int32, StorageClass::Private), true);
        scopes.register(func, float("sum"), false);

        assert!(!scopes.lookup(func, "sum").unwrap().is_function);
        let entry = scopes.lookup_function(func, "sum").unwrap();
        assert!(entry.is_function);
        assert_eq!(entry.id.typ, DataType::Int32);
    }
}
