use crate::error::CompileError;
use crate::ir::DataType;
use crate::ir::StorageClass;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

/// Prefix of the token that stands in for a define whose value is only known
/// at runtime.
pub const DEFINE_PLACEHOLDER_PREFIX: &str = "__DefineValuePlaceholder__";

/// State shared between the transformer and a code generator for one
/// compilation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileContext {
    pub thread_group_size: [u32; 3],
    pub dispatch: [u32; 3],
    pub defines: Vec<Define>,
    pub uniforms: Vec<UniformDescriptor>,
    pub global_declarations: Vec<GlobalDeclaration>,
    pub output: Option<OutputDescriptor>,
    pub need_pingpong: bool,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self {
            thread_group_size: [1, 1, 1],
            dispatch: [1, 1, 1],
            defines: vec![],
            uniforms: vec![],
            global_declarations: vec![],
            output: None,
            need_pingpong: false,
            diagnostics: vec![],
        }
    }
}

/// Value of a compile-time constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefineValue {
    Number(f64),
    Boolean(bool),
    /// Components of a vector or matrix literal. Booleans are stored as 0 or 1.
    Vector(Vec<f64>),
    /// Token to replace once the value is known.
    Placeholder(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: DataType,
    pub value: DefineValue,
    /// Whether the value is unknown at compile time.
    pub runtime: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: DataType,
    pub storage_class: StorageClass,
    pub readonly: bool,
    pub writeonly: bool,
    /// Element count from `@in(n)` or `@out(n)`.
    pub size: Option<u32>,
    /// Binding index assigned by the last generator with explicit bindings.
    pub binding: Option<u32>,
}

/// A fixed-size array in workgroup memory (`@shared(n)`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: DataType,
    pub length: u32,
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub name: String,
    /// Width and height of the texture that holds `length` texels.
    pub size: Option<[u32; 2]>,
    pub length: Option<u32>,
}

impl OutputDescriptor {
    pub fn new(name: &str, length: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            size: length.map(texture_extent),
            length,
        }
    }
}

/// Smallest near-square texture extent holding `length` texels.
pub fn texture_extent(length: u32) -> [u32; 2] {
    if length == 0 {
        return [1, 1];
    }
    let width = (length as f64).sqrt().ceil() as u32;
    let height = length.div_ceil(width);
    [width, height]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    UnknownConstruct,
    UnknownType,
    DuplicateEntryPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }
    /// Reset to a fresh context.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
    pub fn define_placeholder(name: &str) -> String {
        format!("{DEFINE_PLACEHOLDER_PREFIX}{name}")
    }
    pub fn define(&self, name: &str) -> Option<&Define> {
        self.defines.iter().find(|d| d.name == name)
    }
    /// Add a define, replacing an earlier one with the same name.
    pub fn add_define(&mut self, define: Define) {
        match self.defines.iter_mut().find(|d| d.name == define.name) {
            Some(existing) => *existing = define,
            None => self.defines.push(define),
        }
    }
    pub fn uniform(&self, name: &str) -> Option<&UniformDescriptor> {
        self.uniforms.iter().find(|u| u.name == name)
    }
    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut UniformDescriptor> {
        self.uniforms.iter_mut().find(|u| u.name == name)
    }
    /// Add a uniform descriptor, replacing an earlier one with the same name.
    pub fn add_uniform(&mut self, uniform: UniformDescriptor) {
        match self.uniform_mut(&uniform.name) {
            Some(existing) => *existing = uniform,
            None => self.uniforms.push(uniform),
        }
    }
    /// Fields that live in the shared uniform block.
    pub fn block_uniforms(&self) -> impl Iterator<Item = &UniformDescriptor> {
        self.uniforms
            .iter()
            .filter(|u| u.storage_class == StorageClass::Uniform)
    }
    pub fn storage_buffers(&self) -> impl Iterator<Item = &UniformDescriptor> {
        self.uniforms
            .iter()
            .filter(|u| u.storage_class == StorageClass::StorageBuffer)
    }
    pub fn is_output(&self, name: &str) -> bool {
        self.output.as_ref().is_some_and(|o| o.name == name)
    }
    pub fn warn(&mut self, kind: DiagnosticKind, message: String) {
        warn!("{message}");
        self.diagnostics.push(Diagnostic { kind, message });
    }
    pub fn unknown_construct(&mut self, kind: &str) {
        let error = CompileError::UnknownConstruct {
            kind: kind.to_string(),
        };
        self.warn(DiagnosticKind::UnknownConstruct, error.to_string());
    }
}
