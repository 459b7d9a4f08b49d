//! kernelc compiles GPGPU kernels to shading languages.
//!
//! A kernel is written once in a small TypeScript-flavoured language: a class
//! whose decorated fields are the buffers and parameters of the kernel and
//! whose `@main` method is the entry point. kernelc turns it into
//!
//! - GLSL ES 1.00, where the kernel runs as a fragment shader over textures
//!   (WebGL 1),
//! - GLSL 4.50 compute shaders (Vulkan), and
//! - WGSL compute shaders (WebGPU).
//!
//! The pipeline has three stages.
//! A [Frontend](frontend::Frontend) parses source into the generic
//! [ast](crate::ast).
//! The [Transformer] lowers that tree into a typed
//! [ShaderProgram](ir::ShaderProgram), resolving every identifier through a
//! chain of scopes and inferring a [DataType](ir::DataType) for every
//! expression.
//! Along the way it fills a [CompileContext] with what the host needs to
//! know: defines, uniforms, storage buffers, the output and the dispatch
//! geometry.
//! Finally a [CodeGenerator](targ3t::CodeGenerator) prints the program in
//! one dialect, inserting a cast wherever two operands disagree on their
//! type.
//!
//! The [Compiler] ties these together:
//!
//! ```
//! use kernelc::DefaultCompiler;
//! use kernelc::Target;
//!
//! let src = "
//! @numthreads(8)
//! class Double {
//!   @in @out
//!   data: float[];
//!
//!   @main
//!   compute() {
//!     const i = globalInvocationID.x;
//!     data[i] = data[i] * 2;
//!   }
//! }
//! ";
//! let mut compiler = DefaultCompiler::with_target(Target::Wgsl);
//! let wgsl = compiler.compile(src).unwrap();
//! assert!(wgsl.contains("@compute @workgroup_size(8, 1, 1)"));
//! assert!(compiler.context().need_pingpong);
//! ```

pub mod ast;
mod compile;
mod context;
mod error;
pub mod frontend;
pub mod infer;
pub mod ir;
pub mod targ3t;
#[cfg(feature = "test-utils")]
pub mod tester;
mod transform;

pub use compile::init_subscriber;
pub use compile::Compiler;
pub use compile::DefaultCompiler;
pub use compile::KernelBundle;
pub use context::CompileContext;
pub use context::Define;
pub use context::DefineValue;
pub use context::Diagnostic;
pub use context::DiagnosticKind;
pub use context::GlobalDeclaration;
pub use context::OutputDescriptor;
pub use context::UniformDescriptor;
pub use context::DEFINE_PLACEHOLDER_PREFIX;
pub use error::CompileError;
pub use targ3t::Target;
pub use transform::Transformer;
