use crate::ast;
use crate::context::CompileContext;
use crate::context::DefineValue;
use crate::frontend::DefaultFrontend;
use crate::frontend::Frontend;
use crate::ir::ShaderProgram;
use crate::targ3t::create_generator;
use crate::targ3t::CodeGenerator;
use crate::targ3t::Target;
use crate::transform::Transformer;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::debug;
use tracing::error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;

pub fn init_subscriber(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_test_writer()
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Runs a [Frontend], the [Transformer] and the generator of the active
/// target.
///
/// Downstream crates can bring their own front end by implementing
/// [Frontend]; everything after the generic tree is shared.
pub struct Compiler<F: Frontend> {
    target: Target,
    generator: Box<dyn CodeGenerator>,
    context: CompileContext,
    dispatch: [u32; 3],
    frontend: PhantomData<F>,
}

/// Compiler for the default TypeScript-flavoured kernel language.
pub type DefaultCompiler = Compiler<DefaultFrontend>;

impl<F: Frontend> Default for Compiler<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Frontend> Compiler<F> {
    /// A compiler targeting GLSL 4.50.
    pub fn new() -> Self {
        Self::with_target(Target::Glsl450)
    }
    pub fn with_target(target: Target) -> Self {
        Self {
            target,
            generator: create_generator(target),
            context: CompileContext::new(),
            dispatch: [1, 1, 1],
            frontend: PhantomData,
        }
    }
    pub fn target(&self) -> Target {
        self.target
    }
    /// Switch the active generator. Resets the context.
    pub fn set_target(&mut self, target: Target) {
        debug!("Switching target to {target}");
        self.target = target;
        self.generator = create_generator(target);
        self.reset_context();
    }
    /// Dispatch size used when the kernel has no `@dispatch` attribute.
    pub fn set_dispatch(&mut self, dispatch: [u32; 3]) {
        self.dispatch = dispatch;
        self.context.dispatch = dispatch;
    }
    /// Context of the last compilation.
    pub fn context(&self) -> &CompileContext {
        &self.context
    }
    fn reset_context(&mut self) {
        self.context.clear();
        self.context.dispatch = self.dispatch;
    }
    pub fn parse(&self, src: &str) -> Result<ast::Program> {
        F::parse(src).inspect_err(|e| error!("{e}"))
    }
    /// Lower the generic tree into a fresh context.
    pub fn transform(&mut self, program: &ast::Program) -> ShaderProgram {
        self.reset_context();
        Transformer::new(&mut self.context).transform(program)
    }
    pub fn generate_code(&mut self, program: &ShaderProgram) -> Result<String> {
        self.generator.generate(program, &mut self.context)
    }
    /// Compile `src` for the active target.
    pub fn compile(&mut self, src: &str) -> Result<String> {
        let program = self.parse(src)?;
        let shader = self.transform(&program);
        let code = self.generate_code(&shader)?;
        debug!("Generated {} bytes of {}", code.len(), self.target);
        Ok(code)
    }
    /// Compile `src` once per target.
    ///
    /// The bundle holds the context of the last target. Whether or not
    /// compilation succeeds, the compiler ends up back on its previous
    /// target with a fresh context.
    pub fn compile_bundle(&mut self, src: &str, targets: &[Target]) -> Result<KernelBundle> {
        let previous = self.target;
        let bundle = self.compile_targets(src, targets);
        self.set_target(previous);
        bundle
    }
    fn compile_targets(&mut self, src: &str, targets: &[Target]) -> Result<KernelBundle> {
        let mut shaders = BTreeMap::new();
        for target in targets {
            self.set_target(*target);
            shaders.insert(*target, self.compile(src)?);
        }
        Ok(KernelBundle {
            shaders,
            context: self.context.clone(),
        })
    }
}

/// Shaders for several targets plus the context a host needs to run them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelBundle {
    pub shaders: BTreeMap<Target, String>,
    pub context: CompileContext,
}

/// Replace `token` where it is not part of a longer identifier.
fn replace_token(text: &str, token: &str, value: &str) -> String {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(position) = rest.find(token) {
        let end = position + token.len();
        out.push_str(&rest[..position]);
        if rest[end..].starts_with(is_word) {
            out.push_str(token);
        } else {
            out.push_str(value);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

impl KernelBundle {
    pub fn shader(&self, target: Target) -> Option<&str> {
        self.shaders.get(&target).map(String::as_str)
    }
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
    /// Fill in the value of the runtime define `name` in every shader.
    pub fn substitute_define(&mut self, name: &str, value: f64) -> Result<()> {
        let define = self
            .context
            .defines
            .iter_mut()
            .find(|d| d.name == name && d.runtime)
            .ok_or_else(|| anyhow::anyhow!("No runtime define named {name}"))?;
        define.value = DefineValue::Number(value);
        define.runtime = false;
        let typ = define.typ;

        let placeholder = CompileContext::define_placeholder(name);
        for (target, shader) in self.shaders.iter_mut() {
            let literal = create_generator(*target).scalar_literal(value, typ);
            *shader = replace_token(shader, &placeholder, &literal);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use indoc::indoc;

    const KERNEL: &str = indoc! {"
        import { globalInvocationID } from 'g-webgpu';

        const SIZE = getSize();

        @numthreads(4)
        class Fill {
          @out(16)
          data: float[];

          @main
          compute() {
            const i = globalInvocationID.x;
            data[i] = SIZE;
          }
        }
    "};

    #[test]
    fn test_replace_token() {
        let placeholder = CompileContext::define_placeholder("N");
        let text = format!("#define N {placeholder}\n#define NN {placeholder}N");
        assert_eq!(
            replace_token(&text, &placeholder, "4.0"),
            format!("#define N 4.0\n#define NN {placeholder}N")
        );
    }

    #[test]
    fn test_set_target_resets_context() {
        let mut compiler = DefaultCompiler::new();
        assert_eq!(compiler.target(), Target::Glsl450);
        compiler.set_dispatch([2, 1, 1]);
        compiler.compile(KERNEL).unwrap();
        assert_eq!(compiler.context().thread_group_size, [4, 1, 1]);
        assert_eq!(compiler.context().dispatch, [2, 1, 1]);

        compiler.set_target(Target::Wgsl);
        assert_eq!(compiler.target(), Target::Wgsl);
        assert!(compiler.context().defines.is_empty());
        assert_eq!(compiler.context().dispatch, [2, 1, 1]);
    }

    #[test]
    fn test_parse_error() {
        let mut compiler = DefaultCompiler::new();
        let err = compiler.compile("let = ;").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompileError>(),
            Some(CompileError::Syntax { .. })
        ));
    }

    #[test]
    fn test_bundle() {
        let mut compiler = DefaultCompiler::with_target(Target::Glsl100);
        let mut bundle = compiler.compile_bundle(KERNEL, &Target::ALL).unwrap();
        assert_eq!(compiler.target(), Target::Glsl100);
        assert_eq!(bundle.shaders.len(), 3);
        assert_eq!(bundle.context.uniform("data").unwrap().binding, Some(0));

        let placeholder = CompileContext::define_placeholder("SIZE");
        let wgsl = bundle.shader(Target::Wgsl).unwrap();
        assert!(wgsl.contains(&format!("const SIZE: f32 = {placeholder};")));

        let json = bundle.to_json().unwrap();
        assert!(json.contains(r#""wgsl":"#));
        assert_eq!(KernelBundle::from_json(&json).unwrap(), bundle);

        bundle.substitute_define("SIZE", 16.0).unwrap();
        assert!(bundle.shader(Target::Glsl450).unwrap().contains("#define SIZE 16.0"));
        assert!(bundle.shader(Target::Wgsl).unwrap().contains("const SIZE: f32 = 16.0;"));
        assert!(!bundle.context.define("SIZE").unwrap().runtime);
        assert!(bundle.substitute_define("SIZE", 1.0).is_err());
    }

    #[test]
    fn test_bundle_error_restores_target() {
        let mut compiler = DefaultCompiler::with_target(Target::Wgsl);
        compiler.set_dispatch([2, 1, 1]);
        assert!(compiler.compile_bundle("let = ;", &Target::ALL).is_err());
        assert_eq!(compiler.target(), Target::Wgsl);
        assert!(compiler.context().uniforms.is_empty());
        assert_eq!(compiler.context().dispatch, [2, 1, 1]);

        compiler.compile_bundle(KERNEL, &Target::ALL).unwrap();
        assert_eq!(compiler.target(), Target::Wgsl);
        assert!(compiler.context().uniforms.is_empty());
        let wgsl = compiler.compile(KERNEL).unwrap();
        assert!(wgsl.contains("@compute"));
    }
}
