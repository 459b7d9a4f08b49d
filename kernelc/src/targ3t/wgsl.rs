//! WGSL for WebGPU.
//!
//! Constructs without a direct WGSL spelling are rewritten: `a ? b : c`
//! becomes `select`, updates and compound assignments are spelled out and
//! every loop becomes `loop` with a break on the negated condition.

use crate::ast::UpdateOperator;
use crate::context::CompileContext;
use crate::ir::spaces;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::NodeId;
use crate::ir::NodeKind;
use crate::ir::ShaderProgram;
use crate::ir::StorageClass;
use crate::targ3t::used_builtins;
use crate::targ3t::BindingCursor;
use crate::targ3t::CodeGenerator;
use crate::targ3t::Target;
use anyhow::Result;
use tracing::debug;

/// Name of the uniform block variable.
const PARAMS: &str = "kernelParams";

#[derive(Debug, Default)]
pub struct WgslGenerator {
    bindings: BindingCursor,
}

impl WgslGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Appended to a parameter the function body assigns to; the body then
/// works on a `var` copy under the original name.
const ARGUMENT_SUFFIX: &str = "_arg";

/// Name of the variable an assignment target ultimately writes to.
fn written_name(program: &ShaderProgram, target: NodeId) -> Option<&str> {
    match &program[target].kind {
        NodeKind::Identifier { name, .. } => Some(name),
        NodeKind::Member { object, .. } | NodeKind::Index { object, .. } => written_name(program, *object),
        _ => None,
    }
}

/// Parameters of `function` that are assigned or updated in its body.
fn assigned_params(program: &ShaderProgram, function: NodeId) -> Vec<String> {
    let NodeKind::Function { params, .. } = &program[function].kind else {
        return vec![];
    };
    let written: Vec<&str> = program
        .walk(function)
        .into_iter()
        .filter_map(|id| match &program[id].kind {
            NodeKind::Assignment { left, .. } => Some(*left),
            NodeKind::Update { argument, .. } => Some(*argument),
            _ => None,
        })
        .filter_map(|target| written_name(program, target))
        .collect();
    params
        .iter()
        .filter(|p| written.contains(&p.name.as_str()))
        .map(|p| p.name.clone())
        .collect()
}

/// Attribute and type of the entry point parameter carrying `builtin`.
fn builtin_parameter(builtin: Builtin) -> Option<(&'static str, &'static str)> {
    match builtin {
        Builtin::GlobalInvocationId => Some(("global_invocation_id", "vec3<u32>")),
        Builtin::LocalInvocationId => Some(("local_invocation_id", "vec3<u32>")),
        Builtin::WorkGroupId => Some(("workgroup_id", "vec3<u32>")),
        Builtin::NumWorkGroups => Some(("num_workgroups", "vec3<u32>")),
        Builtin::LocalInvocationIndex => Some(("local_invocation_index", "u32")),
        Builtin::WorkGroupSize => None,
    }
}

impl WgslGenerator {
    /// `loop` with an optional leading break on `!test`, an optional update
    /// and an optional trailing `break if` in the continuing block.
    #[allow(clippy::too_many_arguments)]
    fn lowered_loop(
        &self,
        program: &ShaderProgram,
        context: &CompileContext,
        test: Option<NodeId>,
        body: NodeId,
        update: Option<NodeId>,
        break_unless: Option<NodeId>,
        indent: i32,
    ) -> String {
        let pad = spaces(indent);
        let inner = spaces(indent + 1);
        let condition = |test: NodeId| {
            let text = self.generate_expression(program, context, test, Some(DataType::Boolean));
            self.negate(program, test, &text)
        };
        let mut lines = vec![format!("{pad}loop {{")];
        if let Some(test) = test {
            lines.push(format!("{inner}if ({}) {{ break; }}", condition(test)));
        }
        let statements = match &program[body].kind {
            NodeKind::Block { body, .. } => body.clone(),
            _ => vec![body],
        };
        let body = self.statements(program, context, &statements, indent + 1);
        if !body.is_empty() {
            lines.push(body);
        }
        let mut continuing = vec![];
        if let Some(update) = update {
            let update = self.generate_expression(program, context, update, None);
            continuing.push(format!("{}{update};", spaces(indent + 2)));
        }
        if let Some(test) = break_unless {
            continuing.push(format!("{}break if {};", spaces(indent + 2), condition(test)));
        }
        if !continuing.is_empty() {
            lines.push(format!("{inner}continuing {{"));
            lines.extend(continuing);
            lines.push(format!("{inner}}}"));
        }
        lines.push(format!("{pad}}}"));
        lines.join("\n")
    }
}

impl CodeGenerator for WgslGenerator {
    fn target(&self) -> Target {
        Target::Wgsl
    }
    fn clear(&mut self) {
        self.bindings.reset();
    }
    fn type_name(&self, typ: DataType) -> String {
        use DataType::*;
        let name = match typ {
            Void => "void",
            Float => "f32",
            Int32 => "i32",
            Uint32 => "u32",
            Boolean => "bool",
            Vector2Float => "vec2<f32>",
            Vector3Float => "vec3<f32>",
            Vector4Float => "vec4<f32>",
            Vector2Int => "vec2<i32>",
            Vector3Int => "vec3<i32>",
            Vector4Int => "vec4<i32>",
            Vector2Uint => "vec2<u32>",
            Vector3Uint => "vec3<u32>",
            Vector4Uint => "vec4<u32>",
            Vector2Boolean => "vec2<bool>",
            Vector3Boolean => "vec3<bool>",
            Vector4Boolean => "vec4<bool>",
            Matrix3x3Float => "mat3x3<f32>",
            Matrix4x4Float => "mat4x4<f32>",
            FloatArray => "array<f32>",
            Vector4FloatArray => "array<vec4<f32>>",
        };
        name.to_string()
    }
    fn identifier(&self, _context: &CompileContext, name: &str, storage: StorageClass) -> String {
        match storage {
            StorageClass::Uniform => format!("{PARAMS}.{name}"),
            _ => name.to_string(),
        }
    }
    fn remainder(&self, _typ: DataType, left: &str, right: &str) -> String {
        format!("({left} % {right})")
    }
    fn conditional(&self, test: &str, consequent: &str, alternate: &str) -> String {
        format!("select({alternate}, {consequent}, {test})")
    }
    fn function_call(&self, name: &str, arguments: &[String]) -> String {
        let name = match (name, arguments) {
            ("barrier", _) => return "workgroupBarrier()".to_string(),
            // GLSL `mod` floors the quotient where `%` truncates it.
            ("mod", [left, right]) => return format!("({left} - {right} * floor({left} / {right}))"),
            ("atan", [_, _]) => "atan2",
            ("inversesqrt", _) => "inverseSqrt",
            ("faceforward", _) => "faceForward",
            _ => name,
        };
        format!("{name}({})", arguments.join(", "))
    }
    fn update(&self, operator: UpdateOperator, _prefix: bool, argument: &str, typ: DataType) -> String {
        let one = self.scalar_literal(1.0, typ);
        format!("{argument} = {}", self.binary(operator.binary(), typ, argument, &one))
    }
    fn expand_compound(&self) -> bool {
        true
    }
    fn declaration(
        &self,
        program: &ShaderProgram,
        context: &CompileContext,
        declarator: NodeId,
        constant: bool,
        indent: i32,
    ) -> String {
        let node = &program[declarator];
        let NodeKind::VariableDeclarator { name, init, .. } = &node.kind else {
            return String::new();
        };
        let top_level = node.parent.and_then(|p| program[p].parent) == Some(program.root());
        let keyword = if top_level {
            "var<private>"
        } else if constant && init.is_some() {
            "let"
        } else {
            "var"
        };
        let pad = spaces(indent);
        let typ = self.type_name(node.typ);
        match init {
            Some(init) => {
                let value = self.generate_expression(program, context, *init, Some(node.typ));
                format!("{pad}{keyword} {name}: {typ} = {value};")
            }
            None => format!("{pad}{keyword} {name}: {typ};"),
        }
    }
    fn function_signature(&self, program: &ShaderProgram, context: &CompileContext, function: NodeId) -> String {
        let node = &program[function];
        let NodeKind::Function {
            name, params, entry, ..
        } = &node.kind
        else {
            return String::new();
        };
        if *entry {
            let [x, y, z] = context.thread_group_size;
            let params = used_builtins(program, false)
                .into_iter()
                .filter_map(builtin_parameter)
                .map(|(attribute, typ)| format!("@builtin({attribute}) {attribute}: {typ}"))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("@compute @workgroup_size({x}, {y}, {z})\nfn {name}({params})");
        }
        let assigned = assigned_params(program, function);
        let params = params
            .iter()
            .map(|p| {
                let suffix = if assigned.contains(&p.name) { ARGUMENT_SUFFIX } else { "" };
                format!("{}{suffix}: {}", p.name, self.type_name(p.typ))
            })
            .collect::<Vec<_>>()
            .join(", ");
        match node.typ {
            DataType::Void => format!("fn {name}({params})"),
            typ => format!("fn {name}({params}) -> {}", self.type_name(typ)),
        }
    }
    fn function_prologue(&self, program: &ShaderProgram, function: NodeId, indent: i32) -> Vec<String> {
        let NodeKind::Function { params, .. } = &program[function].kind else {
            return vec![];
        };
        let assigned = assigned_params(program, function);
        params
            .iter()
            .filter(|p| assigned.contains(&p.name))
            .map(|p| {
                let (pad, name, typ) = (spaces(indent), &p.name, self.type_name(p.typ));
                format!("{pad}var {name}: {typ} = {name}{ARGUMENT_SUFFIX};")
            })
            .collect()
    }
    fn entry_prologue(&self, program: &ShaderProgram, context: &CompileContext, indent: i32) -> Vec<String> {
        used_builtins(program, false)
            .into_iter()
            .map(|b| {
                let value = match builtin_parameter(b) {
                    Some((attribute, _)) => self.cast(b.data_type(), attribute),
                    None => {
                        let [x, y, z] = context.thread_group_size;
                        format!("vec3<i32>({x}, {y}, {z})")
                    }
                };
                format!("{}{} = {value};", spaces(indent), b.name())
            })
            .collect()
    }
    fn generate_statement(&self, program: &ShaderProgram, context: &CompileContext, id: NodeId, indent: i32) -> String {
        match &program[id].kind {
            NodeKind::For {
                init: Some(init),
                test,
                update,
                body,
                ..
            } => {
                let pad = spaces(indent);
                let init = self.generate_statement(program, context, *init, indent + 1);
                let lowered = self.lowered_loop(program, context, *test, *body, *update, None, indent + 1);
                if init.trim().is_empty() {
                    format!("{pad}{{\n{lowered}\n{pad}}}")
                } else {
                    format!("{pad}{{\n{init}\n{lowered}\n{pad}}}")
                }
            }
            NodeKind::For {
                init: None,
                test,
                update,
                body,
                ..
            } => self.lowered_loop(program, context, *test, *body, *update, None, indent),
            NodeKind::While { test, body } => {
                self.lowered_loop(program, context, Some(*test), *body, None, None, indent)
            }
            NodeKind::DoWhile { body, test } => {
                self.lowered_loop(program, context, None, *body, None, Some(*test), indent)
            }
            _ => self.common_statement(program, context, id, indent),
        }
    }
    fn generate(&mut self, program: &ShaderProgram, context: &mut CompileContext) -> Result<String> {
        self.clear();
        let block = self.bindings.assign(Target::Wgsl, context)?;
        let context = &*context;

        let mut header: Vec<String> = context
            .defines
            .iter()
            .map(|d| format!("const {}: {} = {};", d.name, self.type_name(d.typ), self.define_value(d)))
            .collect();
        if let Some(binding) = block {
            debug!("Uniform block at binding {binding}");
            let members = context
                .block_uniforms()
                .map(|u| format!("  {}: {},", u.name, self.type_name(u.typ)))
                .collect::<Vec<_>>()
                .join("\n");
            header.push(format!("struct KernelParams {{\n{members}\n}}"));
            header.push(format!(
                "@group(0) @binding({binding}) var<uniform> {PARAMS}: KernelParams;"
            ));
        }
        for buffer in context.storage_buffers() {
            let access = if buffer.readonly { "read" } else { "read_write" };
            header.push(format!(
                "@group(0) @binding({}) var<storage, {access}> {}: {};",
                buffer.binding.unwrap_or_default(),
                buffer.name,
                self.type_name(buffer.typ)
            ));
        }
        for global in context.global_declarations.iter().filter(|g| g.shared) {
            let element = self.type_name(global.typ.component());
            header.push(format!(
                "var<workgroup> {}: array<{element}, {}>;",
                global.name, global.length
            ));
        }
        for builtin in used_builtins(program, false) {
            header.push(format!(
                "var<private> {}: {};",
                builtin.name(),
                self.type_name(builtin.data_type())
            ));
        }

        Ok(self.assemble(program, context, header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::DefaultFrontend;
    use crate::frontend::Frontend;
    use crate::transform::Transformer;
    use indoc::indoc;

    fn generate(src: &str) -> String {
        let ast = DefaultFrontend::parse(src).unwrap();
        let mut context = CompileContext::new();
        let program = Transformer::new(&mut context).transform(&ast);
        WgslGenerator::new().generate(&program, &mut context).unwrap()
    }

    #[test]
    fn test_kernel() {
        let src = indoc! {"
            import { globalInvocationID } from 'g-webgpu';

            const AAA = 10;

            @numthreads(8, 1, 1)
            class Add {
              @in @out
              vectorA: float[];
              @in
              vectorB: float[];
              @in
              scale: vec2;

              @main
              compute() {
                const i = globalInvocationID.x;
                vectorA[i] = this.sum(vectorA[i], vectorB[i]) * scale.x + AAA;
              }

              sum(x: float, y: float): float {
                return x + y;
              }
            }
        "};
        let code = generate(src);
        assert!(code.contains("const AAA: f32 = 10.0;"));
        assert!(code.contains("@group(0) @binding(0) var<storage, read_write> vectorA: array<f32>;"));
        assert!(code.contains("@group(0) @binding(1) var<storage, read> vectorB: array<f32>;"));
        assert!(code.contains("struct KernelParams {\n  scale: vec2<f32>,\n}"));
        assert!(code.contains("@group(0) @binding(2) var<uniform> kernelParams: KernelParams;"));
        assert!(code.contains("var<private> globalInvocationID: vec3<i32>;"));
        assert!(code.contains(indoc! {"
            fn sum(x: f32, y: f32) -> f32 {
              return (x + y);
            }"}));
        assert!(code.contains(indoc! {"
            @compute @workgroup_size(8, 1, 1)
            fn main(@builtin(global_invocation_id) global_invocation_id: vec3<u32>) {
              globalInvocationID = vec3<i32>(global_invocation_id);
              let i: i32 = globalInvocationID.x;
              vectorA[i] = ((sum(vectorA[i], vectorB[i]) * kernelParams.scale.x) + AAA);
            }"}));
    }

    #[test]
    fn test_loops() {
        let src = indoc! {"
            function count(n: int): int {
              let total = 0;
              for (let i: int = 0; i < n; i++) {
                if (i % 2 == 0) {
                  continue;
                }
                total += i;
              }
              let j: int = 0;
              while (j < 10.5) {
                j++;
              }
              do {
                j--;
              } while (j > 0);
              return total;
            }
        "};
        let code = generate(src);
        let expected = indoc! {"
            fn count(n: i32) -> i32 {
              var total: f32 = 0.0;
              {
                var i: i32 = 0;
                loop {
                  if (!(i < n)) { break; }
                  if (((i % 2) == 0)) {
                    continue;
                  }
                  total = (total + f32(i));
                  continuing {
                    i = (i + 1);
                  }
                }
              }
              var j: i32 = 0;
              loop {
                if (!(j < i32(10.5))) { break; }
                j = (j + 1);
              }
              loop {
                j = (j - 1);
                continuing {
                  break if !(j > 0);
                }
              }
              return i32(total);
            }
        "};
        assert_eq!(code, expected);
    }

    #[test]
    fn test_select_and_vectors() {
        let src = indoc! {"
            import { localInvocationID, barrier } from 'g-webgpu';

            function pick(flag: bool): vec3 {
              const v = [1, 2, 3];
              return flag ? v : vec3(0.0);
            }

            @numthreads(64)
            class Reduce {
              @in @out
              data: float[];
              @shared(64)
              tile: float[];

              @main
              compute() {
                const lid = localInvocationID.x;
                tile[lid] = data[lid];
                barrier();
                data[lid] = tile[0];
              }
            }
        "};
        let code = generate(src);
        assert!(code.contains("  let v: vec3<f32> = vec3<f32>(1.0, 2.0, 3.0);"));
        assert!(code.contains("  return select(vec3<f32>(0.0), v, flag);"));
        assert!(code.contains("var<workgroup> tile: array<f32, 64>;"));
        assert!(code.contains("fn main(@builtin(local_invocation_id) local_invocation_id: vec3<u32>) {"));
        assert!(code.contains("  workgroupBarrier();"));
        assert!(code.contains("  data[lid] = tile[0];"));
    }
}
