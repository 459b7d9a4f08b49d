//! GLSL ES 1.00, for WebGL 1.
//!
//! WebGL 1 has no compute stage, so a kernel runs as a fragment shader over
//! a texture that holds the output. Every storage buffer is a texture read
//! through `getData<Name>` accessors and the output element is written to
//! `gl_FragColor`. The compute built-ins are reconstructed from the texel
//! that is being shaded.

use crate::context::CompileContext;
use crate::infer::BuiltinFunction;
use crate::ir::spaces;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::NodeId;
use crate::ir::NodeKind;
use crate::ir::ScalarKind;
use crate::ir::ShaderProgram;
use crate::targ3t::glsl;
use crate::targ3t::used_builtins;
use crate::targ3t::CodeGenerator;
use crate::targ3t::Target;
use anyhow::Result;

#[derive(Debug, Default)]
pub struct Glsl100Generator;

impl Glsl100Generator {
    pub fn new() -> Self {
        Self
    }
}

/// `vectorA` becomes `VectorA`.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const PRECISION: &[&str] = &[
    "#ifdef GL_FRAGMENT_PRECISION_HIGH",
    "  precision highp float;",
    "#else",
    "  precision mediump float;",
    "#endif",
];

const OUTPUT: &[&str] = &[
    "uniform vec2 u_OutputTextureSize;",
    "uniform int u_OutputTexelCount;",
    "varying vec2 v_TexCoord;",
];

const IMOD: &[&str] = &[
    "int imod(int x, int y) {",
    "  return x - y * (x / y);",
    "}",
];

const ADDRESS_TRANSLATION: &[&str] = &[
    "vec2 addrTranslation_1Dto2D(float address1D, vec2 texSize) {",
    "  float x = mod(address1D, texSize.x);",
    "  float y = floor(address1D / texSize.x);",
    "  return vec2((x + 0.5) / texSize.x, (y + 0.5) / texSize.y);",
    "}",
];

fn texture_accessors(name: &str) -> String {
    let getter = format!("getData{}", capitalize(name));
    let lines = [
        format!("uniform sampler2D {name};"),
        format!("uniform vec2 {name}Size;"),
        format!("vec4 {getter}(vec2 address2D) {{"),
        format!("  return vec4(texture2D({name}, address2D).rgba);"),
        "}".to_string(),
        format!("vec4 {getter}(float address1D) {{"),
        format!("  return {getter}(addrTranslation_1Dto2D(address1D, {name}Size));"),
        "}".to_string(),
        format!("vec4 {getter}(int address1D) {{"),
        format!("  return {getter}(float(address1D));"),
        "}".to_string(),
    ];
    lines.join("\n")
}

impl CodeGenerator for Glsl100Generator {
    fn target(&self) -> Target {
        Target::Glsl100
    }
    fn clear(&mut self) {}
    fn type_name(&self, typ: DataType) -> String {
        glsl::type_name(typ, false)
    }
    fn uint_suffix(&self) -> &'static str {
        ""
    }
    fn remainder(&self, typ: DataType, left: &str, right: &str) -> String {
        match typ.scalar_kind() {
            // No `trunc` before GLSL ES 3.00.
            Some(ScalarKind::Float) => {
                format!("({left} - {right} * (sign({left} / {right}) * floor(abs({left} / {right}))))")
            }
            _ => format!("imod({left}, {right})"),
        }
    }
    fn function_call(&self, name: &str, arguments: &[String]) -> String {
        match BuiltinFunction::from_name(name) {
            // A fragment shader has no workgroup to synchronize.
            Some(BuiltinFunction::Barrier) => String::new(),
            _ => format!("{name}({})", arguments.join(", ")),
        }
    }
    fn buffer_read(&self, _context: &CompileContext, name: &str, typ: DataType, index: &str) -> Option<String> {
        let swizzle = if typ == DataType::FloatArray { ".r" } else { "" };
        Some(format!("getData{}({index}){swizzle}", capitalize(name)))
    }
    fn output_write(&self, program: &ShaderProgram, context: &CompileContext, target: NodeId, value: &str) -> Option<String> {
        let NodeKind::Index { object, .. } = program[target].kind else {
            return None;
        };
        match &program[object].kind {
            NodeKind::Identifier { name, .. } if context.is_output(name) => {
                let value = match program[target].typ {
                    DataType::Vector4Float => value.to_string(),
                    _ => self.cast(DataType::Vector4Float, value),
                };
                Some(format!("gl_FragColor = {value}"))
            }
            _ => None,
        }
    }
    fn generate(&mut self, program: &ShaderProgram, context: &mut CompileContext) -> Result<String> {
        self.clear();
        let context = &*context;
        let mut header = vec![PRECISION.join("\n")];
        header.extend(glsl::defines(self, context));
        header.push(OUTPUT.join("\n"));
        header.push(IMOD.join("\n"));
        if context.storage_buffers().next().is_some() {
            header.push(ADDRESS_TRANSLATION.join("\n"));
        }
        for buffer in context.storage_buffers() {
            header.push(texture_accessors(&buffer.name));
        }
        for uniform in context.block_uniforms() {
            header.push(format!("uniform {} {};", self.type_name(uniform.typ), uniform.name));
        }
        header.extend(glsl::shared_arrays(self, context, ""));
        let builtins = used_builtins(program, true);
        header.extend(glsl::builtin_globals(self, &builtins));

        Ok(self.assemble(program, context, header))
    }
    fn entry_prologue(&self, _program: &ShaderProgram, context: &CompileContext, indent: i32) -> Vec<String> {
        let pad = spaces(indent);
        let [dx, dy, dz] = context.dispatch;
        let [sx, sy, sz] = context.thread_group_size;
        let width = dx * sx;
        let height = dy * sy;
        let mut lines = vec![
            format!(
                "{pad}int texelIndex = int(floor(v_TexCoord.x * u_OutputTextureSize.x)) + int(floor(v_TexCoord.y * u_OutputTextureSize.y)) * int(u_OutputTextureSize.x);"
            ),
            format!("{pad}if (texelIndex >= u_OutputTexelCount) {{"),
            format!("{pad}  discard;"),
            format!("{pad}}}"),
        ];
        let values = [
            (Builtin::NumWorkGroups, format!("ivec3({dx}, {dy}, {dz})")),
            (Builtin::WorkGroupSize, format!("ivec3({sx}, {sy}, {sz})")),
            (
                Builtin::GlobalInvocationId,
                format!(
                    "ivec3(imod(texelIndex, {width}), imod(texelIndex / {width}, {height}), texelIndex / {})",
                    width * height
                ),
            ),
            (
                Builtin::WorkGroupId,
                "globalInvocationID / workGroupSize".to_string(),
            ),
            (
                Builtin::LocalInvocationId,
                "globalInvocationID - workGroupID * workGroupSize".to_string(),
            ),
            (
                Builtin::LocalInvocationIndex,
                format!(
                    "localInvocationID.z * {} + localInvocationID.y * {sx} + localInvocationID.x",
                    sx * sy
                ),
            ),
        ];
        lines.extend(glsl::assignments(&values, indent));
        lines
    }
}
