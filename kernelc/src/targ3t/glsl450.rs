//! GLSL 4.50 for Vulkan compute pipelines.

use crate::context::CompileContext;
use crate::ir::Builtin;
use crate::ir::DataType;
use crate::ir::ShaderProgram;
use crate::targ3t::glsl;
use crate::targ3t::used_builtins;
use crate::targ3t::BindingCursor;
use crate::targ3t::CodeGenerator;
use crate::targ3t::Target;
use anyhow::Result;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Glsl450Generator {
    bindings: BindingCursor,
}

impl Glsl450Generator {
    pub fn new() -> Self {
        Self::default()
    }
}

fn builtin_source(builtin: Builtin) -> &'static str {
    match builtin {
        Builtin::GlobalInvocationId => "gl_GlobalInvocationID",
        Builtin::LocalInvocationId => "gl_LocalInvocationID",
        Builtin::WorkGroupId => "gl_WorkGroupID",
        Builtin::NumWorkGroups => "gl_NumWorkGroups",
        Builtin::WorkGroupSize => "gl_WorkGroupSize",
        Builtin::LocalInvocationIndex => "gl_LocalInvocationIndex",
    }
}

impl CodeGenerator for Glsl450Generator {
    fn target(&self) -> Target {
        Target::Glsl450
    }
    fn clear(&mut self) {
        self.bindings.reset();
    }
    fn type_name(&self, typ: DataType) -> String {
        glsl::type_name(typ, true)
    }
    fn generate(&mut self, program: &ShaderProgram, context: &mut CompileContext) -> Result<String> {
        self.clear();
        let block = self.bindings.assign(Target::Glsl450, context)?;
        let context = &*context;

        let mut header = vec!["#version 450".to_string()];
        header.extend(glsl::defines(self, context));
        let [x, y, z] = context.thread_group_size;
        header.push(format!(
            "layout(local_size_x = {x}, local_size_y = {y}, local_size_z = {z}) in;"
        ));
        if let Some(binding) = block {
            debug!("Uniform block at binding {binding}");
            let members = context
                .block_uniforms()
                .map(|u| format!("  {} {};", self.type_name(u.typ), u.name))
                .collect::<Vec<_>>()
                .join("\n");
            header.push(format!(
                "layout(std140, set = 0, binding = {binding}) uniform KernelParams {{\n{members}\n}};"
            ));
        }
        for buffer in context.storage_buffers() {
            let binding = buffer.binding.unwrap_or_default();
            let access = if buffer.readonly {
                "readonly "
            } else if buffer.writeonly {
                "writeonly "
            } else {
                ""
            };
            let element = self.type_name(buffer.typ.component());
            header.push(format!(
                "layout(std430, set = 0, binding = {binding}) {access}buffer KernelBuffer{binding} {{\n  {element} {}[];\n}};",
                buffer.name
            ));
        }
        header.extend(glsl::shared_arrays(self, context, "shared "));
        let builtins = used_builtins(program, false);
        header.extend(glsl::builtin_globals(self, &builtins));

        Ok(self.assemble(program, context, header))
    }
    fn entry_prologue(&self, program: &ShaderProgram, _context: &CompileContext, indent: i32) -> Vec<String> {
        let values: Vec<_> = used_builtins(program, false)
            .into_iter()
            .map(|b| (b, self.cast(b.data_type(), builtin_source(b))))
            .collect();
        glsl::assignments(&values, indent)
    }
}
