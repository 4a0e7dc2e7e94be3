use std::fmt;

use gl::types::GLenum;
use log::error;

use crate::context::{GlApi, ShaderId};
use crate::error::{Result, ShaderError};
use crate::source::ShaderSource;

/// The pipeline phase a piece of GLSL is written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex = gl::VERTEX_SHADER as isize,
    Fragment = gl::FRAGMENT_SHADER as isize,
}

impl ShaderStage {
    pub fn gl_enum(self) -> GLenum {
        self as GLenum
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// A shader object that compiled successfully. The GL object is deleted when this is dropped, so
/// a stage only lives as long as the program construction that needs it.
pub(crate) struct CompiledStage<'gl, G: GlApi> {
    gl: &'gl G,
    id: ShaderId,
}

impl<'gl, G: GlApi> CompiledStage<'gl, G> {
    pub fn compile(gl: &'gl G, source: &ShaderSource) -> Result<Self> {
        let stage = source.stage();
        // Wrap the handle straight away so the failure path deletes it too
        let compiled = Self { gl, id: gl.create_shader(stage) };

        if gl.compile_shader(compiled.id, source.as_c_str()) {
            return Ok(compiled);
        }

        let log = gl.shader_info_log(compiled.id);
        error!("{} shader `{}` failed to compile:\n{}", stage, source.origin(), log);

        Err(ShaderError::Compile { stage, log })
    }

    pub fn id(&self) -> ShaderId { self.id }
}

impl<'gl, G: GlApi> Drop for CompiledStage<'gl, G> {
    fn drop(&mut self) {
        self.gl.delete_shader(self.id);
    }
}
