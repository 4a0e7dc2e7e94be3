//! The seam between shader programs and the OpenGL context they live in.
//!
//! OpenGL keeps most of its state in the current context: which program is bound, where each
//! uniform of each program points, and so on. Rather than calling `gl::*` functions from all over
//! the place, a [`ShaderProgram`](crate::ShaderProgram) only talks to the context through the
//! [`GlApi`] trait. [`NativeGl`](crate::NativeGl) forwards every call to the real driver; tests use
//! a software stand-in instead.
//!
//! The method set is the handful of entry points from [Shaders](learnopengl-shaders) that a
//! program needs and nothing more.
//!
//! [learnopengl-shaders]: https://learnopengl.com/Getting-started/Shaders

use std::ffi::CStr;

use gl::types::*;

use crate::stage::ShaderStage;

/// Name of a shader object, as returned by `glCreateShader`.
pub type ShaderId = GLuint;

/// Name of a program object, as returned by `glCreateProgram`. `0` means "no program".
pub type ProgramId = GLuint;

/// A uniform location. OpenGL uses `-1` for names that aren't active in the program.
pub type UniformLocation = GLint;

/// A value that can be uploaded to a uniform.
///
/// Matrices are stored column by column (`m[column][row]`), which is what OpenGL expects when the
/// `transpose` argument of `glUniformMatrix*fv` is `GL_FALSE`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat2([[f32; 2]; 2]),
    Mat3([[f32; 3]; 3]),
    Mat4([[f32; 4]; 4]),
}

/// The OpenGL calls a shader program is built from.
///
/// Every method acts on the context the implementor represents. Implementors for a real driver
/// may only be used on the thread that owns that context, while it is current.
pub trait GlApi {
    fn create_shader(&self, stage: ShaderStage) -> ShaderId;

    /// Uploads `source` and compiles it, returning the `GL_COMPILE_STATUS`.
    fn compile_shader(&self, shader: ShaderId, source: &CStr) -> bool;

    fn shader_info_log(&self, shader: ShaderId) -> String;

    fn delete_shader(&self, shader: ShaderId);

    fn create_program(&self) -> ProgramId;

    fn attach_shader(&self, program: ProgramId, shader: ShaderId);

    fn detach_shader(&self, program: ProgramId, shader: ShaderId);

    /// Links the attached stages, returning the `GL_LINK_STATUS`.
    fn link_program(&self, program: ProgramId) -> bool;

    fn program_info_log(&self, program: ProgramId) -> String;

    fn delete_program(&self, program: ProgramId);

    /// Binds `program` as the current program. `0` unbinds.
    fn use_program(&self, program: ProgramId);

    /// The program bound right now, `0` if none (`GL_CURRENT_PROGRAM`).
    fn current_program(&self) -> ProgramId;

    fn uniform_location(&self, program: ProgramId, name: &CStr) -> UniformLocation;

    /// Writes `value` to `location` of the *currently bound* program.
    fn uniform(&self, location: UniformLocation, value: UniformValue);
}
