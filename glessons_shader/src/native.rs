use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::ptr::null;

use gl::types::*;

use crate::context::*;
use crate::stage::ShaderStage;

/// The real OpenGL driver, reached through the global function pointers of the `gl` crate.
///
/// It has no state of its own, so a single `static` instance can be shared by every program on the
/// context's thread. Nothing here is sound until [`NativeGl::load_with`] has run on a current
/// context.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeGl;

/// Shared instance for callers that need a `'static` context, like a windowing event loop.
pub static NATIVE_GL: NativeGl = NativeGl;

impl NativeGl {
    /// Loads the OpenGL function pointers with `loader`, typically the windowing library's
    /// `get_proc_address`.
    pub fn load_with<F>(loader: F) -> &'static NativeGl
        where F: FnMut(&'static str) -> *const c_void
    {
        gl::load_with(loader);
        &NATIVE_GL
    }

    pub fn version(&self) -> String {
        get_string(gl::VERSION)
    }

    pub fn renderer(&self) -> String {
        get_string(gl::RENDERER)
    }

    /// `GL_MAX_VERTEX_ATTRIBS`, normally 16.
    pub fn max_vertex_attribs(&self) -> i32 {
        let mut max = 0;
        unsafe { gl::GetIntegerv(gl::MAX_VERTEX_ATTRIBS, &mut max) };
        max
    }
}

impl GlApi for NativeGl {
    fn create_shader(&self, stage: ShaderStage) -> ShaderId {
        unsafe { gl::CreateShader(stage.gl_enum()) }
    }

    fn compile_shader(&self, shader: ShaderId, source: &CStr) -> bool {
        let mut success = 0;
        unsafe {
            gl::ShaderSource(shader, 1, &source.as_ptr(), null());
            gl::CompileShader(shader);
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success);
        }

        success != 0
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        let mut len = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };

        read_info_log(len, |cap, written, buf| unsafe {
            gl::GetShaderInfoLog(shader, cap, written, buf)
        })
    }

    fn delete_shader(&self, shader: ShaderId) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&self) -> ProgramId {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe { gl::DetachShader(program, shader) }
    }

    fn link_program(&self, program: ProgramId) -> bool {
        let mut success = 0;
        unsafe {
            gl::LinkProgram(program);
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
        }

        success != 0
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        let mut len = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };

        read_info_log(len, |cap, written, buf| unsafe {
            gl::GetProgramInfoLog(program, cap, written, buf)
        })
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn use_program(&self, program: ProgramId) {
        unsafe { gl::UseProgram(program) }
    }

    fn current_program(&self) -> ProgramId {
        let mut current = 0;
        unsafe { gl::GetIntegerv(gl::CURRENT_PROGRAM, &mut current) };
        current as ProgramId
    }

    fn uniform_location(&self, program: ProgramId, name: &CStr) -> UniformLocation {
        unsafe { gl::GetUniformLocation(program, name.as_ptr()) }
    }

    fn uniform(&self, location: UniformLocation, value: UniformValue) {
        unsafe {
            match value {
                UniformValue::Bool(b) => gl::Uniform1i(location, b as GLint),
                UniformValue::Int(i) => gl::Uniform1i(location, i),
                UniformValue::Float(x) => gl::Uniform1f(location, x),
                UniformValue::Vec2([x, y]) => gl::Uniform2f(location, x, y),
                UniformValue::Vec3([x, y, z]) => gl::Uniform3f(location, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => gl::Uniform4f(location, x, y, z, w),
                UniformValue::Mat2(m) =>
                    gl::UniformMatrix2fv(location, 1, gl::FALSE, m.as_ptr() as *const GLfloat),
                UniformValue::Mat3(m) =>
                    gl::UniformMatrix3fv(location, 1, gl::FALSE, m.as_ptr() as *const GLfloat),
                UniformValue::Mat4(m) =>
                    gl::UniformMatrix4fv(location, 1, gl::FALSE, m.as_ptr() as *const GLfloat),
            }
        }
    }
}

/// Fetches an info log of `len` bytes (including the terminator) through `fetch`, which receives
/// the buffer capacity, a slot for the number of bytes written, and the buffer itself.
fn read_info_log<F>(len: GLint, fetch: F) -> String
    where F: FnOnce(GLsizei, *mut GLsizei, *mut GLchar)
{
    if len <= 0 {
        return String::new();
    }

    let mut buf: Vec<u8> = vec![0; len as usize];
    let mut written: GLsizei = 0;
    fetch(len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    buf.truncate(written.max(0) as usize);

    String::from_utf8_lossy(&buf).trim_end().to_owned()
}

fn get_string(name: GLenum) -> String {
    let ptr = unsafe { gl::GetString(name) };
    if ptr.is_null() {
        return String::new();
    }

    unsafe { CStr::from_ptr(ptr as *const c_char) }
        .to_string_lossy()
        .into_owned()
}
