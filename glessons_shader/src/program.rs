use std::ffi::CString;
use std::path::Path;

use log::{error, info};

use crate::context::*;
use crate::error::{Result, ShaderError};
use crate::source::ShaderSource;
use crate::stage::{CompiledStage, ShaderStage};

/// Where a uniform lives in a linked program, if anywhere.
///
/// Names that were never declared, or that the compiler optimized away, are `NotFound`. Setting
/// those is allowed and does nothing, so the same frame code can drive shader variants that leave
/// out optional uniforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformSlot {
    Found(UniformLocation),
    NotFound,
}

impl From<UniformLocation> for UniformSlot {
    fn from(location: UniformLocation) -> Self {
        if location < 0 { UniformSlot::NotFound } else { UniformSlot::Found(location) }
    }
}

/// A linked vertex + fragment program.
///
/// Having one means linking succeeded; every failure is reported by the constructors instead, so
/// there is no way to bind or draw with a broken program. The GL program object is deleted when
/// this is dropped.
pub struct ShaderProgram<'gl, G: GlApi> {
    gl: &'gl G,
    id: ProgramId,
}

impl<'gl, G: GlApi> ShaderProgram<'gl, G> {
    /// Compiles and links a program from two embedded GLSL sources.
    pub fn new(gl: &'gl G, vertex: &str, fragment: &str) -> Result<Self> {
        let vertex = ShaderSource::new(ShaderStage::Vertex, vertex)?;
        let fragment = ShaderSource::new(ShaderStage::Fragment, fragment)?;

        Self::from_sources(gl, &vertex, &fragment)
    }

    pub fn from_files<P, Q>(gl: &'gl G, vertex: P, fragment: Q) -> Result<Self>
        where P: AsRef<Path>, Q: AsRef<Path>
    {
        let vertex = ShaderSource::from_file(ShaderStage::Vertex, vertex)?;
        let fragment = ShaderSource::from_file(ShaderStage::Fragment, fragment)?;

        Self::from_sources(gl, &vertex, &fragment)
    }

    /// Compiles both stages and links them.
    ///
    /// Both stages are always compiled so that each one's diagnostics reach the log, but a compile
    /// failure in either means no link is attempted and the first failure is returned. The shader
    /// objects are deleted before this returns, whatever the outcome.
    pub fn from_sources(gl: &'gl G, vertex: &ShaderSource, fragment: &ShaderSource) -> Result<Self> {
        debug_assert_eq!(vertex.stage(), ShaderStage::Vertex);
        debug_assert_eq!(fragment.stage(), ShaderStage::Fragment);

        let compiled_vertex = CompiledStage::compile(gl, vertex);
        let compiled_fragment = CompiledStage::compile(gl, fragment);
        let stages = [compiled_vertex?, compiled_fragment?];

        let program = Self { gl, id: gl.create_program() };

        for stage in &stages {
            gl.attach_shader(program.id, stage.id());
        }

        let linked = gl.link_program(program.id);

        for stage in &stages {
            gl.detach_shader(program.id, stage.id());
        }

        if !linked {
            let log = gl.program_info_log(program.id);
            error!(
                "shader program (vertex: `{}`, fragment: `{}`) failed to link:\n{}",
                vertex.origin(), fragment.origin(), log
            );

            return Err(ShaderError::Link { log });
        }

        info!(
            "shader program {} (vertex: `{}`, fragment: `{}`) initialized",
            program.id, vertex.origin(), fragment.origin()
        );

        Ok(program)
    }

    pub fn id(&self) -> ProgramId { self.id }

    /// Makes this the program used by subsequent draw calls on the context.
    ///
    /// Anything else may bind a different program in the meantime, so call this before each
    /// batch of draws that depends on it. Calling it repeatedly is harmless.
    pub fn set_used(&self) {
        self.gl.use_program(self.id);
    }

    pub fn uniform_slot(&self, name: &str) -> UniformSlot {
        match CString::new(name) {
            Ok(name) => self.gl.uniform_location(self.id, &name).into(),
            // No GLSL identifier contains a NUL
            Err(_) => UniformSlot::NotFound,
        }
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_slot(name) != UniformSlot::NotFound
    }

    /// Uploads `value` to the uniform `name`, or does nothing if the program has no such uniform.
    ///
    /// `glUniform*` writes to whichever program is bound, so if another program is bound this one
    /// is bound just for the upload and the other one is bound again afterwards. The context's
    /// bound program is the same before and after the call. The value stays in the program until
    /// overwritten, across frames and other programs' activity.
    pub fn set_uniform(&self, name: &str, value: UniformValue) {
        let location = match self.uniform_slot(name) {
            UniformSlot::Found(location) => location,
            UniformSlot::NotFound => return,
        };

        let previous = self.gl.current_program();
        if previous != self.id {
            self.gl.use_program(self.id);
        }

        self.gl.uniform(location, value);

        if previous != self.id {
            self.gl.use_program(previous);
        }
    }

    pub fn set_bool(&self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Bool(value));
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    pub fn set_vec2f(&self, name: &str, value: [f32; 2]) {
        self.set_uniform(name, UniformValue::Vec2(value));
    }

    pub fn set_vec3f(&self, name: &str, value: [f32; 3]) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    pub fn set_vec4f(&self, name: &str, value: [f32; 4]) {
        self.set_uniform(name, UniformValue::Vec4(value));
    }

    /// `matrix[column][row]`
    pub fn set_mat2fv(&self, name: &str, matrix: [[f32; 2]; 2]) {
        self.set_uniform(name, UniformValue::Mat2(matrix));
    }

    /// `matrix[column][row]`
    pub fn set_mat3fv(&self, name: &str, matrix: [[f32; 3]; 3]) {
        self.set_uniform(name, UniformValue::Mat3(matrix));
    }

    /// `matrix[column][row]`
    pub fn set_mat4fv(&self, name: &str, matrix: [[f32; 4]; 4]) {
        self.set_uniform(name, UniformValue::Mat4(matrix));
    }
}

impl<'gl, G: GlApi> Drop for ShaderProgram<'gl, G> {
    fn drop(&mut self) {
        self.gl.delete_program(self.id);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fake::FakeGl;

    const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;
out vec3 vertexColor;
uniform mat4 transform;
void main()
{
    gl_Position = transform * vec4(aPos, 1.0);
    vertexColor = aColor;
}
";

    const FILL: &str = "#version 330 core
in vec3 vertexColor;
out vec4 FragColor;
uniform bool flag;
uniform int mode;
uniform float alpha;
uniform vec2 offset;
uniform vec3 tint;
uniform vec4 factor;
uniform mat2 spin;
uniform mat3 basis;
uniform float unused;
void main()
{
    vec2 uv = spin * offset;
    vec3 color = basis * (vertexColor * tint);
    if (flag) color = color.zyx;
    color *= float(mode) + uv.x;
    FragColor = vec4(color, alpha) * factor;
}
";

    const OUTLINE: &str = "#version 330 core
out vec4 FragColor;
uniform vec4 factor;
void main()
{
    FragColor = vec4(1.0) - factor;
}
";

    #[test]
    fn linked_program_accepts_every_uniform_type() {
        let gl = FakeGl::new();
        let program = ShaderProgram::new(&gl, VERTEX, FILL).unwrap();
        let id = program.id();

        program.set_used();
        program.set_bool("flag", true);
        program.set_int("mode", 3);
        program.set_float("alpha", 0.25);
        program.set_vec2f("offset", [1.0, 2.0]);
        program.set_vec3f("tint", [0.1, 0.2, 0.3]);
        program.set_vec4f("factor", [1.0, 0.5, 0.0, 1.0]);
        program.set_mat2fv("spin", [[0.0, 1.0], [-1.0, 0.0]]);
        program.set_mat3fv("basis", [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

        let transform = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.5, -0.5, 0.0, 1.0],
        ];
        program.set_mat4fv("transform", transform);

        assert_eq!(gl.uniform_value(id, "flag"), Some(UniformValue::Bool(true)));
        assert_eq!(gl.uniform_value(id, "mode"), Some(UniformValue::Int(3)));
        assert_eq!(gl.uniform_value(id, "alpha"), Some(UniformValue::Float(0.25)));
        assert_eq!(gl.uniform_value(id, "offset"), Some(UniformValue::Vec2([1.0, 2.0])));
        assert_eq!(gl.uniform_value(id, "tint"), Some(UniformValue::Vec3([0.1, 0.2, 0.3])));
        assert_eq!(gl.uniform_value(id, "factor"), Some(UniformValue::Vec4([1.0, 0.5, 0.0, 1.0])));
        assert_eq!(gl.uniform_value(id, "spin"), Some(UniformValue::Mat2([[0.0, 1.0], [-1.0, 0.0]])));
        assert_eq!(gl.uniform_value(id, "transform"), Some(UniformValue::Mat4(transform)));
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn vertex_compile_errors_are_tagged_vertex() {
        let gl = FakeGl::new();
        let broken = VERTEX.replace("vertexColor = aColor;", "vertexColor = aColor");

        match ShaderProgram::new(&gl, &broken, FILL) {
            Err(ShaderError::Compile { stage, log }) => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(log.contains("0:9(1)"), "{}", log);
            }
            Err(other) => panic!("expected a compile error, got {:?}", other),
            Ok(_) => panic!("a broken vertex shader linked"),
        };
    }

    #[test]
    fn fragment_compile_errors_are_tagged_fragment() {
        let gl = FakeGl::new();
        let broken = OUTLINE.replace("- factor;", "- factor");

        let err = ShaderProgram::new(&gl, VERTEX, &broken).err().unwrap();

        assert_eq!(err.stage(), Some(ShaderStage::Fragment));
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.programs_created(), 0);
    }

    #[test]
    fn vertex_error_wins_when_both_stages_fail() {
        let gl = FakeGl::new();
        let vertex = VERTEX.replace("vertexColor = aColor;", "vertexColor = aColor");
        let fragment = OUTLINE.replace("- factor;", "- factor");

        let err = ShaderProgram::new(&gl, &vertex, &fragment).err().unwrap();

        assert_eq!(err.stage(), Some(ShaderStage::Vertex));
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.programs_created(), 0);
    }

    #[test]
    fn error_messages_leave_the_info_log_to_the_log_output() {
        let gl = FakeGl::new();

        let broken = VERTEX.replace("vertexColor = aColor;", "vertexColor = aColor");
        let err = ShaderProgram::new(&gl, &broken, FILL).err().unwrap();
        assert_eq!(err.to_string(), "vertex shader failed to compile");

        let mismatched = OUTLINE.replace("out vec4 FragColor;", "in vec3 normal;\nout vec4 FragColor;");
        let err = ShaderProgram::new(&gl, VERTEX, &mismatched).err().unwrap();
        assert_eq!(err.to_string(), "shader program failed to link");
        match err {
            ShaderError::Link { log } => assert!(log.contains("`normal`"), "{}", log),
            other => panic!("expected a link error, got {:?}", other),
        }
    }

    #[test]
    fn compile_failures_never_reach_the_linker() {
        let gl = FakeGl::new();
        let broken = FILL.replace("uniform int mode;", "uniform int mode");

        assert!(ShaderProgram::new(&gl, VERTEX, &broken).is_err());
        assert_eq!(gl.programs_created(), 0);
    }

    #[test]
    fn link_errors_carry_the_linker_log() {
        let gl = FakeGl::new();
        let mismatched = OUTLINE.replace("out vec4 FragColor;", "in vec3 normal;\nout vec4 FragColor;");

        match ShaderProgram::new(&gl, VERTEX, &mismatched) {
            Err(ShaderError::Link { log }) => assert!(log.contains("`normal`"), "{}", log),
            Err(other) => panic!("expected a link error, got {:?}", other),
            Ok(_) => panic!("mismatched stages linked"),
        }

        // The half-built program object goes away with the error
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn no_shader_objects_outlive_construction() {
        let gl = FakeGl::new();

        let program = ShaderProgram::new(&gl, VERTEX, FILL).unwrap();
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 1);

        let _ = ShaderProgram::new(&gl, &VERTEX.replace(';', ""), FILL);
        assert_eq!(gl.live_shaders(), 0);

        let _ = ShaderProgram::new(&gl, VERTEX, &FILL.replace("in vec3 vertexColor;", "in vec3 other;"));
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 1);

        drop(program);
        assert_eq!(gl.live_programs(), 0);
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn unknown_uniforms_are_silent_noops() {
        let gl = FakeGl::new();
        let program = ShaderProgram::new(&gl, VERTEX, FILL).unwrap();
        program.set_used();
        program.set_float("alpha", 0.5);
        let uploads = gl.uploads();

        program.set_float("nonexistent_uniform", 1.0);
        program.set_float("with\0nul", 1.0);

        assert_eq!(gl.uploads(), uploads);
        assert_eq!(gl.uniform_value(program.id(), "alpha"), Some(UniformValue::Float(0.5)));
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn optimized_out_uniforms_are_not_found() {
        let gl = FakeGl::new();
        let program = ShaderProgram::new(&gl, VERTEX, FILL).unwrap();

        assert_eq!(program.uniform_slot("unused"), UniformSlot::NotFound);
        assert!(!program.has_uniform("unused"));
        assert!(program.has_uniform("factor"));

        let uploads = gl.uploads();
        program.set_float("unused", 2.0);
        assert_eq!(gl.uploads(), uploads);
    }

    #[test]
    fn programs_sharing_a_vertex_shader_keep_their_own_uniforms() {
        let gl = FakeGl::new();
        let fill = ShaderProgram::new(&gl, VERTEX, FILL).unwrap();
        let outline = ShaderProgram::new(&gl, VERTEX, OUTLINE).unwrap();

        fill.set_used();
        fill.set_vec4f("factor", [1.0, 0.0, 0.0, 1.0]);

        // The outline program is bound, but the write still goes to `fill`
        outline.set_used();
        fill.set_vec4f("factor", [0.0, 1.0, 0.0, 1.0]);
        outline.set_vec4f("factor", [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(gl.current_program(), outline.id());

        fill.set_used();

        assert_eq!(gl.uniform_value(fill.id(), "factor"), Some(UniformValue::Vec4([0.0, 1.0, 0.0, 1.0])));
        assert_eq!(gl.uniform_value(outline.id(), "factor"), Some(UniformValue::Vec4([0.0, 0.0, 1.0, 1.0])));
        assert!(!outline.has_uniform("alpha"));
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn setters_leave_the_bound_program_alone() {
        let gl = FakeGl::new();
        let fill = ShaderProgram::new(&gl, VERTEX, FILL).unwrap();
        let outline = ShaderProgram::new(&gl, VERTEX, OUTLINE).unwrap();

        outline.set_used();
        fill.set_vec4f("factor", [1.0, 0.0, 0.0, 1.0]);
        fill.set_mat4fv("transform", [[0.0; 4]; 4]);
        assert_eq!(gl.current_program(), outline.id());

        // Nothing bound stays nothing bound
        gl.use_program(0);
        fill.set_float("alpha", 0.5);
        assert_eq!(gl.current_program(), 0);

        assert_eq!(gl.uniform_value(fill.id(), "factor"), Some(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0])));
        assert_eq!(gl.uniform_value(fill.id(), "alpha"), Some(UniformValue::Float(0.5)));
        assert_eq!(gl.uniform_value(outline.id(), "factor"), None);
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn set_used_is_idempotent() {
        let gl = FakeGl::new();
        let program = ShaderProgram::new(&gl, VERTEX, OUTLINE).unwrap();
        program.set_vec4f("factor", [0.5; 4]);

        program.set_used();
        let once = (gl.current_program(), gl.uniform_value(program.id(), "factor"));
        program.set_used();
        let twice = (gl.current_program(), gl.uniform_value(program.id(), "factor"));

        assert_eq!(once, twice);
        assert_eq!(gl.current_program(), program.id());
    }

    #[test]
    fn empty_sources_fail_before_touching_the_context() {
        let gl = FakeGl::new();

        let err = ShaderProgram::new(&gl, VERTEX, "").err().unwrap();

        assert!(matches!(err, ShaderError::EmptySource { stage: ShaderStage::Fragment }));
        assert_eq!(gl.programs_created(), 0);
        assert_eq!(gl.live_shaders(), 0);
    }
}
