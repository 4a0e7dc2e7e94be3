//! A small, safe wrapper around OpenGL shader programs.
//!
//! A [`ShaderProgram`] is built once from a vertex and a fragment stage, bound with
//! [`ShaderProgram::set_used`] before drawing, and fed uniforms through typed setters. All GL
//! traffic goes through the [`GlApi`] trait; [`NativeGl`] is the implementation backed by the `gl`
//! crate.
//!
//! ```no_run
//! use shader::{NativeGl, ShaderProgram};
//! # fn proc_address(_: &str) -> *const std::ffi::c_void { std::ptr::null() }
//!
//! let gl = NativeGl::load_with(|s| proc_address(s));
//! let program = ShaderProgram::from_files(gl, "shaders/colored.vert", "shaders/colored.frag")?;
//!
//! program.set_used();
//! program.set_vec4f("factor", [1.0, 0.5, 0.2, 1.0]);
//! # Ok::<(), shader::ShaderError>(())
//! ```

pub mod context;
pub mod error;
pub mod native;
pub mod program;
pub mod source;
pub mod stage;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use context::{GlApi, ProgramId, ShaderId, UniformLocation, UniformValue};
pub use error::{Result, ShaderError};
pub use native::{NativeGl, NATIVE_GL};
pub use program::{ShaderProgram, UniformSlot};
pub use source::ShaderSource;
pub use stage::ShaderStage;
