use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::stage::ShaderStage;

pub type Result<T> = std::result::Result<T, ShaderError>;

/// Everything that can stop a [`ShaderProgram`](crate::ShaderProgram) from being built.
///
/// A missing uniform is deliberately absent from this list: setting one is a no-op, not a failure.
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("{stage} shader source is empty")]
    EmptySource { stage: ShaderStage },

    #[error("{stage} shader source contains a NUL byte")]
    InteriorNul { stage: ShaderStage },

    #[error("could not read {stage} shader {}: {source}", .path.display())]
    Io {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The driver rejected a stage. `log` is the compiler's info log, verbatim. It is already in
    /// the log output by the time this is returned, so it stays out of the message.
    #[error("{stage} shader failed to compile")]
    Compile { stage: ShaderStage, log: String },

    /// Both stages compiled but the program did not link.
    #[error("shader program failed to link")]
    Link { log: String },
}

impl ShaderError {
    /// The stage the error belongs to, or `None` for link failures.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            ShaderError::EmptySource { stage }
            | ShaderError::InteriorNul { stage }
            | ShaderError::Io { stage, .. }
            | ShaderError::Compile { stage, .. } => Some(*stage),
            ShaderError::Link { .. } => None,
        }
    }
}
