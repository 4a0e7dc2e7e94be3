use std::ffi::{CStr, CString};
use std::fs;
use std::path::Path;

use crate::error::{Result, ShaderError};
use crate::stage::ShaderStage;

/// The GLSL text of one stage, checked so it can be handed to the driver as-is.
#[derive(Clone, Debug)]
pub struct ShaderSource {
    stage: ShaderStage,
    text: CString,
    origin: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, text: &str) -> Result<Self> {
        Self::with_origin(stage, text, "<embedded>")
    }

    /// Reads a stage from disk. The path is kept as the source's origin for log messages.
    pub fn from_file<P: AsRef<Path>>(stage: ShaderStage, path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            stage,
            path: path.to_path_buf(),
            source,
        })?;

        Self::with_origin(stage, &text, &path.display().to_string())
    }

    fn with_origin(stage: ShaderStage, text: &str, origin: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(ShaderError::EmptySource { stage });
        }

        let text = CString::new(text).map_err(|_| ShaderError::InteriorNul { stage })?;

        Ok(Self { stage, text, origin: origin.to_owned() })
    }

    pub fn stage(&self) -> ShaderStage { self.stage }

    pub fn origin(&self) -> &str { &self.origin }

    pub fn as_c_str(&self) -> &CStr { &self.text }

    pub fn as_str(&self) -> &str {
        // Built from a &str in `with_origin`, so this is always valid UTF-8
        self.text.to_str().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn blank_sources_are_rejected_with_their_stage() {
        let err = ShaderSource::new(ShaderStage::Fragment, "  \n\t").unwrap_err();
        assert!(matches!(err, ShaderError::EmptySource { stage: ShaderStage::Fragment }));
    }

    #[test]
    fn nul_bytes_are_rejected() {
        let err = ShaderSource::new(ShaderStage::Vertex, "void main() {}\0").unwrap_err();
        assert!(matches!(err, ShaderError::InteriorNul { stage: ShaderStage::Vertex }));
    }

    #[test]
    fn files_are_read_and_remember_their_path() {
        let path = std::env::temp_dir().join(format!("shader-source-{}.vert", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "#version 330 core\nvoid main() {{ gl_Position = vec4(0.0); }}").unwrap();

        let source = ShaderSource::from_file(ShaderStage::Vertex, &path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(source.origin(), path.display().to_string());
        assert!(source.as_str().starts_with("#version 330 core"));
    }

    #[test]
    fn missing_files_report_the_path() {
        let err = ShaderSource::from_file(ShaderStage::Fragment, "does/not/exist.frag").unwrap_err();

        match err {
            ShaderError::Io { stage, path, .. } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, Path::new("does/not/exist.frag"));
            }
            other => panic!("expected an io error, got {:?}", other),
        }
    }
}
