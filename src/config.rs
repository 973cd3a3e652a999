/// Project-local configuration for the compiler's external tools and
/// output paths, loaded from an optional `Staq.toml` next to the source
/// file — the teacher's `conf.rs` keeps a single home-directory key/value
/// store; this crate has no need for a user-wide singleton, so it reads a
/// project-scoped TOML file instead, via the same `toml`+`serde` pair the
/// teacher already depends on.
use std::path::Path;

use serde::Deserialize;

use crate::errors::StaqError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaqConfig {
    pub assembler: String,
    pub linker: String,
    pub asm_path: String,
    pub object_path: String,
    pub binary_path: String,
}

impl Default for StaqConfig {
    fn default() -> Self {
        StaqConfig {
            assembler: "nasm".to_string(),
            linker: "ld".to_string(),
            asm_path: "output.asm".to_string(),
            object_path: "output.o".to_string(),
            binary_path: "./a.out".to_string(),
        }
    }
}

impl StaqConfig {
    /// Load `Staq.toml` from `dir` if present, falling back to defaults for
    /// any field it omits (or entirely, if the file doesn't exist).
    pub fn load(dir: &Path) -> Result<Self, StaqError> {
        let path = dir.join("Staq.toml");
        if !path.exists() {
            return Ok(StaqConfig::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| StaqError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| StaqError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
        })
    }
}
