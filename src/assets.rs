//! Asset read/write capabilities and artifact path layout.
//!
//! The compiler never touches the filesystem directly; template resolution and
//! artifact output go through these traits so the registrar and tests can run
//! against in-memory units.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Read capability: returns the full text of an asset or signals "not found".
pub trait AssetReader: Sync {
    fn read(&self, path: &Path) -> Result<String, AssetError>;
}

/// Write capability for compiled artifacts.
pub trait AssetWriter: Sync {
    fn write(&self, path: &Path, contents: &str) -> Result<(), AssetError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILESYSTEM BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

pub struct FsAssets;

impl AssetReader for FsAssets {
    fn read(&self, path: &Path) -> Result<String, AssetError> {
        fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AssetError::NotFound(path.to_string_lossy().to_string())
            } else {
                AssetError::Io {
                    path: path.to_string_lossy().to_string(),
                    source: e,
                }
            }
        })
    }
}

impl AssetWriter for FsAssets {
    fn write(&self, path: &Path, contents: &str) -> Result<(), AssetError> {
        fs::write(path, contents).map_err(|e| AssetError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory asset store, used by tests and the napi bridge.
#[derive(Default)]
pub struct MemoryAssets {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }
}

impl AssetReader for MemoryAssets {
    fn read(&self, path: &Path) -> Result<String, AssetError> {
        self.get(path)
            .ok_or_else(|| AssetError::NotFound(path.to_string_lossy().to_string()))
    }
}

impl AssetWriter for MemoryAssets {
    fn write(&self, path: &Path, contents: &str) -> Result<(), AssetError> {
        self.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARTIFACT PATHS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiled-artifact marker inserted before the final extension.
pub const ARTIFACT_MARKER: &str = "verve";

/// `foo/bar.ts` -> `foo/bar.verve.ts`; extensionless paths get `.verve`.
pub fn artifact_path(path: &Path) -> PathBuf {
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => path.with_file_name(format!(
            "{}.{}.{}",
            stem.to_string_lossy(),
            ARTIFACT_MARKER,
            ext.to_string_lossy()
        )),
        _ => {
            let mut p = path.as_os_str().to_os_string();
            p.push(format!(".{}", ARTIFACT_MARKER));
            PathBuf::from(p)
        }
    }
}

/// Rewrites an import specifier to its compiled-artifact sibling.
/// Extensionless specifiers (the common module form) get `.verve` appended.
pub fn artifact_specifier(specifier: &str) -> String {
    let (dir, file) = match specifier.rfind('/') {
        Some(idx) => (&specifier[..=idx], &specifier[idx + 1..]),
        None => ("", specifier),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => format!(
            "{}{}.{}.{}",
            dir,
            &file[..dot],
            ARTIFACT_MARKER,
            &file[dot + 1..]
        ),
        _ => format!("{}{}.{}", dir, file, ARTIFACT_MARKER),
    }
}

/// Resolves a relative import specifier against the importing unit's directory,
/// defaulting to the `.ts` unit extension when the specifier has none.
pub fn resolve_sibling_unit(unit_path: &Path, specifier: &str) -> PathBuf {
    let dir = unit_path.parent().unwrap_or_else(|| Path::new(""));
    let mut resolved = dir.join(specifier);
    if resolved.extension().is_none() {
        resolved.set_extension("ts");
    }
    resolved
}

/// Resolves a template reference. An empty/auto reference shares the unit's
/// base name with a markup extension.
pub fn resolve_template_asset(unit_path: &Path, reference: Option<&str>) -> PathBuf {
    match reference {
        Some(rel) if !rel.is_empty() => unit_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(rel),
        _ => unit_path.with_extension("html"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path(Path::new("src/app.ts")),
            PathBuf::from("src/app.verve.ts")
        );
        assert_eq!(artifact_path(Path::new("app")), PathBuf::from("app.verve"));
    }

    #[test]
    fn test_artifact_specifier() {
        assert_eq!(artifact_specifier("./lib1"), "./lib1.verve");
        assert_eq!(artifact_specifier("./lib1.ts"), "./lib1.verve.ts");
        assert_eq!(artifact_specifier("../x/lib1.ts"), "../x/lib1.verve.ts");
    }

    #[test]
    fn test_resolve_template_asset() {
        assert_eq!(
            resolve_template_asset(Path::new("src/counter.ts"), None),
            PathBuf::from("src/counter.html")
        );
        assert_eq!(
            resolve_template_asset(Path::new("src/counter.ts"), Some("ui/c.html")),
            PathBuf::from("src/ui/c.html")
        );
    }

    #[test]
    fn test_memory_assets_roundtrip() {
        let assets = MemoryAssets::new();
        assets.insert("a.html", "<div/>");
        assert_eq!(assets.read(Path::new("a.html")).unwrap(), "<div/>");
        assert!(matches!(
            assets.read(Path::new("b.html")),
            Err(AssetError::NotFound(_))
        ));
    }
}
