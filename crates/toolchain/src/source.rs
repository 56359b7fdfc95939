//! A source oracle backed by a local directory tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::DirEntry;
use pipeline::{
    CodeSample, Language, OracleError, OracleKind, OriginId, SourceConfig, SourceOracle, Timestamp,
};
use tracing::{debug, warn};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "__pycache__", "venv", "target", "dist"];

/// Files larger than this are skipped by default.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 256 * 1024;

/// Collects every recognised source file under `SourceConfig::location`.
///
/// Each file becomes one sample whose origin is its `file://` URL, so a file
/// is learned from once per process no matter how many sweeps see it.
/// Hidden directories and common dependency/build directories are skipped.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    max_file_bytes: u64,
}

impl Default for DirectorySource {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl DirectorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Lists candidate files under `root` in a stable (sorted) order.
    ///
    /// Fails only if `root` itself cannot be read. Unreadable directories and
    /// entries below it are logged and left out.
    async fn walk(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let children = list_dir(&dir, dir == root).await?;

            let mut subdirs = Vec::new();
            for entry in children {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with('.') {
                    continue;
                }
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "Cannot stat entry; skipping");
                        continue;
                    }
                };
                if file_type.is_dir() {
                    if !SKIPPED_DIRS.iter().any(|skipped| name == *skipped) {
                        subdirs.push(entry.path());
                    }
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
            // Reverse so the stack pops subdirectories in sorted order.
            pending.extend(subdirs.into_iter().rev());
        }
        Ok(files)
    }

    async fn read_sample(
        &self,
        path: &Path,
        source: &SourceConfig,
        language: Language,
    ) -> Option<CodeSample> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat source file; skipping");
                return None;
            }
        };
        if metadata.len() > self.max_file_bytes {
            debug!(
                path = %path.display(),
                bytes = metadata.len(),
                "Source file too large; skipping"
            );
            return None;
        }

        let code = match tokio::fs::read_to_string(path).await {
            Ok(code) => code,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Source file unreadable; skipping");
                return None;
            }
        };
        if code.trim().is_empty() {
            return None;
        }

        let origin = OriginId::new(format!("file://{}", path.display()))?;
        Some(CodeSample {
            origin,
            source: source.name.clone(),
            language,
            code,
            collected_at: Timestamp::now(),
        })
    }
}

/// Entries of `dir`, sorted by name. An unreadable root is an error; any
/// other unreadable directory yields no entries.
async fn list_dir(dir: &Path, is_root: bool) -> std::io::Result<Vec<DirEntry>> {
    match read_entries(dir).await {
        Ok(children) => Ok(children),
        Err(e) if is_root => Err(e),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot read directory; skipping");
            Ok(Vec::new())
        }
    }
}

async fn read_entries(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry);
    }
    children.sort_by_key(|entry| entry.file_name());
    Ok(children)
}

#[async_trait]
impl SourceOracle for DirectorySource {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError> {
        let root = PathBuf::from(&source.location);
        let files = self.walk(&root).await.map_err(|e| {
            OracleError::failed(
                OracleKind::Source,
                format!("cannot read directory '{}': {e}", root.display()),
            )
        })?;

        let mut samples = Vec::new();
        for path in files {
            let Some(detected) = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Language::from_extension)
            else {
                continue;
            };
            let language = source.language.unwrap_or(detected);
            if let Some(sample) = self.read_sample(&path, source, language).await {
                samples.push(sample);
            }
        }
        debug!(source = %source.name, samples = samples.len(), "Directory scanned");
        Ok(samples)
    }
}
