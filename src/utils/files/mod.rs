use crate::core::error::CleanupWarning;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Per-notebook directory holding the cleaned document and extracted source.
///
/// The directory name is unique per conversion, so concurrent conversions of
/// notebooks with the same base name never share paths. Dropping the value removes
/// the directory; [`ScratchSpace::close`] does the same and reports failures.
pub struct ScratchSpace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchSpace {
    pub fn create(parent: &Path, base_name: &str) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!(".nbproc-{}-", base_name))
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        Ok(ScratchSpace {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cleaned_document_path(&self, base_name: &str) -> PathBuf {
        self.path.join(format!("{}_cleaned.ipynb", base_name))
    }

    /// Remove the directory and everything in it.
    pub fn close(mut self) -> Option<CleanupWarning> {
        let dir = self.dir.take()?;
        dir.close().err().map(|e| CleanupWarning {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(path = %self.path.display(), error = %e, "scratch directory not removed");
            }
        }
    }
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

/// Files in `dir` (non-recursive) with the given extension, sorted by file name.
pub fn list_files_with_extension(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let wanted = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(wanted))
        .collect();
    files.sort();
    Ok(files)
}

/// File stem as an owned string, if it is valid UTF-8.
pub fn base_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
