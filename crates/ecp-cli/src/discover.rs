//! Candidate file discovery
//!
//! Walks a directory tree and yields every regular file, recursing only
//! when asked to. Filtering to the relevant suffixes is the caller's
//! concern. Discovery is all-or-nothing: an unreadable directory fails
//! the whole call rather than returning partial results.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::fs;

use crate::error::{CliError, Result};

/// A candidate input file produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File name without any directory component.
    pub name: String,
    /// Full path, rooted wherever the walk started.
    pub path: PathBuf,
}

/// List the regular files under `dir`, descending into subdirectories
/// only when `recursive` is set. The result is sorted by path so runs
/// are deterministic regardless of readdir order.
pub async fn find_in_dir(dir: &Path, recursive: bool) -> io::Result<Vec<InputFile>> {
    let mut files = Vec::new();
    walk(dir, recursive, &mut files).await?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk<'a>(
    dir: &'a Path,
    recursive: bool,
    out: &'a mut Vec<InputFile>,
) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if recursive {
                    walk(&entry.path(), recursive, out).await?;
                }
            } else if file_type.is_file() {
                out.push(InputFile {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path: entry.path(),
                });
            }
        }
        Ok(())
    })
}

/// Fail with [`CliError::NotADirectory`] unless `path` is a directory.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(CliError::NotADirectory(path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(CliError::NotADirectory(path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}
