//! Scratch space for staged uploads.
//!
//! Each upload is written to its own uniquely named file inside the upload folder,
//! so concurrent uploads of the same filename never share a path. The file is
//! deleted when its [`ScratchFile`] is dropped, whatever the request outcome.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory uploads are staged in before scanning and forwarding.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    /// Use `dir` as scratch space, creating it if missing.
    pub async fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty scratch file whose name ends with `-{sanitized_filename}`.
    ///
    /// `tempfile` opens the file with blocking calls, so creation runs on the
    /// blocking pool.
    pub async fn create(&self, sanitized_filename: &str) -> io::Result<ScratchFile> {
        let suffix = format!("-{}", sanitized_filename);
        let dir = self.dir.clone();
        let named = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)
        })
        .await
        .map_err(|e| io::Error::other(format!("scratch file task failed: {}", e)))??;
        let (file, path) = named.into_parts();

        tracing::debug!(path = %path.display(), "Scratch file created");
        Ok(ScratchFile {
            file: Some(fs::File::from_std(file)),
            path,
            bytes_written: 0,
        })
    }
}

/// A staged upload on disk. Removed from disk on drop.
#[derive(Debug)]
pub struct ScratchFile {
    file: Option<fs::File>,
    path: TempPath,
    bytes_written: u64,
}

impl ScratchFile {
    /// Append a chunk of the upload body.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "scratch file already finished")
        })?;
        file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the write handle. The file stays on disk until drop.
    pub async fn finish(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_written == 0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "Removing scratch file");
    }
}
