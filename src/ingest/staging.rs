//! Scoped temp storage for uploaded videos.
//!
//! Decoders need a seekable file, so an upload stream is copied into a named
//! temp file first. The file is deleted when the `StagedVideo` is dropped, on
//! success, fatal decode errors and cancellation alike.

use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::VerifyError;

use super::file::FileConfig;

pub struct StagedVideo {
    file: NamedTempFile,
    bytes: u64,
}

impl StagedVideo {
    /// Copy `reader` into a temp file. `suffix` keeps the container extension
    /// (e.g. `.mov`) so the decoder can probe the format.
    pub fn from_reader<R: Read>(mut reader: R, suffix: &str) -> Result<Self, VerifyError> {
        let mut file = tempfile::Builder::new()
            .prefix("walkaround-")
            .suffix(suffix)
            .tempfile()?;
        let bytes = std::io::copy(&mut reader, &mut file)?;
        file.flush()?;
        log::debug!(
            "staged {} bytes of video at {}",
            bytes,
            file.path().display()
        );
        Ok(Self { file, bytes })
    }

    /// Suffix derived from an upload's original file name.
    pub fn suffix_for(file_name: &str) -> String {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub fn file_config(&self) -> FileConfig {
        FileConfig::from_path(self.path())
    }
}
