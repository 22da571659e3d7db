use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Private copy of the user's image for the length of one session.
///
/// The file is written once here and removed on drop; analyses only read it.
pub struct StagedImage {
    file: NamedTempFile,
}

impl StagedImage {
    pub fn stage(source: &Path) -> Result<Self> {
        let suffix = source
            .extension()
            .and_then(|value| value.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("dfx-staged-")
            .suffix(&suffix)
            .tempfile()
            .context("failed to create staging file")?;
        let mut input =
            File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
        io::copy(&mut input, file.as_file_mut())
            .with_context(|| format!("failed to stage {}", source.display()))?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
