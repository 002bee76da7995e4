//! A JSON file-backed implementation of the [`ConfigStorage`][super::ConfigStorage] trait.
//!
//! The file is the one operators edit by hand; the [`ConfigWatcher`][super::ConfigWatcher]
//! picks those edits up while the server runs.
use crate::config::Config;
use crate::config_store::ConfigStorage;
use crate::error::Error;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A file-backed configuration store. Writes go to a sibling temporary file that is renamed
/// over the target, so a concurrent reader sees either the old or the new document in full.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn encode(config: &Config) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        config.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

#[async_trait::async_trait]
impl ConfigStorage for FileStorage {
    /// Read and parse the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be opened or read, and [`Error::InvalidJSON`] if
    /// its content doesn't parse.
    async fn load(&self) -> Result<Config, Error> {
        let mut f = File::open(&self.path).await?;
        let mut buf = vec![];
        f.read_to_end(&mut buf).await?;
        Ok(serde_json::from_slice(&buf)?)
    }

    /// Write the configuration as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the temporary file can't be written or renamed into place.
    async fn save(&self, config: &Config) -> Result<(), Error> {
        let data = Self::encode(config)?;
        let tmp_path = self.tmp_path();
        let mut output_file = File::create(&tmp_path).await?;
        output_file.write_all(&data).await?;
        output_file.sync_all().await?;
        drop(output_file);
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}
