//! Data manifest helpers: which dated snapshots exist and which to show.

use serde::Serialize;
use top10_core::Error;

const LABEL_PREFIX: &str = "netflix_top10_";

/// Directory (relative to the site root) holding the dated JSON snapshots.
pub const SNAPSHOT_DIR: &str = "HTML_Json";

/// Snapshot file stems listed by `file_manifest.json`, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogManifest {
    files: Vec<String>,
}

/// One selectable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub file: String,
    pub label: String,
}

impl CatalogManifest {
    /// Parse the manifest body, a JSON array of file stems.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let mut files: Vec<String> =
            serde_json::from_slice(body).map_err(|e| Error::InvalidInput(format!("malformed data manifest: {e}")))?;
        files.sort_unstable_by(|a, b| b.cmp(a));
        Ok(Self { files })
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// The second-newest snapshot when there is more than one, since the
    /// newest is often still being filled in.
    pub fn default_selection(&self) -> Option<&str> {
        match self.files.as_slice() {
            [] => None,
            [only] => Some(only),
            [_, second, ..] => Some(second),
        }
    }

    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.files.iter().map(|file| CatalogEntry { file: file.clone(), label: label(file).to_string() }).collect()
    }
}

/// Display label for a file stem.
pub fn label(file: &str) -> &str {
    file.strip_prefix(LABEL_PREFIX).unwrap_or(file)
}

/// Path of a snapshot relative to the site root.
pub fn snapshot_path(file: &str) -> Result<String, Error> {
    let file = file.trim();
    if file.is_empty() {
        return Err(Error::InvalidInput("snapshot file must not be empty".into()));
    }
    if file.contains(['/', '\\', '?', '#']) || file.contains("..") {
        return Err(Error::InvalidInput(format!("invalid snapshot file: {file}")));
    }
    Ok(format!("{SNAPSHOT_DIR}/{file}.json"))
}
