//! Versioned artifact storage.
//!
//! The cleaning step only needs two things from a tracking system: fetch a
//! file for a logical reference, and record a new file under a name, type
//! and description.  [`ArtifactStore`] is that seam; [`LocalArtifactStore`]
//! keeps everything under one directory:
//!
//! ```text
//! <root>/artifacts/<name>/v<N>/<file>
//! <root>/artifacts/<name>/v<N>/manifest.json
//! <root>/runs/<run_id>.json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CleanError, Result};
use crate::run::RunRecord;

const MANIFEST_FILE: &str = "manifest.json";

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Version(u32),
}

/// `name`, `name:latest` or `name:v3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: VersionSpec,
}

impl FromStr for ArtifactRef {
    type Err = CleanError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = match s.rsplit_once(':') {
            None => (s, VersionSpec::Latest),
            Some((name, "latest")) => (name, VersionSpec::Latest),
            Some((name, tag)) => {
                let n = tag
                    .strip_prefix('v')
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(|| {
                        CleanError::Artifact(format!("invalid version '{tag}' in '{s}'"))
                    })?;
                (name, VersionSpec::Version(n))
            }
        };
        validate_name(name)?;
        Ok(ArtifactRef {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            VersionSpec::Latest => write!(f, "{}:latest", self.name),
            VersionSpec::Version(n) => write!(f, "{}:v{n}", self.name),
        }
    }
}

/// Names become directory names, so they must be a single path component.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':'])
    {
        return Err(CleanError::Artifact(format!("invalid artifact name '{name}'")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// One registered version of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
    pub file_name: String,
    /// Hex SHA-256 of the file contents.
    pub digest: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactVersion {
    /// `name:vN`
    pub fn tag(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The tracking system the step reads from and registers into.
pub trait ArtifactStore {
    /// Resolve a reference to a concrete version.
    fn resolve(&self, reference: &ArtifactRef) -> Result<ArtifactVersion>;

    /// Local path of the file behind `reference`.
    fn retrieve(&self, reference: &ArtifactRef) -> Result<PathBuf>;

    /// Record `path` as a new version of `name`.
    fn register(
        &self,
        path: &Path,
        name: &str,
        artifact_type: &str,
        description: &str,
    ) -> Result<ArtifactVersion>;

    /// Persist run provenance.
    fn record_run(&self, run: &RunRecord) -> Result<()>;
}

/// Filesystem-backed store rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join("artifacts").join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{version}"))
    }

    /// Registered versions of `name`, ascending.  A version directory only
    /// counts once its manifest has been written.
    pub fn versions(&self, name: &str) -> Result<Vec<u32>> {
        let dir = self.artifact_dir(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(n) = file_name
                .to_str()
                .and_then(|s| s.strip_prefix('v'))
                .and_then(|s| s.parse::<u32>().ok())
            else {
                continue;
            };
            if entry.path().join(MANIFEST_FILE).is_file() {
                versions.push(n);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn load_manifest(&self, name: &str, version: u32) -> Result<ArtifactVersion> {
        let path = self.version_dir(name, version).join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path).map_err(|_| {
            CleanError::Artifact(format!("artifact '{name}:v{version}' not found"))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            CleanError::Artifact(format!("corrupt manifest {}: {e}", path.display()))
        })
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn resolve(&self, reference: &ArtifactRef) -> Result<ArtifactVersion> {
        let version = match reference.version {
            VersionSpec::Version(n) => n,
            VersionSpec::Latest => *self
                .versions(&reference.name)?
                .last()
                .ok_or_else(|| {
                    CleanError::Artifact(format!("artifact '{}' not found", reference.name))
                })?,
        };
        self.load_manifest(&reference.name, version)
    }

    fn retrieve(&self, reference: &ArtifactRef) -> Result<PathBuf> {
        let manifest = self.resolve(reference)?;
        let path = self
            .version_dir(&manifest.name, manifest.version)
            .join(&manifest.file_name);
        if !path.is_file() {
            return Err(CleanError::Artifact(format!(
                "file for '{}' missing at {}",
                manifest.tag(),
                path.display()
            )));
        }
        debug!("resolved {reference} to {}", path.display());
        Ok(path)
    }

    fn register(
        &self,
        path: &Path,
        name: &str,
        artifact_type: &str,
        description: &str,
    ) -> Result<ArtifactVersion> {
        validate_name(name)?;
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| {
                CleanError::Artifact(format!("cannot register {}: no file name", path.display()))
            })?
            .to_string();

        let bytes = std::fs::read(path)?;
        let digest = calculate_digest(&bytes);

        let latest = self.versions(name)?.last().copied();
        if let Some(v) = latest {
            let current = self.load_manifest(name, v)?;
            if current.digest == digest
                && current.file_name == file_name
                && current.artifact_type == artifact_type
                && current.description == description
            {
                info!("Artifact {} unchanged, reusing it", current.tag());
                return Ok(current);
            }
        }

        let version = latest.map_or(0, |v| v + 1);
        let dir = self.version_dir(name, version);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(&file_name), &bytes)?;

        let manifest = ArtifactVersion {
            name: name.to_string(),
            version,
            artifact_type: artifact_type.to_string(),
            description: description.to_string(),
            file_name,
            digest,
            size: bytes.len() as u64,
            created_at: Utc::now(),
        };
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        info!("Registered artifact {} ({} bytes)", manifest.tag(), manifest.size);
        Ok(manifest)
    }

    fn record_run(&self, run: &RunRecord) -> Result<()> {
        let dir = self.root.join("runs");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(
            dir.join(format!("{}.json", run.id)),
            serde_json::to_string_pretty(run)?,
        )?;
        Ok(())
    }
}

/// Hex SHA-256 of `content`.
pub fn calculate_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_references() {
        let r: ArtifactRef = "sample.csv".parse().unwrap();
        assert_eq!(r.version, VersionSpec::Latest);
        let r: ArtifactRef = "sample.csv:latest".parse().unwrap();
        assert_eq!(r.name, "sample.csv");
        let r: ArtifactRef = "sample.csv:v12".parse().unwrap();
        assert_eq!(r.version, VersionSpec::Version(12));
        assert_eq!(r.to_string(), "sample.csv:v12");
    }

    #[test]
    fn test_reject_bad_references() {
        assert!("sample.csv:twelve".parse::<ArtifactRef>().is_err());
        assert!(":v1".parse::<ArtifactRef>().is_err());
        assert!("../etc:v1".parse::<ArtifactRef>().is_err());
        assert!("a/b".parse::<ArtifactRef>().is_err());
    }

    #[test]
    fn test_digest_consistency() {
        assert_eq!(calculate_digest(b"price\n1\n"), calculate_digest(b"price\n1\n"));
        assert_ne!(calculate_digest(b"price\n1\n"), calculate_digest(b"price\n2\n"));
        assert_eq!(calculate_digest(b"").len(), 64);
    }

    #[test]
    fn test_register_then_retrieve() {
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(scratch.path().join("store"));
        let file = scratch_file(&scratch, "clean.csv", "price\n50\n");

        let v0 = store.register(&file, "clean.csv", "clean_data", "cleaned").unwrap();
        assert_eq!(v0.version, 0);
        assert_eq!(v0.tag(), "clean.csv:v0");

        let path = store.retrieve(&"clean.csv:latest".parse().unwrap()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "price\n50\n");
    }

    #[test]
    fn test_versions_increment_and_identical_content_is_reused() {
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(scratch.path().join("store"));
        let file = scratch_file(&scratch, "clean.csv", "price\n50\n");

        let v0 = store.register(&file, "clean.csv", "clean_data", "d").unwrap();
        let again = store.register(&file, "clean.csv", "clean_data", "d").unwrap();
        assert_eq!(again.version, v0.version);

        std::fs::write(&file, "price\n60\n").unwrap();
        let v1 = store.register(&file, "clean.csv", "clean_data", "d").unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(store.versions("clean.csv").unwrap(), vec![0, 1]);

        let old = store.retrieve(&"clean.csv:v0".parse().unwrap()).unwrap();
        assert_eq!(std::fs::read_to_string(old).unwrap(), "price\n50\n");
        let latest = store.resolve(&"clean.csv".parse().unwrap()).unwrap();
        assert_eq!(latest.version, 1);
    }

    #[test]
    fn test_unknown_artifact() {
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(scratch.path());
        assert!(matches!(
            store.retrieve(&"missing.csv".parse().unwrap()),
            Err(CleanError::Artifact(_))
        ));
        assert!(matches!(
            store.retrieve(&"missing.csv:v3".parse().unwrap()),
            Err(CleanError::Artifact(_))
        ));
    }

    #[test]
    fn test_version_without_manifest_is_invisible() {
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(scratch.path());
        std::fs::create_dir_all(scratch.path().join("artifacts/x.csv/v0")).unwrap();
        assert!(store.versions("x.csv").unwrap().is_empty());
    }
}
