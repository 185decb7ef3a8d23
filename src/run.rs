use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::artifact::{ArtifactRef, ArtifactStore, ArtifactVersion, VersionSpec};
use crate::error::{CleanError, Result};

// ---------------------------------------------------------------------------
// Run record – what gets persisted for provenance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Finished,
    Failed,
}

/// Provenance of one invocation: its configuration, the artifact versions it
/// read and the ones it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub job_type: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: Map<String, JsonValue>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub summary: JsonValue,
}

// ---------------------------------------------------------------------------
// Run context – handle passed through the step
// ---------------------------------------------------------------------------

/// One execution against an [`ArtifactStore`].
///
/// Created once per invocation and passed explicitly to the step; nothing in
/// the crate reaches for a global run.
pub struct RunContext<'a> {
    id: String,
    job_type: String,
    started_at: DateTime<Utc>,
    config: Map<String, JsonValue>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    store: &'a dyn ArtifactStore,
}

impl<'a> RunContext<'a> {
    pub fn new(store: &'a dyn ArtifactStore, job_type: impl Into<String>) -> Self {
        let started_at = Utc::now();
        let id = format!(
            "{}-{}",
            started_at.format("%Y%m%dT%H%M%S%.3fZ"),
            std::process::id()
        );
        RunContext {
            id,
            job_type: job_type.into(),
            started_at,
            config: Map::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &Map<String, JsonValue> {
        &self.config
    }

    /// Merge the fields of `config` into the run's recorded configuration.
    /// `config` must serialize to a JSON object.
    pub fn update_config<T: Serialize>(&mut self, config: &T) -> Result<()> {
        match serde_json::to_value(config)? {
            JsonValue::Object(fields) => {
                self.config.extend(fields);
                Ok(())
            }
            other => Err(CleanError::Argument(format!(
                "run config must be an object, got {other}"
            ))),
        }
    }

    /// Fetch an input artifact and record that this run used it.
    pub fn use_artifact(&mut self, reference: &str) -> Result<PathBuf> {
        let reference: ArtifactRef = reference.parse()?;
        let version = self.store.resolve(&reference)?;
        let path = self.store.retrieve(&ArtifactRef {
            name: version.name.clone(),
            version: VersionSpec::Version(version.version),
        })?;
        info!("Using artifact {}", version.tag());
        self.inputs.push(version.tag());
        Ok(path)
    }

    /// Register an output artifact and record that this run produced it.
    pub fn log_artifact(
        &mut self,
        path: &Path,
        name: &str,
        artifact_type: &str,
        description: &str,
    ) -> Result<ArtifactVersion> {
        let version = self.store.register(path, name, artifact_type, description)?;
        self.outputs.push(version.tag());
        Ok(version)
    }

    /// Close the run and persist its record.
    pub fn finish(self, status: RunStatus, summary: JsonValue) -> Result<RunRecord> {
        let record = RunRecord {
            id: self.id,
            job_type: self.job_type,
            status,
            started_at: self.started_at,
            finished_at: Utc::now(),
            config: self.config,
            inputs: self.inputs,
            outputs: self.outputs,
            summary,
        };
        self.store.record_run(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::LocalArtifactStore;
    use serde_json::json;

    #[test]
    fn test_update_config_merges_objects() {
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(scratch.path());
        let mut run = RunContext::new(&store, "basic_cleaning");

        run.update_config(&json!({"min_price": 10.0})).unwrap();
        run.update_config(&json!({"max_price": 350.0})).unwrap();
        assert_eq!(run.config().len(), 2);
        assert!(run.update_config(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_lineage_is_persisted() {
        let scratch = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(scratch.path().join("store"));
        let raw = scratch.path().join("sample.csv");
        std::fs::write(&raw, "price\n1\n").unwrap();
        store.register(&raw, "sample.csv", "raw_data", "raw").unwrap();

        let mut run = RunContext::new(&store, "basic_cleaning");
        let input = run.use_artifact("sample.csv:latest").unwrap();
        let out = scratch.path().join("clean.csv");
        std::fs::copy(&input, &out).unwrap();
        run.log_artifact(&out, "clean.csv", "clean_sample", "cleaned").unwrap();
        let id = run.id().to_string();

        let record = run.finish(RunStatus::Finished, json!({"rows": 1})).unwrap();
        assert_eq!(record.inputs, vec!["sample.csv:v0"]);
        assert_eq!(record.outputs, vec!["clean.csv:v0"]);

        let saved = std::fs::read_to_string(
            scratch.path().join("store").join("runs").join(format!("{id}.json")),
        )
        .unwrap();
        let parsed: RunRecord = serde_json::from_str(&saved).unwrap();
        assert_eq!(parsed, record);
    }
}
