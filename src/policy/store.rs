use crate::data::Segment;
use crate::error::{EngineError, Result};
use crate::policy::selection::PolicyCandidate;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

//one persisted policy decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub segment_channel: String,
    pub segment_metric: String,
    pub window_days: usize,
    pub best_method: String,
    pub best_mean_wmape: f64,
    pub run_timestamp: DateTime<Utc>,
}

impl PolicyRecord {
    pub fn from_candidate(candidate: &PolicyCandidate, run_timestamp: DateTime<Utc>) -> Self {
        PolicyRecord {
            segment_channel: candidate.segment.channel.clone(),
            segment_metric: candidate.segment.metric.clone(),
            window_days: candidate.window_days,
            best_method: candidate.method.clone(),
            best_mean_wmape: candidate.mean_wmape,
            run_timestamp,
        }
    }

    pub fn segment(&self) -> Segment {
        Segment::new(self.segment_channel.clone(), self.segment_metric.clone())
    }
}

//stamps a batch of candidates with one run timestamp
pub fn stamp(candidates: &[PolicyCandidate], run_timestamp: DateTime<Utc>) -> Vec<PolicyRecord> {
    candidates
        .iter()
        .map(|c| PolicyRecord::from_candidate(c, run_timestamp))
        .collect()
}

//append-only json file of policy records
//
//the whole file is read, extended and written back on every persist; there is
//no locking, so runs against the same file must not overlap
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PolicyStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    //every record in the store; an absent or blank file holds none
    pub fn load(&self) -> Result<Vec<PolicyRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| EngineError::PolicyStoreCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    //appends a batch and writes the full union back; returns the new total
    pub fn persist(&self, batch: &[PolicyRecord]) -> Result<usize> {
        let mut records = self.load()?;
        records.extend_from_slice(batch);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, json)?;

        info!(
            path = %self.path.display(),
            added = batch.len(),
            total = records.len(),
            "policy store updated"
        );
        Ok(records.len())
    }

    //the record with the greatest run timestamp for every segment
    //equal timestamps resolve to the record appended last
    pub fn load_latest(&self) -> Result<Vec<PolicyRecord>> {
        let mut latest: IndexMap<Segment, PolicyRecord> = IndexMap::new();

        for record in self.load()? {
            let segment = record.segment();
            match latest.get(&segment) {
                Some(current) if current.run_timestamp > record.run_timestamp => {}
                _ => {
                    latest.insert(segment, record);
                }
            }
        }

        Ok(latest.into_values().collect())
    }
}
