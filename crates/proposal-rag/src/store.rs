//! Immutable record store.
//!
//! Holds every section chunk with id and record indexes. Built once at
//! startup and shared read-only across the engine, so lookups need no locks.
//! Snapshots are JSON lines with a version header, append-only and rebuilt
//! offline when the source workbook changes.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::types::RecordChunk;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    version: u32,
    chunks: usize,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    chunks: Vec<RecordChunk>,
    by_id: HashMap<Uuid, usize>,
    by_record: HashMap<String, Vec<usize>>,
}

impl RecordStore {
    pub fn from_chunks(chunks: Vec<RecordChunk>) -> Self {
        let mut by_id = HashMap::with_capacity(chunks.len());
        let mut by_record: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, chunk) in chunks.iter().enumerate() {
            by_id.insert(chunk.id, i);
            by_record.entry(chunk.record_id.clone()).or_default().push(i);
        }
        Self {
            chunks,
            by_id,
            by_record,
        }
    }

    pub fn chunks(&self) -> &[RecordChunk] {
        &self.chunks
    }

    pub fn get(&self, id: Uuid) -> Option<&RecordChunk> {
        self.by_id.get(&id).map(|&i| &self.chunks[i])
    }

    /// All chunks belonging to one proposal.
    pub fn record_chunks(&self, record_id: &str) -> Vec<&RecordChunk> {
        self.by_record
            .get(record_id)
            .map(|indexes| indexes.iter().map(|&i| &self.chunks[i]).collect())
            .unwrap_or_default()
    }

    pub fn contains_record(&self, record_id: &str) -> bool {
        self.by_record.contains_key(record_id)
    }

    pub fn record_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_record.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn record_count(&self) -> usize {
        self.by_record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Write the snapshot: one header line, then one chunk per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create snapshot dir: {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create snapshot: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        let header = SnapshotHeader {
            version: SNAPSHOT_VERSION,
            chunks: self.chunks.len(),
        };
        serde_json::to_writer(&mut writer, &header)?;
        writer.write_all(b"\n")?;

        for chunk in &self.chunks {
            serde_json::to_writer(&mut writer, chunk)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        info!(chunks = self.chunks.len(), path = %path.display(), "Saved record store snapshot");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open snapshot: {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        let header_line = lines
            .next()
            .context("Snapshot is empty")?
            .context("Failed to read snapshot header")?;
        let header: SnapshotHeader =
            serde_json::from_str(&header_line).context("Invalid snapshot header")?;
        if header.version != SNAPSHOT_VERSION {
            bail!(
                "Unsupported snapshot version {} (expected {})",
                header.version,
                SNAPSHOT_VERSION
            );
        }

        let mut chunks = Vec::with_capacity(header.chunks);
        for line in lines {
            let line = line.context("Failed to read snapshot line")?;
            if line.trim().is_empty() {
                continue;
            }
            let chunk: RecordChunk =
                serde_json::from_str(&line).context("Invalid snapshot chunk")?;
            chunks.push(chunk);
        }

        info!(chunks = chunks.len(), path = %path.display(), "Loaded record store snapshot");
        Ok(Self::from_chunks(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(record_id: &str, section: &str) -> RecordChunk {
        RecordChunk {
            id: Uuid::new_v4(),
            record_id: record_id.to_string(),
            section: section.to_string(),
            fields: HashMap::from([("recording_label".to_string(), "001".to_string())]),
            decoded_fields: HashMap::from([("recording_label".to_string(), "Yes".to_string())]),
            risk_location: "Penang".to_string(),
            owner_name: "Somesh Das".to_string(),
            text: format!("Proposal {} – CCTV Security:\nCCTV Recording: Yes", record_id),
        }
    }

    #[test]
    fn indexes_by_record_and_id() {
        let c1 = chunk("MYJADEQT001", "cctv");
        let c2 = chunk("MYJADEQT001", "alarm");
        let c3 = chunk("MYJADEQT002", "cctv");
        let id1 = c1.id;
        let store = RecordStore::from_chunks(vec![c1, c2, c3]);

        assert_eq!(store.record_count(), 2);
        assert_eq!(store.record_chunks("MYJADEQT001").len(), 2);
        assert_eq!(store.record_ids(), vec!["MYJADEQT001", "MYJADEQT002"]);
        assert_eq!(store.get(id1).unwrap().section, "cctv");
        assert!(store.contains_record("MYJADEQT002"));
        assert!(!store.contains_record("MYJADEQT999"));
    }

    #[test]
    fn snapshot_round_trips() {
        let dir = std::env::temp_dir().join(format!("proposal-rag-test-{}", Uuid::new_v4()));
        let path = dir.join("store.jsonl");
        let store = RecordStore::from_chunks(vec![chunk("MYJADEQT001", "cctv")]);
        store.save(&path).unwrap();

        let loaded = RecordStore::load(&path).unwrap();
        assert_eq!(loaded.record_count(), 1);
        let restored = &loaded.record_chunks("MYJADEQT001")[0];
        assert_eq!(restored.decoded_fields["recording_label"], "Yes");
        assert_eq!(restored.fields["recording_label"], "001");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_future_snapshot_versions() {
        let dir = std::env::temp_dir().join(format!("proposal-rag-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.jsonl");
        std::fs::write(&path, "{\"version\":99,\"chunks\":0}\n").unwrap();

        assert!(RecordStore::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
