//! Participant timeline persistence.
//!
//! The store holds every participant's [`TimelineData`] behind a [`RwLock`]
//! so an inspection path can read while the tick loop writes. Mutations go
//! through [`TimelineStore::commit`], which replaces the participant's record
//! and immediately flushes the whole document to disk.
//!
//! # File format
//!
//! ```text
//! {
//!   "version": 1,
//!   "savedAt": "2026-10-19T12:00:00Z",
//!   "participants": [
//!     { "participantId": "...", "completedEncounters": 0,
//!       "lastTriggerTime": null, "activeEvent": null, "history": [] }
//!   ]
//! }
//! ```
//!
//! Entries that fail to decode, or whose `participantId` is not a UUID, are
//! dropped one by one. A document that cannot be parsed at all yields an
//! empty store.
//!
//! Saves write a sibling `*.tmp` file and rename it over the target, so a
//! crash mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tomorrow_types::{ActiveEvent, EncounterRecord, ParticipantId, TimelineData};
use tracing::{debug, error, info, warn};

use crate::error::StoreError;

/// Version written into every saved document.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Suffix appended to the file name for the write-then-rename step.
const TEMP_SUFFIX: &str = ".tmp";

/// On-disk document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    version: u32,
    saved_at: DateTime<Utc>,
    participants: Vec<ParticipantRecord>,
}

/// On-disk participant entry.
///
/// `completed_encounters` is read as a signed value so a negative count from
/// a hand-edited file is clamped to zero instead of dropping the entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantRecord {
    participant_id: String,
    #[serde(default)]
    completed_encounters: i64,
    #[serde(default)]
    last_trigger_time: Option<u64>,
    #[serde(default)]
    active_event: Option<ActiveEvent>,
    #[serde(default)]
    history: Vec<EncounterRecord>,
}

impl ParticipantRecord {
    fn from_timeline(id: ParticipantId, data: &TimelineData) -> Self {
        Self {
            participant_id: id.to_string(),
            completed_encounters: i64::from(data.completed_encounters),
            last_trigger_time: data.last_trigger_time,
            active_event: data.active_event.clone(),
            history: data.history.clone(),
        }
    }

    fn into_timeline(self) -> Option<(ParticipantId, TimelineData)> {
        let id = ParticipantId::parse(&self.participant_id)?;
        let completed = u32::try_from(self.completed_encounters.max(0)).unwrap_or(u32::MAX);
        Some((
            id,
            TimelineData {
                completed_encounters: completed,
                last_trigger_time: self.last_trigger_time,
                active_event: self.active_event,
                history: self.history,
            },
        ))
    }
}

/// Keyed-by-participant timeline store with write-through persistence.
#[derive(Debug)]
pub struct TimelineStore {
    /// Backing file. `None` for an ephemeral store that never touches disk.
    path: Option<PathBuf>,
    /// Participant records.
    participants: RwLock<BTreeMap<ParticipantId, TimelineData>>,
}

impl TimelineStore {
    /// Load the store from `path`.
    ///
    /// A missing file yields an empty store. An unreadable or unparseable
    /// file is logged and also yields an empty store; the next save
    /// overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let participants = match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::decode(&contents) {
                Ok(participants) => {
                    info!(
                        path = %path.display(),
                        participants = participants.len(),
                        "Timeline store loaded"
                    );
                    participants
                }
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse timeline file, starting with an empty store"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Timeline file not found, starting fresh");
                BTreeMap::new()
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read timeline file, starting with an empty store"
                );
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            participants: RwLock::new(participants),
        }
    }

    /// Create a store that lives only in memory. [`save`](Self::save) is a
    /// no-op.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            participants: RwLock::new(BTreeMap::new()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Decode a timeline document, dropping malformed entries individually.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if `contents` is not JSON at all.
    pub fn decode(contents: &str) -> Result<BTreeMap<ParticipantId, TimelineData>, StoreError> {
        let document: serde_json::Value = serde_json::from_str(contents)?;
        let mut participants = BTreeMap::new();

        let Some(entries) = document.get("participants").and_then(|v| v.as_array()) else {
            warn!("Timeline document has no participants list");
            return Ok(participants);
        };

        for (index, entry) in entries.iter().enumerate() {
            let record = match ParticipantRecord::deserialize(entry) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "Dropping malformed timeline entry");
                    continue;
                }
            };
            let raw_id = record.participant_id.clone();
            match record.into_timeline() {
                Some((id, data)) => {
                    participants.insert(id, data);
                }
                None => {
                    warn!(index, participant_id = raw_id, "Dropping entry with invalid identity");
                }
            }
        }

        Ok(participants)
    }

    /// Encode participant records as a pretty-printed timeline document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails.
    pub fn encode(
        participants: &BTreeMap<ParticipantId, TimelineData>,
    ) -> Result<String, StoreError> {
        let document = StoreDocument {
            version: STORE_FORMAT_VERSION,
            saved_at: Utc::now(),
            participants: participants
                .iter()
                .map(|(id, data)| ParticipantRecord::from_timeline(*id, data))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Return the participant's record, creating an empty one on first
    /// reference. Creation alone is not persisted.
    pub fn get_or_create(&self, id: ParticipantId) -> TimelineData {
        let Ok(mut participants) = self.participants.write() else {
            error!(participant = %id, "Timeline store lock poisoned");
            return TimelineData::default();
        };
        participants.entry(id).or_default().clone()
    }

    /// Return the participant's record without creating one.
    pub fn get(&self, id: ParticipantId) -> Option<TimelineData> {
        let Ok(participants) = self.participants.read() else {
            return None;
        };
        participants.get(&id).cloned()
    }

    /// Replace the participant's record and flush the store to disk.
    ///
    /// The in-memory record is updated even if the flush fails.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the flush fails.
    pub fn commit(&self, id: ParticipantId, data: TimelineData) -> Result<(), StoreError> {
        if let Ok(mut participants) = self.participants.write() {
            participants.insert(id, data);
        } else {
            error!(participant = %id, "Timeline store lock poisoned, commit dropped");
        }
        self.save()
    }

    /// Write every record to disk (write-to-temp, then rename).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory, temp file, or rename
    /// fails, or [`StoreError::Serialization`] if encoding fails.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let contents = {
            let Ok(participants) = self.participants.read() else {
                error!("Timeline store lock poisoned, save skipped");
                return Ok(());
            };
            Self::encode(&participants)?
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp = temp_path(path);
        std::fs::write(&temp, contents).map_err(|source| StoreError::Io {
            path: temp.clone(),
            source,
        })?;
        std::fs::rename(&temp, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "Timeline store saved");
        Ok(())
    }

    /// Copy of every record, for read-only inspection.
    pub fn snapshot(&self) -> BTreeMap<ParticipantId, TimelineData> {
        let Ok(participants) = self.participants.read() else {
            return BTreeMap::new();
        };
        participants.clone()
    }

    /// Number of participants with a record.
    pub fn len(&self) -> usize {
        self.participants.read().map_or(0, |p| p.len())
    }

    /// Whether no participant has a record yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `timeline.json` -> `timeline.json.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("timeline"), ToOwned::to_owned);
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_lazy_and_stable() {
        let store = TimelineStore::ephemeral();
        let id = ParticipantId::new();
        assert!(store.get(id).is_none());

        let data = store.get_or_create(id);
        assert_eq!(data, TimelineData::default());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id), Some(TimelineData::default()));
    }

    #[test]
    fn commit_replaces_record() {
        let store = TimelineStore::ephemeral();
        let id = ParticipantId::new();
        let mut data = store.get_or_create(id);
        data.completed_encounters = 3;
        data.last_trigger_time = Some(99);
        store.commit(id, data.clone()).unwrap();
        assert_eq!(store.get(id), Some(data));
    }

    #[test]
    fn decode_drops_invalid_identity() {
        let good = ParticipantId::new();
        let doc = format!(
            r#"{{"version":1,"participants":[
                {{"participantId":"{good}","completedEncounters":1}},
                {{"participantId":"nope","completedEncounters":4}}
            ]}}"#
        );
        let decoded = TimelineStore::decode(&doc).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.get(&good).map(|d| d.completed_encounters), Some(1));
    }

    #[test]
    fn decode_drops_malformed_entry_only() {
        let good = ParticipantId::new();
        let bad = ParticipantId::new();
        let doc = format!(
            r#"{{"participants":[
                {{"participantId":"{good}"}},
                {{"participantId":"{bad}","history":"not a list"}}
            ]}}"#
        );
        let decoded = TimelineStore::decode(&doc).unwrap();
        assert!(decoded.contains_key(&good));
        assert!(!decoded.contains_key(&bad));
    }

    #[test]
    fn negative_completed_count_is_clamped() {
        let id = ParticipantId::new();
        let doc = format!(r#"{{"participants":[{{"participantId":"{id}","completedEncounters":-5}}]}}"#);
        let decoded = TimelineStore::decode(&doc).unwrap();
        assert_eq!(decoded.get(&id).map(|d| d.completed_encounters), Some(0));
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(TimelineStore::decode("{{{").is_err());
    }

    #[test]
    fn decode_without_participants_is_empty() {
        let decoded = TimelineStore::decode(r#"{"version":1}"#).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn temp_path_appends_suffix() {
        let temp = temp_path(Path::new("/var/data/timeline.json"));
        assert_eq!(temp, PathBuf::from("/var/data/timeline.json.tmp"));
    }
}
