//! Collected report-card records and the storage seam they merge into.
//!
//! Persistence itself is an external collaborator; this module defines the
//! record shape, its identity key and the [`RecordStore`] trait consumed by
//! the import path, plus an in-memory implementation used by tests and the
//! CLI's file-backed store.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Reporting term, half of the record identity period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    Ganjil,
    Genap,
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Semester::Ganjil => write!(f, "Ganjil"),
            Semester::Genap => write!(f, "Genap"),
        }
    }
}

/// A class-group reference from the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RombelRef {
    pub id: i64,
    pub name: String,
}

/// One structured subject score, used when no custom template applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScore {
    pub mapel_id: i64,
    pub nama_mapel: String,
    pub nilai: f64,
}

/// Identity of a collected result: one student in one reporting period
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub santri_id: i64,
    pub tahun_ajaran: String,
    pub semester: Semester,
}

/// A collected result for one (student, academic-year, term) triple.
///
/// Cohort identifiers are denormalized snapshots taken at collection time.
/// `custom_data` holds every field declared by a custom template's fillable
/// cells; imports merge into it at key level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaporRecord {
    pub santri_id: i64,
    pub santri_name: String,
    pub rombel_id: i64,
    pub rombel_name: String,
    #[serde(default)]
    pub jenjang: String,
    pub tahun_ajaran: String,
    pub semester: Semester,
    #[serde(default)]
    pub subject_scores: Vec<SubjectScore>,
    /// Homeroom narrative
    #[serde(default)]
    pub catatan: String,
    /// Attendance: days sick / excused / unexcused
    #[serde(default)]
    pub sakit: u32,
    #[serde(default)]
    pub izin: u32,
    #[serde(default)]
    pub alpa: u32,
    #[serde(default)]
    pub custom_data: HashMap<String, String>,
}

impl RaporRecord {
    /// Identity key of this record
    pub fn key(&self) -> RecordKey {
        RecordKey {
            santri_id: self.santri_id,
            tahun_ajaran: self.tahun_ajaran.clone(),
            semester: self.semester,
        }
    }

    /// Shallow-merge imported fields: imported keys overwrite, all other
    /// existing keys are preserved
    pub fn merge_custom_data(&mut self, data: &HashMap<String, String>) {
        for (k, v) in data {
            self.custom_data.insert(k.clone(), v.clone());
        }
    }
}

/// Storage seam for the import path.
///
/// Implementations are responsible for their own durability; the import
/// logic only sees find/upsert plus the roster and template lookups it needs
/// to resolve bulk submissions.
pub trait RecordStore {
    /// Find the record for an identity triple, if one exists
    fn find(&self, key: &RecordKey) -> Option<RaporRecord>;

    /// Insert or replace the record under its identity triple
    fn upsert(&mut self, record: RaporRecord);

    /// The student's current roster assignment (at import time, which may
    /// differ from the assignment when the document was generated)
    fn current_rombel(&self, santri_id: i64) -> Option<RombelRef>;

    /// Whether a template with this id is known
    fn has_template(&self, template_id: &str) -> bool;
}

/// In-memory [`RecordStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<RecordKey, RaporRecord>,
    roster: HashMap<i64, RombelRef>,
    templates: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a known template id
    pub fn add_template<S: Into<String>>(&mut self, template_id: S) {
        self.templates.insert(template_id.into());
    }

    /// Register a student's current class-group assignment
    pub fn assign_rombel(&mut self, santri_id: i64, rombel: RombelRef) {
        self.roster.insert(santri_id, rombel);
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over stored records
    pub fn records(&self) -> impl Iterator<Item = &RaporRecord> {
        self.records.values()
    }

    /// Consume the store, returning all records
    pub fn into_records(self) -> Vec<RaporRecord> {
        self.records.into_values().collect()
    }
}

impl RecordStore for MemoryStore {
    fn find(&self, key: &RecordKey) -> Option<RaporRecord> {
        self.records.get(key).cloned()
    }

    fn upsert(&mut self, record: RaporRecord) {
        self.records.insert(record.key(), record);
    }

    fn current_rombel(&self, santri_id: i64) -> Option<RombelRef> {
        self.roster.get(&santri_id).cloned()
    }

    fn has_template(&self, template_id: &str) -> bool {
        self.templates.contains(template_id)
    }
}
