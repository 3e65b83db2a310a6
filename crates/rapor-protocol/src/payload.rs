//! Wire-exact submission payload types
//!
//! Field names follow the established wire format; renames here are a
//! compatibility contract, not a style choice.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rapor_core::Semester;

/// Submission header: cohort, template and period identity plus a timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    /// `0` signals a whole-tier bulk submission requiring per-student
    /// class-group resolution on import
    #[serde(rename = "rombelId")]
    pub rombel_id: i64,
    #[serde(rename = "rombelName")]
    pub rombel_name: String,
    #[serde(rename = "templateName")]
    pub template_name: String,
    #[serde(rename = "tahunAjaran")]
    pub tahun_ajaran: String,
    pub semester: Semester,
    #[serde(rename = "templateId")]
    pub template_id: String,
    pub timestamp: DateTime<Utc>,
}

/// One student's collected field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(rename = "santriId")]
    pub santri_id: i64,
    #[serde(rename = "santriName")]
    pub santri_name: String,
    pub data: HashMap<String, String>,
}

/// The complete submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub meta: SubmissionMeta,
    pub records: Vec<SubmissionRecord>,
}
