//! Import and merge ingestion
//!
//! Both ingestion sources (pasted text envelope, tabular remote export)
//! normalize to [`SubmissionPayload`] before merging. Merging is per record:
//! resolve the target class-group, find or create the record for the
//! `(santriId, tahunAjaran, semester)` identity, shallow-merge the imported
//! `data` map into `customData`, upsert. Bad records are collected as error
//! strings without aborting the batch.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde_json::Value;

use rapor_core::{RaporRecord, RecordKey, RecordStore};

use crate::envelope::extract_payload;
use crate::error::Result;
use crate::payload::{SubmissionMeta, SubmissionPayload, SubmissionRecord};

/// Sentinel `rombelId` marking a whole-tier bulk submission
const ALL_ROMBEL_ID: i64 = 0;

/// Outcome of an import: partial success is first-class
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub success_count: usize,
    pub errors: Vec<String>,
}

/// Decode a pasted text envelope and merge it.
///
/// Protocol-level problems (missing markers, bad Base64/JSON) reject the
/// whole paste; per-record problems land in the outcome's error list.
pub fn import_text(text: &str, store: &mut dyn RecordStore) -> Result<ImportOutcome> {
    let payload = extract_payload(text)?;
    Ok(merge_payload(&payload, store))
}

/// Merge one payload into the store, record by record
pub fn merge_payload(payload: &SubmissionPayload, store: &mut dyn RecordStore) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    if !store.has_template(&payload.meta.template_id) {
        warn!("rejecting payload for unknown template '{}'", payload.meta.template_id);
        outcome.errors.push(format!(
            "Unknown template id '{}'",
            payload.meta.template_id
        ));
        return outcome;
    }

    for record in &payload.records {
        match merge_record(&payload.meta, record, store) {
            Ok(()) => outcome.success_count += 1,
            Err(message) => outcome.errors.push(message),
        }
    }

    info!(
        "merged payload for template '{}': {} ok, {} errors",
        payload.meta.template_id,
        outcome.success_count,
        outcome.errors.len()
    );
    outcome
}

fn merge_record(
    meta: &SubmissionMeta,
    record: &SubmissionRecord,
    store: &mut dyn RecordStore,
) -> std::result::Result<(), String> {
    // Whole-tier submissions carry the sentinel id; the class-group then
    // comes from the student's current roster assignment, which may differ
    // from the assignment when the document was generated.
    let rombel = if meta.rombel_id == ALL_ROMBEL_ID {
        store.current_rombel(record.santri_id).ok_or_else(|| {
            format!(
                "No current class-group for student {} ({})",
                record.santri_id, record.santri_name
            )
        })?
    } else {
        rapor_core::RombelRef {
            id: meta.rombel_id,
            name: meta.rombel_name.clone(),
        }
    };

    let key = RecordKey {
        santri_id: record.santri_id,
        tahun_ajaran: meta.tahun_ajaran.clone(),
        semester: meta.semester,
    };

    let mut target = store.find(&key).unwrap_or_else(|| {
        debug!("creating record for student {} {}", record.santri_id, meta.tahun_ajaran);
        RaporRecord {
            santri_id: record.santri_id,
            santri_name: record.santri_name.clone(),
            rombel_id: rombel.id,
            rombel_name: rombel.name.clone(),
            jenjang: String::new(),
            tahun_ajaran: meta.tahun_ajaran.clone(),
            semester: meta.semester,
            subject_scores: Vec::new(),
            catatan: String::new(),
            sakit: 0,
            izin: 0,
            alpa: 0,
            custom_data: HashMap::new(),
        }
    });

    target.merge_custom_data(&record.data);
    store.upsert(target);
    Ok(())
}

/// Ingest a tabular remote export.
///
/// Each row carries identity columns plus one `DataJSON` column holding a
/// JSON-encoded `data` map; rows lacking a `DataJSON` column are ignored.
/// Every usable row becomes one single-record payload before merging, so
/// per-row problems (malformed JSON, unknown template) stay per-record.
pub fn import_remote_rows(
    rows: &[serde_json::Map<String, Value>],
    store: &mut dyn RecordStore,
) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    for row in rows {
        let data_json = match row.get("DataJSON").and_then(Value::as_str) {
            Some(s) => s,
            None => continue,
        };

        match row_to_payload(row, data_json) {
            Ok(payload) => {
                let merged = merge_payload(&payload, store);
                outcome.success_count += merged.success_count;
                outcome.errors.extend(merged.errors);
            }
            Err(message) => outcome.errors.push(message),
        }
    }

    outcome
}

fn row_to_payload(
    row: &serde_json::Map<String, Value>,
    data_json: &str,
) -> std::result::Result<SubmissionPayload, String> {
    let santri_id = row.get("SantriID").and_then(Value::as_i64).unwrap_or(0);

    let data: HashMap<String, String> = serde_json::from_str(data_json)
        .map_err(|e| format!("Malformed DataJSON for student {}: {}", santri_id, e))?;

    let semester = row
        .get("Semester")
        .and_then(Value::as_str)
        .and_then(|s| serde_json::from_value(Value::String(s.to_string())).ok())
        .ok_or_else(|| format!("Missing or invalid Semester for student {}", santri_id))?;

    Ok(SubmissionPayload {
        meta: SubmissionMeta {
            rombel_id: row.get("RombelID").and_then(Value::as_i64).unwrap_or(0),
            rombel_name: String::new(),
            template_name: String::new(),
            tahun_ajaran: row
                .get("TahunAjaran")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            semester,
            template_id: row
                .get("TemplateID")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            timestamp: chrono::Utc::now(),
        },
        records: vec![SubmissionRecord {
            santri_id,
            santri_name: row
                .get("NamaSantri")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            data,
        }],
    })
}
