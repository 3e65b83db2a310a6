//! System-key substitution
//!
//! Header cells resolve against the document context once at generation
//! time; student-scoped keys resolve independently per student.

use lazy_regex::regex_replace_all;
use std::collections::HashMap;

use rapor_core::{Semester, SystemKey};

use crate::cohort::{Cohort, Student};

/// Cohort-level values substituted into the generated document
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    pub nama_lembaga: String,
    pub alamat_lembaga: String,
    pub tahun_ajaran: String,
    pub semester: Option<Semester>,
    pub wali_kelas: String,
    pub kepala_jenjang: String,
    /// Embedded logo as a data URI, substituted for `$LOGO`
    pub logo_data_uri: Option<String>,
    /// Subject names by id, substituted for `$MAPEL_<id>`
    pub subjects: HashMap<i64, String>,
    /// Webhook endpoint baked into the document's send action
    pub webhook_url: Option<String>,
    /// Messaging destination; omitted, the document opens a contact picker
    pub wa_number: Option<String>,
}

/// Resolve one system key. Student-scoped keys need a student; without one
/// (header cells) they resolve against the cohort scope where possible.
pub fn resolve_key(
    key: &SystemKey,
    ctx: &DocumentContext,
    cohort: &Cohort,
    student: Option<&Student>,
) -> String {
    match key {
        SystemKey::NamaSantri => student.map(|s| s.name.clone()).unwrap_or_default(),
        SystemKey::Nis => student.map(|s| s.nis.clone()).unwrap_or_default(),
        SystemKey::Nisn => student.map(|s| s.nisn.clone()).unwrap_or_default(),
        SystemKey::Rombel => student
            .map(|s| s.rombel_name.clone())
            .unwrap_or_else(|| cohort.scope.display_name().to_string()),
        SystemKey::Jenjang => student
            .map(|s| s.jenjang.clone())
            .unwrap_or_else(|| cohort.scope.display_name().to_string()),
        SystemKey::NamaLembaga => ctx.nama_lembaga.clone(),
        SystemKey::AlamatLembaga => ctx.alamat_lembaga.clone(),
        SystemKey::TahunAjaran => ctx.tahun_ajaran.clone(),
        SystemKey::Semester => ctx.semester.map(|s| s.to_string()).unwrap_or_default(),
        SystemKey::WaliKelas => ctx.wali_kelas.clone(),
        SystemKey::KepalaJenjang => ctx.kepala_jenjang.clone(),
        SystemKey::Logo => ctx.logo_data_uri.clone().unwrap_or_default(),
        SystemKey::Mapel(id) => ctx.subjects.get(id).cloned().unwrap_or_default(),
    }
}

/// Substitute every recognized `$TOKEN` occurrence inside free text.
/// Unrecognized tokens are left as-is.
pub fn substitute_text(
    text: &str,
    ctx: &DocumentContext,
    cohort: &Cohort,
    student: Option<&Student>,
) -> String {
    regex_replace_all!(r"\$[A-Z0-9_]+", text, |token: &str| {
        match SystemKey::parse(token) {
            Some(key) => resolve_key(&key, ctx, cohort, student),
            None => token.to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Cohort;

    fn ctx() -> DocumentContext {
        DocumentContext {
            nama_lembaga: "PP Al-Hikmah".into(),
            tahun_ajaran: "2024/2025".into(),
            semester: Some(Semester::Ganjil),
            wali_kelas: "Ust. Fulan".into(),
            ..Default::default()
        }
    }

    fn cohort() -> Cohort {
        Cohort::rombel(1, "7A", Vec::new())
    }

    #[test]
    fn test_substitute_document_level() {
        let out = substitute_text(
            "RAPOR $NAMA_LEMBAGA - $TAHUN_AJARAN Semester $SEMESTER",
            &ctx(),
            &cohort(),
            None,
        );
        assert_eq!(out, "RAPOR PP Al-Hikmah - 2024/2025 Semester Ganjil");
    }

    #[test]
    fn test_rombel_falls_back_to_scope_in_header() {
        let out = substitute_text("Kelas: $ROMBEL", &ctx(), &cohort(), None);
        assert_eq!(out, "Kelas: 7A");
    }

    #[test]
    fn test_student_scoped_resolution() {
        let student = Student {
            santri_id: 7,
            name: "Aisyah".into(),
            nis: "123".into(),
            nisn: String::new(),
            rombel_id: 2,
            rombel_name: "7B".into(),
            jenjang: "MTs".into(),
        };
        let out = substitute_text("$NAMA_SANTRI ($NIS) $ROMBEL", &ctx(), &cohort(), Some(&student));
        assert_eq!(out, "Aisyah (123) 7B");
    }

    #[test]
    fn test_unknown_token_left_alone() {
        let out = substitute_text("$NILAI_UJIAN stays", &ctx(), &cohort(), None);
        assert_eq!(out, "$NILAI_UJIAN stays");
    }
}
