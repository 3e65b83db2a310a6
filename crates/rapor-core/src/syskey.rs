//! System-key vocabulary
//!
//! A fixed, closed list of `$`-prefixed tokens recognized during spreadsheet
//! type auto-detection and substituted when a document is generated. Anything
//! else starting with `$` becomes an input field key.

use lazy_regex::regex_captures;
use std::fmt;

/// A recognized system substitution token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemKey {
    // Student identity, resolved per student
    NamaSantri,
    Nis,
    Nisn,
    Rombel,
    Jenjang,
    // Institution identity and reporting period, fixed per document
    NamaLembaga,
    AlamatLembaga,
    TahunAjaran,
    Semester,
    WaliKelas,
    KepalaJenjang,
    Logo,
    /// Subject name by subject id (`$MAPEL_12`)
    Mapel(i64),
}

impl SystemKey {
    /// Parse a `$`-prefixed token against the closed vocabulary
    pub fn parse(token: &str) -> Option<SystemKey> {
        if let Some((_, id)) = regex_captures!(r"^\$MAPEL_(\d+)$", token) {
            return id.parse().ok().map(SystemKey::Mapel);
        }
        match token {
            "$NAMA_SANTRI" => Some(SystemKey::NamaSantri),
            "$NIS" => Some(SystemKey::Nis),
            "$NISN" => Some(SystemKey::Nisn),
            "$ROMBEL" => Some(SystemKey::Rombel),
            "$JENJANG" => Some(SystemKey::Jenjang),
            "$NAMA_LEMBAGA" => Some(SystemKey::NamaLembaga),
            "$ALAMAT_LEMBAGA" => Some(SystemKey::AlamatLembaga),
            "$TAHUN_AJARAN" => Some(SystemKey::TahunAjaran),
            "$SEMESTER" => Some(SystemKey::Semester),
            "$WALI_KELAS" => Some(SystemKey::WaliKelas),
            "$KEPALA_JENJANG" => Some(SystemKey::KepalaJenjang),
            "$LOGO" => Some(SystemKey::Logo),
            _ => None,
        }
    }

    /// Whether this key resolves independently per student rather than once
    /// per document
    pub fn is_student_scoped(&self) -> bool {
        matches!(
            self,
            SystemKey::NamaSantri
                | SystemKey::Nis
                | SystemKey::Nisn
                | SystemKey::Rombel
                | SystemKey::Jenjang
        )
    }
}

impl fmt::Display for SystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemKey::NamaSantri => write!(f, "$NAMA_SANTRI"),
            SystemKey::Nis => write!(f, "$NIS"),
            SystemKey::Nisn => write!(f, "$NISN"),
            SystemKey::Rombel => write!(f, "$ROMBEL"),
            SystemKey::Jenjang => write!(f, "$JENJANG"),
            SystemKey::NamaLembaga => write!(f, "$NAMA_LEMBAGA"),
            SystemKey::AlamatLembaga => write!(f, "$ALAMAT_LEMBAGA"),
            SystemKey::TahunAjaran => write!(f, "$TAHUN_AJARAN"),
            SystemKey::Semester => write!(f, "$SEMESTER"),
            SystemKey::WaliKelas => write!(f, "$WALI_KELAS"),
            SystemKey::KepalaJenjang => write!(f, "$KEPALA_JENJANG"),
            SystemKey::Logo => write!(f, "$LOGO"),
            SystemKey::Mapel(id) => write!(f, "$MAPEL_{}", id),
        }
    }
}
