//! Target cohort model and document sort orders

use serde::{Deserialize, Serialize};

/// One student in the target cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub santri_id: i64,
    pub name: String,
    #[serde(default)]
    pub nis: String,
    #[serde(default)]
    pub nisn: String,
    pub rombel_id: i64,
    pub rombel_name: String,
    #[serde(default)]
    pub jenjang: String,
}

/// What the document targets
#[derive(Debug, Clone, PartialEq)]
pub enum CohortScope {
    /// One class-group
    Rombel { id: i64, name: String },
    /// An entire tier spanning multiple class-groups
    Jenjang { name: String },
}

impl CohortScope {
    /// Display name for header substitution
    pub fn display_name(&self) -> &str {
        match self {
            CohortScope::Rombel { name, .. } => name,
            CohortScope::Jenjang { name } => name,
        }
    }
}

/// A sorted target cohort
#[derive(Debug, Clone)]
pub struct Cohort {
    pub scope: CohortScope,
    pub students: Vec<Student>,
}

impl Cohort {
    /// One class-group, sorted by student name
    pub fn rombel<S: Into<String>>(id: i64, name: S, mut students: Vec<Student>) -> Self {
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Cohort {
            scope: CohortScope::Rombel { id, name: name.into() },
            students,
        }
    }

    /// An entire tier, sorted by class-group name then student name
    pub fn jenjang<S: Into<String>>(name: S, mut students: Vec<Student>) -> Self {
        students.sort_by(|a, b| {
            a.rombel_name
                .cmp(&b.rombel_name)
                .then_with(|| a.name.cmp(&b.name))
        });
        Cohort {
            scope: CohortScope::Jenjang { name: name.into() },
            students,
        }
    }

    /// The class-group id carried in the submission meta; whole-tier
    /// documents use the "all groups" sentinel
    pub fn rombel_id(&self) -> i64 {
        match &self.scope {
            CohortScope::Rombel { id, .. } => *id,
            CohortScope::Jenjang { .. } => crate::ALL_ROMBEL_ID,
        }
    }
}
