use super::{Entity, Tags};
use crate::catalog::EntityKind;
use crate::error::FieldErrors;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

label_enum! {
    ProjectStage {
        Ideation => "ideation",
        Prototyping => "prototyping",
        Testing => "testing",
        Commercialization => "commercialization",
        Completed => "completed",
    }
}

/// A project run under a program and hosted at a facility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: i64,
    pub program_id: i64,
    pub facility_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub innovation_focus: Option<String>,
    /// Capabilities the hosting facility must offer for testing.
    #[serde(default)]
    pub testing_requirements: Tags,
    pub stage: ProjectStage,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.add("end_date", "must not be before start_date");
            }
        }
        errors
    }
}
