use super::Entity;
use crate::catalog::EntityKind;
use crate::error::FieldErrors;
use serde::{Deserialize, Serialize};

label_enum! {
    /// Where a program sits in its life.
    ProgramPhase {
        Planning => "planning",
        Active => "active",
        Completed => "completed",
    }
}

/// National frameworks a program with a focus area must report against.
pub const RECOGNIZED_ALIGNMENTS: [&str; 3] = ["NDPIII", "DigitalRoadmap2023_2028", "4IR"];

/// An innovation program grouping projects around a focus area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub focus_area: Option<String>,
    /// National framework(s) the program reports against, e.g. "NDPIII, 4IR".
    #[serde(default)]
    pub national_alignment: Option<String>,
    pub phase: ProgramPhase,
}

impl Program {
    pub fn is_nationally_aligned(&self) -> bool {
        let alignment = self.national_alignment.as_deref().unwrap_or("").to_lowercase();
        RECOGNIZED_ALIGNMENTS
            .iter()
            .any(|a| alignment.contains(&a.to_lowercase()))
    }
}

impl Entity for Program {
    const KIND: EntityKind = EntityKind::Program;

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let has_focus = self.focus_area.as_deref().is_some_and(|f| !f.trim().is_empty());
        if has_focus && !self.is_nationally_aligned() {
            errors.add(
                "national_alignment",
                format!(
                    "must include one of {} when focus_area is set",
                    RECOGNIZED_ALIGNMENTS.join(", ")
                ),
            );
        }
        errors
    }
}
