use super::Entity;
use crate::catalog::EntityKind;
use crate::error::FieldErrors;
use serde::{Deserialize, Serialize};

label_enum! {
    ParticipantRole {
        Lead => "lead",
        Member => "member",
        Mentor => "mentor",
        Advisor => "advisor",
    }
}

/// A person working on a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub role: ParticipantRole,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub cross_skill_trained: bool,
}

impl Entity for Participant {
    const KIND: EntityKind = EntityKind::Participant;

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let has_specialization = self
            .specialization
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if self.cross_skill_trained && !has_specialization {
            errors.add("specialization", "is required when cross_skill_trained is set");
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_skill_flag_needs_specialization() {
        let mut p = Participant {
            id: 0,
            project_id: 1,
            name: "Amina Nakato".into(),
            role: ParticipantRole::Member,
            email: None,
            affiliation: None,
            specialization: Some("  ".into()),
            cross_skill_trained: true,
        };
        assert!(p.check().contains("specialization"));
        p.specialization = Some("Embedded systems".into());
        assert!(p.check().is_empty());
    }
}
