use super::Entity;
use crate::catalog::EntityKind;
use crate::error::FieldErrors;
use serde::{Deserialize, Serialize};

label_enum! {
    EquipmentStatus {
        Available => "available",
        InUse => "in-use",
        Maintenance => "maintenance",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub id: i64,
    pub facility_id: i64,
    pub name: String,
    pub status: EquipmentStatus,
    /// Asset tag; unique across all facilities when set.
    #[serde(default)]
    pub inventory_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Comma-separated domains, e.g. "Electronics, Mechanical".
    #[serde(default)]
    pub usage_domain: Option<String>,
    /// Project phases the equipment supports, e.g. "Prototyping, Testing".
    #[serde(default)]
    pub support_phase: Option<String>,
}

fn mentions(field: &Option<String>, word: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|f| f.to_lowercase().contains(&word.to_lowercase()))
}

impl Equipment {
    pub fn is_electronics(&self) -> bool {
        mentions(&self.usage_domain, "Electronics")
    }
}

impl Entity for Equipment {
    const KIND: EntityKind = EntityKind::Equipment;

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let supported = mentions(&self.support_phase, "Prototyping") || mentions(&self.support_phase, "Testing");
        if self.is_electronics() && !supported {
            errors.add("support_phase", "must include Prototyping or Testing for electronics equipment");
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipment(domain: Option<&str>, phase: Option<&str>) -> Equipment {
        Equipment {
            id: 0,
            facility_id: 1,
            name: "Oscilloscope".into(),
            status: EquipmentStatus::Available,
            inventory_code: None,
            description: None,
            usage_domain: domain.map(String::from),
            support_phase: phase.map(String::from),
        }
    }

    #[test]
    fn electronics_must_support_prototyping_or_testing() {
        assert!(equipment(Some("Electronics"), None).check().contains("support_phase"));
        assert!(equipment(Some("Mechanical, Electronics"), Some("Training")).check().contains("support_phase"));
        assert!(equipment(Some("Electronics"), Some("Training, Testing")).check().is_empty());
        assert!(equipment(Some("electronics"), Some("prototyping")).check().is_empty());
    }

    #[test]
    fn other_domains_are_unconstrained() {
        assert!(equipment(Some("Mechanical"), None).check().is_empty());
        assert!(equipment(None, None).check().is_empty());
    }
}
