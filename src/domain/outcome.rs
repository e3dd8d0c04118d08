use super::Entity;
use crate::catalog::EntityKind;
use serde::{Deserialize, Serialize};

label_enum! {
    CommercializationStatus {
        Demoed => "demoed",
        MarketLinked => "market-linked",
        Launched => "launched",
    }
}

/// A documented deliverable of a project (prototype, report, PCB design...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub outcome_type: String,
    #[serde(default)]
    pub artifact_link: Option<String>,
    #[serde(default)]
    pub commercialization_status: Option<CommercializationStatus>,
}

impl Entity for Outcome {
    const KIND: EntityKind = EntityKind::Outcome;

    fn id(&self) -> i64 {
        self.id
    }
}
