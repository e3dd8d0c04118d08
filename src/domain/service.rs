use super::Entity;
use crate::catalog::EntityKind;
use serde::{Deserialize, Serialize};

/// Something a facility offers (training, fabrication, testing).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: i64,
    pub facility_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub skill_type: Option<String>,
}

impl Entity for Service {
    const KIND: EntityKind = EntityKind::Service;

    fn id(&self) -> i64 {
        self.id
    }
}
