use super::{Entity, Tags};
use crate::catalog::EntityKind;
use serde::{Deserialize, Serialize};

/// A physical lab, workshop or makerspace that hosts equipment and services.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub facility_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub partner_organization: Option<String>,
    #[serde(default)]
    pub capabilities: Tags,
}

impl Entity for Facility {
    const KIND: EntityKind = EntityKind::Facility;

    fn id(&self) -> i64 {
        self.id
    }
}
