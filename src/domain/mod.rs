//! Typed hub entities and their enumerated labels.
//!
//! Records travel through the stores as JSON objects; these types are what the use cases
//! decode them into so cross-field rules run against real types.

use crate::catalog::{self, EntityDef, EntityKind};
use crate::error::FieldErrors;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A persisted hub record with a catalog definition.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> i64;

    fn def() -> &'static EntityDef {
        catalog::def(Self::KIND)
    }

    /// Rules spanning several fields, run after every field passed its own rule.
    fn check(&self) -> FieldErrors {
        FieldErrors::new()
    }
}

/// Enumerated field: a fixed set of lower-case labels, any of which may follow any other.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    _ => Err(format!("must be one of: {}", Self::LABELS.join(", "))),
                }
            }
        }
    };
}
pub(crate) use label_enum;

mod equipment;
mod facility;
mod outcome;
mod participant;
mod program;
mod project;
mod service;

pub use equipment::{Equipment, EquipmentStatus};
pub use facility::Facility;
pub use outcome::{CommercializationStatus, Outcome};
pub use participant::{Participant, ParticipantRole};
pub use program::{Program, ProgramPhase};
pub use project::{Project, ProjectStage};
pub use service::Service;

/// Set of free-form tags (capabilities). Entries are trimmed, empty ones dropped,
/// duplicates removed; first-seen order is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Parse a comma-separated list ("3D printing, CNC").
    pub fn parse(joined: &str) -> Self {
        joined.split(',').collect()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive membership.
    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.0.iter().any(|t| t.to_lowercase() == tag)
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut out: Vec<String> = Vec::new();
        for raw in iter {
            let tag = raw.as_ref().trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        Tags(out)
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    List(Vec<String>),
    Joined(String),
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<TagsRepr>::deserialize(deserializer)? {
            None => Tags::default(),
            Some(TagsRepr::List(list)) => list.into_iter().collect(),
            Some(TagsRepr::Joined(joined)) => Tags::parse(&joined),
        })
    }
}
