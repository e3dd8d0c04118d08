//! Table definitions for every hub entity.

use super::{CapabilityRule, ColumnDef, EntityDef, EntityKind, Format, PopulatedRule, Reference, UniqueRule};
use crate::domain::{CommercializationStatus, EquipmentStatus, ParticipantRole, ProgramPhase, ProjectStage};

const NAME_MAX: usize = 200;

pub static FACILITIES: EntityDef = EntityDef {
    kind: EntityKind::Facility,
    label: "facility",
    table: "facilities",
    path_segment: "facilities",
    columns: &[
        ColumnDef::text("name").required().max_length(NAME_MAX).searchable(),
        ColumnDef::text("location").required().max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::text("facility_type").max_length(NAME_MAX).filterable(),
        ColumnDef::text("description").searchable(),
        ColumnDef::text("partner_organization").max_length(NAME_MAX).filterable(),
        ColumnDef::tags("capabilities"),
    ],
    references: &[],
    unique: &[UniqueRule {
        columns: &["name", "location"],
        ignore_case: true,
        message: "a facility with this name already exists at this location",
    }],
    populated_while: Some(PopulatedRule {
        column: "capabilities",
        dependents: &[EntityKind::Equipment, EntityKind::Service],
    }),
    capability_match: None,
};

pub static PROGRAMS: EntityDef = EntityDef {
    kind: EntityKind::Program,
    label: "program",
    table: "programs",
    path_segment: "programs",
    columns: &[
        ColumnDef::text("name").required().max_length(NAME_MAX).searchable(),
        ColumnDef::text("description").searchable(),
        ColumnDef::text("focus_area").max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::text("national_alignment").max_length(NAME_MAX),
        ColumnDef::label("phase", ProgramPhase::LABELS).required(),
    ],
    references: &[],
    unique: &[UniqueRule {
        columns: &["name"],
        ignore_case: true,
        message: "a program with this name already exists",
    }],
    populated_while: None,
    capability_match: None,
};

pub static PROJECTS: EntityDef = EntityDef {
    kind: EntityKind::Project,
    label: "project",
    table: "projects",
    path_segment: "projects",
    columns: &[
        ColumnDef::bigint("program_id").required(),
        ColumnDef::bigint("facility_id").required(),
        ColumnDef::text("name").required().max_length(NAME_MAX).searchable(),
        ColumnDef::text("description").searchable(),
        ColumnDef::text("innovation_focus").max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::tags("testing_requirements"),
        ColumnDef::label("stage", ProjectStage::LABELS).required(),
        ColumnDef::date("start_date"),
        ColumnDef::date("end_date"),
    ],
    references: &[
        Reference {
            column: "program_id",
            target: EntityKind::Program,
        },
        Reference {
            column: "facility_id",
            target: EntityKind::Facility,
        },
    ],
    unique: &[UniqueRule {
        columns: &["program_id", "name"],
        ignore_case: true,
        message: "a project with this name already exists in this program",
    }],
    populated_while: None,
    capability_match: Some(CapabilityRule {
        reference: "facility_id",
        requirements: &["innovation_focus", "testing_requirements"],
        capabilities: "capabilities",
    }),
};

pub static EQUIPMENT: EntityDef = EntityDef {
    kind: EntityKind::Equipment,
    label: "equipment",
    table: "equipment",
    path_segment: "equipment",
    columns: &[
        ColumnDef::bigint("facility_id").required(),
        ColumnDef::text("name").required().max_length(NAME_MAX).searchable(),
        ColumnDef::label("status", EquipmentStatus::LABELS).required(),
        ColumnDef::text("inventory_code").max_length(64).filterable().searchable(),
        ColumnDef::text("description").searchable(),
        ColumnDef::text("usage_domain").max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::text("support_phase").max_length(NAME_MAX).filterable(),
    ],
    references: &[Reference {
        column: "facility_id",
        target: EntityKind::Facility,
    }],
    unique: &[UniqueRule {
        columns: &["inventory_code"],
        ignore_case: false,
        message: "equipment with this inventory_code already exists",
    }],
    populated_while: None,
    capability_match: None,
};

pub static SERVICES: EntityDef = EntityDef {
    kind: EntityKind::Service,
    label: "service",
    table: "services",
    path_segment: "services",
    columns: &[
        ColumnDef::bigint("facility_id").required(),
        ColumnDef::text("name").required().max_length(NAME_MAX).searchable(),
        ColumnDef::text("description").searchable(),
        ColumnDef::text("category").max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::text("skill_type").max_length(NAME_MAX).filterable().searchable(),
    ],
    references: &[Reference {
        column: "facility_id",
        target: EntityKind::Facility,
    }],
    unique: &[UniqueRule {
        columns: &["facility_id", "name"],
        ignore_case: true,
        message: "a service with this name already exists in this facility",
    }],
    populated_while: None,
    capability_match: None,
};

pub static PARTICIPANTS: EntityDef = EntityDef {
    kind: EntityKind::Participant,
    label: "participant",
    table: "participants",
    path_segment: "participants",
    columns: &[
        ColumnDef::bigint("project_id").required(),
        ColumnDef::text("name").required().max_length(NAME_MAX).searchable(),
        ColumnDef::label("role", ParticipantRole::LABELS).required(),
        ColumnDef::text("email").max_length(254).format(Format::Email).searchable(),
        ColumnDef::text("affiliation").max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::text("specialization").max_length(NAME_MAX).filterable().searchable(),
        ColumnDef::boolean("cross_skill_trained").filterable(),
    ],
    references: &[Reference {
        column: "project_id",
        target: EntityKind::Project,
    }],
    unique: &[UniqueRule {
        columns: &["project_id", "email"],
        ignore_case: true,
        message: "a participant with this email is already on this project",
    }],
    populated_while: None,
    capability_match: None,
};

pub static OUTCOMES: EntityDef = EntityDef {
    kind: EntityKind::Outcome,
    label: "outcome",
    table: "outcomes",
    path_segment: "outcomes",
    columns: &[
        ColumnDef::bigint("project_id").required(),
        ColumnDef::text("title").required().max_length(NAME_MAX).searchable(),
        ColumnDef::text("description").searchable(),
        ColumnDef::text("outcome_type").required().max_length(NAME_MAX).filterable(),
        ColumnDef::text("artifact_link").max_length(2048).format(Format::Url),
        ColumnDef::label("commercialization_status", CommercializationStatus::LABELS),
    ],
    references: &[Reference {
        column: "project_id",
        target: EntityKind::Project,
    }],
    unique: &[],
    populated_while: None,
    capability_match: None,
};

/// Parent-first, so tables can be created in this order.
pub static CATALOG: [&EntityDef; 7] = [
    &FACILITIES,
    &PROGRAMS,
    &PROJECTS,
    &EQUIPMENT,
    &SERVICES,
    &PARTICIPANTS,
    &OUTCOMES,
];
