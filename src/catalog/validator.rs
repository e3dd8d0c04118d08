//! Catalog self-check: referential integrity and route consistency.

use super::{def, EntityDef, SqlType, CATALOG};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate_catalog() -> Result<(), ConfigError> {
    check(&CATALOG)
}

fn check(entries: &[&'static EntityDef]) -> Result<(), ConfigError> {
    let mut path_segments = HashSet::new();
    let mut created: HashSet<&str> = HashSet::new();

    for d in entries {
        if !path_segments.insert(d.path_segment) {
            return Err(ConfigError::DuplicatePathSegment(d.path_segment));
        }

        for r in d.references {
            let is_bigint = d.column(r.column).map(|c| c.sql_type == SqlType::BigInt).unwrap_or(false);
            // Parents must come first so their tables exist when the FK is created.
            if !is_bigint || !created.contains(def(r.target).table) {
                return Err(ConfigError::DanglingReference {
                    from: d.table,
                    column: r.column,
                });
            }
        }

        for u in d.unique {
            for col in u.columns {
                if d.column(col).is_none() {
                    return Err(ConfigError::UnknownColumn { table: d.table, column: *col });
                }
            }
        }

        if let Some(rule) = d.populated_while {
            if d.column(rule.column).is_none() {
                return Err(ConfigError::UnknownColumn { table: d.table, column: rule.column });
            }
            for kind in rule.dependents {
                if !def(*kind).references.iter().any(|r| r.target == d.kind) {
                    return Err(ConfigError::DanglingReference {
                        from: def(*kind).table,
                        column: rule.column,
                    });
                }
            }
        }

        if let Some(rule) = d.capability_match {
            let target = d.references.iter().find(|r| r.column == rule.reference).map(|r| def(r.target));
            let Some(target) = target else {
                return Err(ConfigError::DanglingReference {
                    from: d.table,
                    column: rule.reference,
                });
            };
            if target.column(rule.capabilities).map(|c| c.sql_type) != Some(SqlType::Tags) {
                return Err(ConfigError::UnknownColumn {
                    table: target.table,
                    column: rule.capabilities,
                });
            }
            for col in rule.requirements {
                if d.column(col).is_none() {
                    return Err(ConfigError::UnknownColumn { table: d.table, column: *col });
                }
            }
        }

        created.insert(d.table);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CapabilityRule, ColumnDef, EntityKind, Reference, UniqueRule};

    #[test]
    fn shipped_catalog_is_consistent() {
        validate_catalog().unwrap();
    }

    #[test]
    fn child_before_parent_is_dangling() {
        let programs = def(EntityKind::Program);
        let projects = def(EntityKind::Project);
        let facilities = def(EntityKind::Facility);
        let err = check(&[projects, programs, facilities]).unwrap_err();
        assert!(matches!(err, ConfigError::DanglingReference { from: "projects", column: "program_id" }));
    }

    #[test]
    fn unknown_unique_column_is_reported() {
        static BROKEN: EntityDef = EntityDef {
            kind: EntityKind::Outcome,
            label: "outcome",
            table: "broken",
            path_segment: "broken",
            columns: &[ColumnDef::text("title")],
            references: &[],
            unique: &[UniqueRule {
                columns: &["slug"],
                ignore_case: false,
                message: "duplicate",
            }],
            populated_while: None,
            capability_match: None,
        };
        let err = check(&[&BROKEN]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColumn { table: "broken", column: "slug" }));
    }

    #[test]
    fn reference_column_must_be_declared() {
        static ORPHAN: EntityDef = EntityDef {
            kind: EntityKind::Service,
            label: "service",
            table: "orphans",
            path_segment: "orphans",
            columns: &[ColumnDef::text("name")],
            references: &[Reference {
                column: "facility_id",
                target: EntityKind::Facility,
            }],
            unique: &[],
            populated_while: None,
            capability_match: None,
        };
        let facilities = def(EntityKind::Facility);
        assert!(check(&[facilities, &ORPHAN]).is_err());
    }

    #[test]
    fn capability_rule_needs_a_tag_column_on_the_target() {
        static MISMATCHED: EntityDef = EntityDef {
            kind: EntityKind::Project,
            label: "project",
            table: "mismatched",
            path_segment: "mismatched",
            columns: &[ColumnDef::bigint("facility_id"), ColumnDef::text("innovation_focus")],
            references: &[Reference {
                column: "facility_id",
                target: EntityKind::Facility,
            }],
            unique: &[],
            populated_while: None,
            capability_match: Some(CapabilityRule {
                reference: "facility_id",
                requirements: &["innovation_focus"],
                capabilities: "location",
            }),
        };
        let facilities = def(EntityKind::Facility);
        let err = check(&[facilities, &MISMATCHED]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColumn { table: "facilities", column: "location" }));
    }
}
