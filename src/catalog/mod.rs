//! Entity catalog: one static definition per entity kind.
//! The SQL builder, migrations, request validation, stores and routes all read from here;
//! identifiers that reach SQL come only from these definitions.

mod defs;
mod validator;

pub use defs::CATALOG;
pub use validator::validate_catalog;

/// Every persisted entity kind, in parent-first order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Facility,
    Program,
    Project,
    Equipment,
    Service,
    Participant,
    Outcome,
}

/// Storage type of a column. Tag sets are stored as JSON arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Text,
    Bool,
    Date,
    Tags,
}

impl SqlType {
    pub fn ddl(&self) -> &'static str {
        match self {
            SqlType::BigInt => "BIGINT",
            SqlType::Text => "TEXT",
            SqlType::Bool => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::Tags => "JSONB",
        }
    }

    /// Cast appended to bind placeholders; text binds as-is.
    pub fn cast(&self) -> Option<&'static str> {
        match self {
            SqlType::BigInt => Some("bigint"),
            SqlType::Text => None,
            SqlType::Bool => Some("boolean"),
            SqlType::Date => Some("date"),
            SqlType::Tags => Some("jsonb"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Url,
}

/// Per-field request rule.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub required: bool,
    pub max_length: Option<usize>,
    /// Enumerated labels; any other value is rejected.
    pub allowed: Option<&'static [&'static str]>,
    pub format: Option<Format>,
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub rule: FieldRule,
    /// Exact-match list filter (`?status=available`).
    pub filterable: bool,
    /// Included in the `?q=` substring search.
    pub searchable: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, sql_type: SqlType) -> Self {
        ColumnDef {
            name,
            sql_type,
            rule: FieldRule {
                required: false,
                max_length: None,
                allowed: None,
                format: None,
            },
            filterable: false,
            searchable: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub const fn bigint(name: &'static str) -> Self {
        Self::new(name, SqlType::BigInt)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, SqlType::Bool)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, SqlType::Date)
    }

    pub const fn tags(name: &'static str) -> Self {
        Self::new(name, SqlType::Tags)
    }

    /// Enumerated text column; also filterable.
    pub const fn label(name: &'static str, allowed: &'static [&'static str]) -> Self {
        let mut c = Self::new(name, SqlType::Text);
        c.rule.allowed = Some(allowed);
        c.filterable = true;
        c
    }

    pub const fn required(mut self) -> Self {
        self.rule.required = true;
        self
    }

    pub const fn max_length(mut self, n: usize) -> Self {
        self.rule.max_length = Some(n);
        self
    }

    pub const fn format(mut self, format: Format) -> Self {
        self.rule.format = Some(format);
        self
    }

    pub const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }
}

/// Column holding the id of a parent entity.
#[derive(Clone, Copy, Debug)]
pub struct Reference {
    pub column: &'static str,
    pub target: EntityKind,
}

/// Columns whose combined value must be unique. Text columns compare lower-cased when
/// `ignore_case`; rows with a NULL in any column are never duplicates.
#[derive(Clone, Copy, Debug)]
pub struct UniqueRule {
    pub columns: &'static [&'static str],
    pub ignore_case: bool,
    pub message: &'static str,
}

/// Tag column that may not be emptied while records of the listed kinds reference the row.
#[derive(Clone, Copy, Debug)]
pub struct PopulatedRule {
    pub column: &'static str,
    pub dependents: &'static [EntityKind],
}

/// Every entry of the `requirements` columns must appear in the `capabilities` tag column
/// of the row that `reference` points at. Entries compare case-insensitively.
#[derive(Clone, Copy, Debug)]
pub struct CapabilityRule {
    pub reference: &'static str,
    pub requirements: &'static [&'static str],
    pub capabilities: &'static str,
}

#[derive(Debug)]
pub struct EntityDef {
    pub kind: EntityKind,
    /// Singular, for messages ("program").
    pub label: &'static str,
    pub table: &'static str,
    pub path_segment: &'static str,
    /// Columns other than the generated `id`.
    pub columns: &'static [ColumnDef],
    pub references: &'static [Reference],
    pub unique: &'static [UniqueRule],
    pub populated_while: Option<PopulatedRule>,
    pub capability_match: Option<CapabilityRule>,
}

pub const ID_COLUMN: &str = "id";

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        let columns: &'static [ColumnDef] = self.columns;
        columns.iter().find(|c| c.name == name)
    }

    /// True for `id` and every declared column.
    pub fn has_column(&self, name: &str) -> bool {
        name == ID_COLUMN || self.column(name).is_some()
    }

    /// SQL type of a column, `id` included.
    pub fn sql_type(&self, name: &str) -> Option<SqlType> {
        if name == ID_COLUMN {
            Some(SqlType::BigInt)
        } else {
            self.column(name).map(|c| c.sql_type)
        }
    }

    pub fn searchable(&self) -> impl Iterator<Item = &'static ColumnDef> {
        let columns: &'static [ColumnDef] = self.columns;
        columns.iter().filter(|c| c.searchable)
    }

    pub fn is_filterable(&self, name: &str) -> bool {
        name == ID_COLUMN
            || self.column(name).map(|c| c.filterable).unwrap_or(false)
            || self.references.iter().any(|r| r.column == name)
    }

    /// `id` followed by declared columns, in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        let columns: &'static [ColumnDef] = self.columns;
        std::iter::once(ID_COLUMN).chain(columns.iter().map(|c| c.name))
    }
}

pub fn def(kind: EntityKind) -> &'static EntityDef {
    match kind {
        EntityKind::Facility => &defs::FACILITIES,
        EntityKind::Program => &defs::PROGRAMS,
        EntityKind::Project => &defs::PROJECTS,
        EntityKind::Equipment => &defs::EQUIPMENT,
        EntityKind::Service => &defs::SERVICES,
        EntityKind::Participant => &defs::PARTICIPANTS,
        EntityKind::Outcome => &defs::OUTCOMES,
    }
}

/// Definitions (and their referencing column) that point at `kind`.
pub fn dependents_of(kind: EntityKind) -> impl Iterator<Item = (&'static EntityDef, &'static Reference)> {
    CATALOG.iter().copied().flat_map(move |d| {
        d.references
            .iter()
            .filter(move |r| r.target == kind)
            .map(move |r| (d, r))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_resolves_to_its_definition() {
        for kind in [
            EntityKind::Facility,
            EntityKind::Program,
            EntityKind::Project,
            EntityKind::Equipment,
            EntityKind::Service,
            EntityKind::Participant,
            EntityKind::Outcome,
        ] {
            assert_eq!(def(kind).kind, kind);
        }
        let mut segments: Vec<&str> = CATALOG.iter().map(|d| d.path_segment).collect();
        segments.sort_unstable();
        segments.dedup();
        assert_eq!(segments.len(), CATALOG.len());
    }

    #[test]
    fn facility_dependents_cover_equipment_services_and_projects() {
        let mut tables: Vec<&str> = dependents_of(EntityKind::Facility).map(|(d, _)| d.table).collect();
        tables.sort_unstable();
        assert_eq!(tables, ["equipment", "projects", "services"]);
        assert_eq!(dependents_of(EntityKind::Outcome).count(), 0);
    }

    #[test]
    fn reference_columns_are_filterable() {
        let projects = def(EntityKind::Project);
        assert!(projects.is_filterable("program_id"));
        assert!(projects.is_filterable("stage"));
        assert!(!projects.is_filterable("description"));
        assert_eq!(projects.sql_type("id"), Some(SqlType::BigInt));
        assert_eq!(projects.sql_type("start_date"), Some(SqlType::Date));
    }
}
