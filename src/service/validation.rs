//! Request validation from catalog field rules.

use crate::catalog::{ColumnDef, EntityDef, Format, SqlType, ID_COLUMN};
use crate::domain::Tags;
use crate::error::FieldErrors;
use crate::store::Record;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct RequestValidator;

impl RequestValidator {
    /// Keep only declared columns; `id` and unknown keys are dropped.
    pub fn retain_columns(def: &EntityDef, mut body: Record) -> Record {
        body.retain(|k, _| k != ID_COLUMN && def.column(k).is_some());
        body
    }

    /// Coerce every declared column of a complete record in place and check its rule.
    /// All failures are collected; an empty result means the record can be decoded.
    pub fn validate(def: &EntityDef, record: &mut Record) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for c in def.columns {
            let raw = record.remove(c.name).unwrap_or(Value::Null);
            match coerce(c, raw) {
                Ok(v) => {
                    record.insert(c.name.to_string(), v);
                }
                Err(message) => {
                    errors.add(c.name, message);
                    record.insert(c.name.to_string(), Value::Null);
                }
            }
        }
        errors
    }
}

fn coerce(c: &ColumnDef, raw: Value) -> Result<Value, String> {
    let v = match c.sql_type {
        SqlType::Text => coerce_text(raw)?,
        SqlType::BigInt => coerce_bigint(raw)?,
        SqlType::Bool => coerce_bool(raw)?,
        SqlType::Date => coerce_date(raw)?,
        SqlType::Tags => {
            let tags: Tags =
                serde_json::from_value(raw).map_err(|_| "must be a list of strings".to_string())?;
            return serde_json::to_value(tags).map_err(|e| e.to_string());
        }
    };
    if v.is_null() {
        return if c.rule.required {
            Err("is required".into())
        } else {
            Ok(v)
        };
    }
    if let Some(s) = v.as_str() {
        check_text(c, s)?;
    }
    Ok(v)
}

/// Strings are trimmed; blank becomes null.
fn coerce_text(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::String(s) => {
            let t = s.trim();
            Ok(if t.is_empty() {
                Value::Null
            } else {
                Value::String(t.to_string())
            })
        }
        _ => Err("must be a string".into()),
    }
}

fn coerce_bigint(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::Number(n) => n
            .as_i64()
            .map(Value::from)
            .ok_or_else(|| "must be an integer".to_string()),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "must be an integer".to_string()),
        _ => Err("must be an integer".into()),
    }
}

/// Missing flags default to false.
fn coerce_bool(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Null => Ok(Value::Bool(false)),
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
            _ => Err("must be true or false".into()),
        },
        _ => Err("must be true or false".into()),
    }
}

fn coerce_date(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
            .map_err(|_| "must be a date in YYYY-MM-DD format".to_string()),
        _ => Err("must be a date in YYYY-MM-DD format".into()),
    }
}

fn check_text(c: &ColumnDef, s: &str) -> Result<(), String> {
    if let Some(max) = c.rule.max_length {
        if s.chars().count() > max {
            return Err(format!("must be at most {} characters", max));
        }
    }
    if let Some(allowed) = c.rule.allowed {
        if !allowed.contains(&s) {
            return Err(format!("must be one of: {}", allowed.join(", ")));
        }
    }
    match c.rule.format {
        Some(Format::Email) if !email_re().is_match(s) => Err("must be a valid email address".into()),
        Some(Format::Url) if !url_re().is_match(s) => Err("must be an http(s) URL".into()),
        _ => Ok(()),
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{def, EntityKind};
    use crate::test_support::body as record;
    use serde_json::json;

    #[test]
    fn unknown_keys_and_client_id_are_dropped() {
        let body = record(json!({"id": 9, "name": "AgriTech", "colour": "green"}));
        let kept = RequestValidator::retain_columns(def(EntityKind::Program), body);
        assert_eq!(kept, record(json!({"name": "AgriTech"})));
    }

    #[test]
    fn every_failing_field_is_reported() {
        let mut r = record(json!({"name": "  ", "phase": "paused"}));
        let errors = RequestValidator::validate(def(EntityKind::Program), &mut r);
        assert_eq!(errors.get("name"), Some(&["is required".to_string()][..]));
        assert_eq!(
            errors.get("phase"),
            Some(&["must be one of: planning, active, completed".to_string()][..])
        );
    }

    #[test]
    fn values_are_coerced_to_column_types() {
        let mut r = record(json!({
            "program_id": "4",
            "facility_id": 2,
            "name": " Solar dryer ",
            "stage": "testing",
            "start_date": "2024-03-01",
            "description": ""
        }));
        let errors = RequestValidator::validate(def(EntityKind::Project), &mut r);
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(r["program_id"], json!(4));
        assert_eq!(r["name"], "Solar dryer");
        assert_eq!(r["description"], Value::Null);
        assert_eq!(r["end_date"], Value::Null);
        assert_eq!(r["testing_requirements"], json!([]));
    }

    #[test]
    fn bad_dates_and_ids_are_rejected() {
        let mut r = record(json!({"program_id": 1.5, "name": "x", "stage": "testing", "start_date": "01/03/2024"}));
        let errors = RequestValidator::validate(def(EntityKind::Project), &mut r);
        assert!(errors.contains("program_id"));
        assert!(errors.contains("start_date"));
    }

    #[test]
    fn tags_and_flags_get_defaults() {
        let mut r = record(json!({"name": "Lab", "location": "Kampala"}));
        assert!(RequestValidator::validate(def(EntityKind::Facility), &mut r).is_empty());
        assert_eq!(r["capabilities"], json!([]));

        let mut p = record(json!({"project_id": 1, "name": "Ann", "role": "lead"}));
        assert!(RequestValidator::validate(def(EntityKind::Participant), &mut p).is_empty());
        assert_eq!(p["cross_skill_trained"], json!(false));
    }

    #[test]
    fn email_and_url_formats() {
        let mut p = record(json!({"project_id": 1, "name": "Ann", "role": "lead", "email": "ann-at-example"}));
        let errors = RequestValidator::validate(def(EntityKind::Participant), &mut p);
        assert!(errors.contains("email"));

        let mut o = record(json!({
            "project_id": 1,
            "title": "Prototype",
            "outcome_type": "prototype",
            "artifact_link": "ftp://files"
        }));
        let errors = RequestValidator::validate(def(EntityKind::Outcome), &mut o);
        assert!(errors.contains("artifact_link"));
        o.insert("artifact_link".into(), json!("https://example.org/report.pdf"));
        assert!(RequestValidator::validate(def(EntityKind::Outcome), &mut o).is_empty());
    }

    #[test]
    fn max_length_counts_characters() {
        let mut r = record(json!({"name": "é".repeat(200), "phase": "active"}));
        assert!(RequestValidator::validate(def(EntityKind::Program), &mut r).is_empty());
        let mut r = record(json!({"name": "é".repeat(201), "phase": "active"}));
        assert!(RequestValidator::validate(def(EntityKind::Program), &mut r).contains("name"));
    }
}
