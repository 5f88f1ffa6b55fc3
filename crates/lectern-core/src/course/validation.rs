//! Field validation for incoming record payloads.
//!
//! These are the rules an admin front end applies before a payload reaches
//! the store: required fields for new records, non-empty strings and length
//! limits. The store itself never validates; it persists what it is given.

use serde_json::Value;

use super::model::{Instructor, Material, Record, RecordKind, RecordPatch};
use crate::error::{LecternError, Result};

/// Whether a payload creates a record or patches an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every required field must be present.
    Create,
    /// Only present fields are checked.
    Patch,
}

#[derive(Debug, Clone, Copy, Default)]
struct StringRule {
    max: usize,
    allow_empty: bool,
}

const fn limit(max: usize) -> StringRule {
    StringRule {
        max,
        allow_empty: false,
    }
}

const fn limit_or_empty(max: usize) -> StringRule {
    StringRule {
        max,
        allow_empty: true,
    }
}

#[derive(Default)]
struct Checker {
    errors: Vec<String>,
}

impl Checker {
    fn check(&mut self, field: &str, value: Option<&String>, rule: StringRule) {
        let Some(value) = value else {
            return;
        };
        let trimmed = value.trim();
        if trimmed.is_empty() && !rule.allow_empty {
            self.errors.push(format!("{} is required", field));
            return;
        }
        if trimmed.chars().count() > rule.max {
            self.errors
                .push(format!("{} is too long (max {})", field, rule.max));
        }
    }

    fn require(&mut self, field: &str, value: Option<&String>, rule: StringRule) {
        if value.is_none() {
            self.errors.push(format!("{} is required", field));
        }
        self.check(field, value, rule);
    }

    fn live_fields(&mut self, patch: &RecordPatch) {
        self.check("title", patch.title.as_ref(), limit(200));
        self.check("link", patch.link.as_ref(), limit(500));
        self.check(
            "meetingNumber",
            patch.meeting_number.as_ref(),
            limit_or_empty(100),
        );
    }

    fn course_fields(&mut self, patch: &RecordPatch, mode: ValidationMode) {
        let required = [
            ("lessonLabel", patch.lesson_label.as_ref()),
            ("topic", patch.topic.as_ref()),
            ("datetimeText", patch.datetime_text.as_ref()),
        ];
        for (field, value) in required {
            match mode {
                ValidationMode::Create => self.require(field, value, limit(300)),
                ValidationMode::Patch => self.check(field, value, limit(300)),
            }
        }
        self.check("replayLink", patch.replay_link.as_ref(), limit(500));

        if let Some(materials) = &patch.materials {
            for (idx, material) in materials.iter().enumerate() {
                self.material(idx, material);
            }
        }
        if let Some(instructor) = &patch.instructor {
            self.instructor(instructor);
        }
    }

    fn material(&mut self, idx: usize, material: &Material) {
        self.check(
            &format!("materials[{}].url", idx),
            material.url.as_ref(),
            limit(500),
        );
        self.check(
            &format!("materials[{}].title", idx),
            material.title.as_ref(),
            limit(200),
        );
        self.check(
            &format!("materials[{}].subtitle", idx),
            material.subtitle.as_ref(),
            limit_or_empty(200),
        );
    }

    fn instructor(&mut self, instructor: &Instructor) {
        self.check("instructor.name", instructor.name.as_ref(), limit(120));
        self.check("instructor.avatar", instructor.avatar.as_ref(), limit(500));
        self.check("instructor.qqLink", instructor.qq_link.as_ref(), limit(500));
        self.check("instructor.bio", instructor.bio.as_ref(), limit_or_empty(400));
    }
}

/// Returns every rule violation in `patch`; an empty list means valid.
///
/// A create payload without a type is checked against both kinds, matching
/// what the admin form reports. A patch without a type changes no kind and
/// only has its present fields copied, so nothing kind-specific is checked.
pub fn validate_patch(patch: &RecordPatch, mode: ValidationMode) -> Vec<String> {
    let mut checker = Checker::default();

    match (patch.kind, mode) {
        (Some(RecordKind::Live), _) => checker.live_fields(patch),
        (Some(RecordKind::Course), _) => checker.course_fields(patch, mode),
        (None, ValidationMode::Create) => {
            checker.errors.push("type is required".to_string());
            checker.live_fields(patch);
            checker.course_fields(patch, mode);
        }
        (None, ValidationMode::Patch) => {}
    }

    checker.errors
}

/// Like [`validate_patch`] but folds violations into an error.
pub fn ensure_valid(patch: &RecordPatch, mode: ValidationMode) -> Result<()> {
    let errors = validate_patch(patch, mode);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LecternError::Validation(errors))
    }
}

/// Parses a bulk import payload into records.
///
/// The payload must be an array whose items are objects carrying a valid
/// `type`. Ids and timestamps are left as given; call
/// [`Record::normalize`] to fill the missing ones.
pub fn parse_import(payload: Value) -> Result<Vec<Record>> {
    let Value::Array(items) = payload else {
        return Err(LecternError::Validation(vec![
            "Payload must be an array".to_string(),
        ]));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(fields) = &item else {
            return Err(LecternError::Validation(vec![format!(
                "Item at index {} is not an object",
                index
            )]));
        };
        let kind_is_valid = fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(RecordKind::parse)
            .is_some();
        if !kind_is_valid {
            return Err(LecternError::Validation(vec![format!(
                "Item at index {} has invalid type",
                index
            )]));
        }

        let record: Record = serde_json::from_value(item).map_err(|e| {
            LecternError::Validation(vec![format!("Item at index {}: {}", index, e)])
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> RecordPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_course_create() {
        let p = patch(json!({
            "type": "course",
            "lessonLabel": "Lesson 3",
            "topic": "Borrowing",
            "datetimeText": "Tue 20:00",
            "materials": [{
                "url": "https://example.com/slides.pdf",
                "title": "Slides",
                "subtitle": ""
            }],
            "instructor": {"name": "Ada", "bio": ""}
        }));
        assert!(validate_patch(&p, ValidationMode::Create).is_empty());
    }

    #[test]
    fn test_course_create_requires_fields() {
        let p = patch(json!({"type": "course", "topic": "Borrowing"}));
        let errors = validate_patch(&p, ValidationMode::Create);
        assert_eq!(
            errors,
            vec![
                "lessonLabel is required".to_string(),
                "datetimeText is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_create_without_type_checks_both_kinds() {
        let p = patch(json!({"title": ""}));
        let errors = validate_patch(&p, ValidationMode::Create);
        assert_eq!(errors[0], "type is required");
        assert!(errors.contains(&"title is required".to_string()));
        assert!(errors.contains(&"topic is required".to_string()));
    }

    #[test]
    fn test_patch_without_type_checks_nothing() {
        let p = patch(json!({"topic": ""}));
        assert!(validate_patch(&p, ValidationMode::Patch).is_empty());
    }

    #[test]
    fn test_live_length_limits() {
        let p = patch(json!({
            "type": "live",
            "title": "x".repeat(201),
            "meetingNumber": ""
        }));
        let errors = validate_patch(&p, ValidationMode::Patch);
        assert_eq!(errors, vec!["title is too long (max 200)".to_string()]);
    }

    #[test]
    fn test_nested_field_errors_are_indexed() {
        let p = patch(json!({
            "type": "course",
            "materials": [{"url": "ok"}, {"title": "  "}],
            "instructor": {"qqLink": "q".repeat(501)}
        }));
        let errors = validate_patch(&p, ValidationMode::Patch);
        assert_eq!(
            errors,
            vec![
                "materials[1].title is required".to_string(),
                "instructor.qqLink is too long (max 500)".to_string(),
            ]
        );
    }

    #[test]
    fn test_ensure_valid_wraps_errors() {
        let p = patch(json!({"type": "live", "link": ""}));
        let err = ensure_valid(&p, ValidationMode::Patch).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_parse_import_rejects_non_array() {
        let err = parse_import(json!({"type": "course"})).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Payload must be an array");
    }

    #[test]
    fn test_parse_import_reports_bad_items() {
        let err = parse_import(json!([{"type": "course"}, 42])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Item at index 1 is not an object"
        );

        let err = parse_import(json!([{"type": "webinar"}])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Item at index 0 has invalid type"
        );
    }

    #[test]
    fn test_parse_import_keeps_order_and_ids() {
        let records = parse_import(json!([
            {"type": "live", "id": "a"},
            {"type": "course", "id": "b", "topic": "Enums"}
        ]))
        .unwrap();
        let ids: Vec<&str> = records.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
