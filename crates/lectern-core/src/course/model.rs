//! Course record domain models.
//!
//! A stored record is either a live session announcement or a recorded
//! course entry. Both kinds keep keys they do not know about in `extra`, so
//! an externally edited document survives a read-modify-write cycle intact.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{LecternError, Result};

/// The ordered collection of records persisted as a single JSON array.
///
/// New records are prepended; every other ordering is preserved as stored.
pub type Document = Vec<Record>;

/// Discriminator values stored under the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Live,
    Course,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Live => "live",
            RecordKind::Course => "course",
        }
    }

    /// Parses the stored discriminator, returning `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "live" => Some(RecordKind::Live),
            "course" => Some(RecordKind::Course),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the course document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Record {
    /// A live session (meeting link, meeting number).
    #[serde(rename = "live")]
    Live(LiveSession),
    /// A recorded course lesson.
    #[serde(rename = "course")]
    Course(Course),
}

/// Fields of a live session record.
///
/// Deserialization goes through the raw field map: a known key is only
/// taken when its value has the expected shape. Anything else, explicit
/// nulls included, stays in `extra` and is written back as found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct LiveSession {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub updated_at: String,
    /// Keys outside the known schema, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields of a course record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct Course {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<Material>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<Instructor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub updated_at: String,
    /// Keys outside the known schema, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A downloadable or linked lesson material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The instructor card shown next to a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct Instructor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qq_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for LiveSession {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_id(&mut fields),
            title: take_string(&mut fields, "title"),
            link: take_string(&mut fields, "link"),
            meeting_number: take_string(&mut fields, "meetingNumber"),
            status: take_string(&mut fields, "status"),
            updated_at: take_timestamp(&mut fields),
            extra: fields,
        }
    }
}

impl From<Map<String, Value>> for Course {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take_id(&mut fields),
            lesson_label: take_string(&mut fields, "lessonLabel"),
            topic: take_string(&mut fields, "topic"),
            datetime_text: take_string(&mut fields, "datetimeText"),
            replay_link: take_string(&mut fields, "replayLink"),
            materials: take_materials(&mut fields),
            instructor: take_object(&mut fields, "instructor").map(Instructor::from),
            status: take_string(&mut fields, "status"),
            updated_at: take_timestamp(&mut fields),
            extra: fields,
        }
    }
}

impl From<Map<String, Value>> for Material {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            url: take_string(&mut fields, "url"),
            title: take_string(&mut fields, "title"),
            subtitle: take_string(&mut fields, "subtitle"),
            extra: fields,
        }
    }
}

impl From<Map<String, Value>> for Instructor {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            name: take_string(&mut fields, "name"),
            avatar: take_string(&mut fields, "avatar"),
            qq_link: take_string(&mut fields, "qqLink"),
            bio: take_string(&mut fields, "bio"),
            extra: fields,
        }
    }
}

/// Removes `key` when it holds a string; any other value stays put.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

fn take_object(fields: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match fields.get(key) {
        Some(Value::Object(_)) => match fields.remove(key) {
            Some(Value::Object(object)) => Some(object),
            _ => None,
        },
        _ => None,
    }
}

/// Takes `materials` only when every entry is an object.
fn take_materials(fields: &mut Map<String, Value>) -> Option<Vec<Material>> {
    match fields.get("materials") {
        Some(Value::Array(items)) if items.iter().all(Value::is_object) => {}
        _ => return None,
    }
    match fields.remove("materials") {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => Some(Material::from(object)),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// The id is always written back, so it is always taken. Numeric ids from
/// older imports become their decimal string; anything else reads as
/// missing.
fn take_id(fields: &mut Map<String, Value>) -> String {
    match fields.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

fn take_timestamp(fields: &mut Map<String, Value>) -> String {
    match fields.remove("updatedAt") {
        Some(Value::String(stamp)) => stamp,
        _ => String::new(),
    }
}

/// A set of fields to copy over a record.
///
/// Only the keys of the known schema are accepted; anything else in an
/// incoming payload is dropped during deserialization. `None` means "leave
/// as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<Material>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<Instructor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Current instant as an ISO-8601 string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generates a fresh record identifier.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

impl Record {
    /// Builds a new record from a patch that names its kind.
    ///
    /// The record gets a generated id and the given timestamp.
    pub fn from_patch(patch: &RecordPatch, updated_at: &str) -> Result<Self> {
        let kind = patch
            .kind
            .ok_or_else(|| LecternError::Validation(vec!["type is required".to_string()]))?;

        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        overlay(&mut fields, patch)?;
        fields.insert("id".to_string(), Value::String(new_record_id()));
        fields.insert(
            "updatedAt".to_string(),
            Value::String(updated_at.to_string()),
        );

        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Live(_) => RecordKind::Live,
            Record::Course(_) => RecordKind::Course,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Live(live) => &live.id,
            Record::Course(course) => &course.id,
        }
    }

    pub fn updated_at(&self) -> &str {
        match self {
            Record::Live(live) => &live.updated_at,
            Record::Course(course) => &course.updated_at,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        match self {
            Record::Live(live) => live.id = id,
            Record::Course(course) => course.id = id,
        }
    }

    pub fn set_updated_at(&mut self, updated_at: impl Into<String>) {
        let updated_at = updated_at.into();
        match self {
            Record::Live(live) => live.updated_at = updated_at,
            Record::Course(course) => course.updated_at = updated_at,
        }
    }

    /// Fills in a missing id and timestamp, leaving present ones alone.
    ///
    /// This is what a bulk import does before handing records to the store.
    pub fn normalize(&mut self, now: &str) {
        if self.id().trim().is_empty() {
            self.set_id(new_record_id());
        }
        if self.updated_at().trim().is_empty() {
            self.set_updated_at(now);
        }
    }

    /// Returns a copy with the patch's present fields copied over and the
    /// timestamp refreshed.
    ///
    /// The merge works on the flat JSON object, so a patch that switches the
    /// kind keeps the previous kind's fields as extra keys instead of
    /// discarding them. The id never changes.
    pub fn merged(&self, patch: &RecordPatch, updated_at: &str) -> Result<Self> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            other => {
                return Err(LecternError::internal(format!(
                    "record serialized to a non-object value: {}",
                    other
                )));
            }
        };
        overlay(&mut fields, patch)?;
        fields.insert(
            "updatedAt".to_string(),
            Value::String(updated_at.to_string()),
        );

        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

fn overlay(fields: &mut Map<String, Value>, patch: &RecordPatch) -> Result<()> {
    if let Value::Object(changes) = serde_json::to_value(patch)? {
        for (key, value) in changes {
            fields.insert(key, value);
        }
    }
    Ok(())
}
