//! Domain models for the attendance data layer.
//!
//! These models are storage-agnostic: the entity catalogue, the integer
//! choice sets used by several tables, the dump record shape shared with the
//! host framework's export format, and the node device registry entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::{DbError, DbResult};

/// App label prefixed to model names in dump records (`db.stafftitle`).
pub const APP_LABEL: &str = "db";

// =============================================================================
// Entities
// =============================================================================

/// Every table that can travel inside a dump.
///
/// Declaration order follows foreign-key dependencies: an entity only refers
/// to entities declared before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    StaffTitle,
    Faculty,
    Department,
    AppUser,
    Staff,
    Student,
    Course,
    AcademicSession,
    CourseRegistration,
    AttendanceSession,
    AttendanceRecord,
}

impl Entity {
    pub const ALL: [Entity; 11] = [
        Entity::StaffTitle,
        Entity::Faculty,
        Entity::Department,
        Entity::AppUser,
        Entity::Staff,
        Entity::Student,
        Entity::Course,
        Entity::AcademicSession,
        Entity::CourseRegistration,
        Entity::AttendanceSession,
        Entity::AttendanceRecord,
    ];

    /// Model class name, as used in selection lists.
    pub fn name(self) -> &'static str {
        match self {
            Entity::StaffTitle => "StaffTitle",
            Entity::Faculty => "Faculty",
            Entity::Department => "Department",
            Entity::AppUser => "AppUser",
            Entity::Staff => "Staff",
            Entity::Student => "Student",
            Entity::Course => "Course",
            Entity::AcademicSession => "AcademicSession",
            Entity::CourseRegistration => "CourseRegistration",
            Entity::AttendanceSession => "AttendanceSession",
            Entity::AttendanceRecord => "AttendanceRecord",
        }
    }

    /// Model label written into dump records, e.g. `db.stafftitle`.
    pub fn label(self) -> String {
        format!("{}.{}", APP_LABEL, self.name().to_lowercase())
    }

    /// Resolve a dump record's model label.
    ///
    /// Accepts any app prefix and any casing (`db.StaffTitle`,
    /// `db.stafftitle`, `stafftitle`).
    pub fn from_label(label: &str) -> Option<Entity> {
        let model = label.rsplit('.').next().unwrap_or(label);
        Entity::ALL
            .into_iter()
            .find(|entity| entity.name().eq_ignore_ascii_case(model))
    }

    /// Reference data is owned by the server; everything else is
    /// transactional data recorded against it.
    pub fn is_reference(self) -> bool {
        !matches!(
            self,
            Entity::CourseRegistration | Entity::AttendanceSession | Entity::AttendanceRecord
        )
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Integer choice sets
// =============================================================================

/// Integer-valued choice sets stored in choice columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    AdmissionStatus,
    Semester,
    Sex,
    EventType,
    AttendanceSessionStatus,
    RecordType,
}

impl Choice {
    /// `(value, label)` pairs accepted for this choice set.
    pub fn options(self) -> &'static [(i64, &'static str)] {
        match self {
            Choice::AdmissionStatus => &[
                (1, "Regular"),
                (2, "Graduated"),
                (3, "External"),
                (4, "Overstay"),
                (5, "Withdrawn"),
                (6, "Suspended"),
            ],
            Choice::Semester => &[(1, "First"), (2, "Second")],
            Choice::Sex => &[(1, "Male"), (2, "Female")],
            Choice::EventType => &[(1, "Lecture"), (2, "Lab"), (3, "Quiz"), (4, "Examination")],
            Choice::AttendanceSessionStatus => &[(1, "Active"), (2, "Ended")],
            Choice::RecordType => &[(1, "Sign In"), (2, "Sign Out")],
        }
    }

    pub fn is_valid(self, value: i64) -> bool {
        self.options().iter().any(|(v, _)| *v == value)
    }
}

// =============================================================================
// Dump records
// =============================================================================

/// One exported row: `{ "model": "db.faculty", "pk": 1, "fields": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpRecord {
    pub model: String,
    pub pk: Value,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl DumpRecord {
    pub fn entity(&self) -> Option<Entity> {
        Entity::from_label(&self.model)
    }

    /// Primary key rendered as text (`3`, `2017/249901`).
    pub fn pk_key(&self) -> String {
        value_key(&self.pk)
    }

    /// Field value by relation name, falling back to the `<name>_id` column
    /// spelling used by hand-written fixtures.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .get(name)
            .or_else(|| self.fields.get(&format!("{}_id", name)))
    }
}

/// Render a JSON scalar as a lookup key; strings lose their quotes.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An ordered sequence of dump records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DumpPayload {
    pub records: Vec<DumpRecord>,
}

impl DumpPayload {
    pub fn new(records: Vec<DumpRecord>) -> Self {
        Self { records }
    }

    /// Read a payload from a dump file.
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DbError::InvalidData {
            message: format!("cannot read {}: {}", path.display(), e),
            help: "Check the dump file exists and is readable".to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| DbError::InvalidData {
            message: format!("{} is not a valid dump: {}", path.display(), e),
            help: "A dump is a JSON array of {model, pk, fields} records".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record counts keyed by the model label as written in the dump.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.model.clone()).or_insert(0) += 1;
        }
        counts
    }
}

// =============================================================================
// Import
// =============================================================================

/// How imported rows are matched against rows already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Upsert by primary key. Used when a node receives server reference data.
    Replace,
    /// Match rows by natural key and assign fresh primary keys. Used when the
    /// server receives attendance from many nodes whose keys collide.
    Merge,
}

/// Summary of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records processed per entity.
    pub entities: BTreeMap<Entity, usize>,
    pub created: usize,
    pub updated: usize,
    /// Merge-mode duplicates already present in the store.
    pub skipped: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.entities.values().sum()
    }
}

// =============================================================================
// Node devices
// =============================================================================

/// A node device allowed to push attendance to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDevice {
    pub id: i64,
    pub name: String,
    pub token: String,
}

/// Default device name for a new registration.
pub fn default_device_name(id: i64) -> String {
    format!("TAMS {}", id)
}
