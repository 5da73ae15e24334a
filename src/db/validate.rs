//! Record validation against institution-specific formats.
//!
//! Dumps bypass model-level `save()` hooks on import, so the checks those
//! hooks used to perform run here before a payload is applied.

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::models::{DumpPayload, DumpRecord, Entity, value_key};
use super::schema::{FieldKind, schema};
use crate::config::{ConfigError, FormatConfig};

/// A single problem found in a dump record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub model: String,
    pub pk: String,
    pub field: Option<String>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} [{}] {}: {}", self.model, self.pk, field, self.message),
            None => write!(f, "{} [{}]: {}", self.model, self.pk, self.message),
        }
    }
}

/// Compiled format patterns.
#[derive(Debug, Clone)]
pub struct Validator {
    staff_no: Regex,
    student_reg_no: Regex,
    session: Regex,
}

fn compile(key: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        key,
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

impl Validator {
    pub fn new(formats: &FormatConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            staff_no: compile("STAFF_NO_FORMAT", &formats.staff_no_format)?,
            student_reg_no: compile("STUDENT_REG_NO_FORMAT", &formats.student_reg_no_format)?,
            session: compile("SESSION_FORMAT", &formats.session_format)?,
        })
    }

    /// Staff numbers are compared upper-cased.
    pub fn is_valid_staff_number(&self, staff_no: &str) -> bool {
        self.staff_no.is_match(&staff_no.to_uppercase())
    }

    pub fn is_valid_student_reg_number(&self, reg_no: &str) -> bool {
        self.student_reg_no.is_match(reg_no)
    }

    /// A session such as `2021/2022` must match the pattern and span two
    /// consecutive years.
    pub fn is_valid_session(&self, session: &str) -> bool {
        if !self.session.is_match(session) {
            return false;
        }
        let years: Vec<&str> = session.split('/').collect();
        match years.as_slice() {
            [first, second] => match (first.trim().parse::<i32>(), second.trim().parse::<i32>()) {
                (Ok(first), Ok(second)) => second.checked_sub(first) == Some(1),
                _ => false,
            },
            _ => false,
        }
    }

    /// Check every record of a payload, returning all problems found.
    pub fn validate_payload(&self, payload: &DumpPayload) -> Vec<ValidationIssue> {
        let course_semesters: HashMap<String, i64> = payload
            .records
            .iter()
            .filter(|r| r.entity() == Some(Entity::Course))
            .filter_map(|r| Some((r.pk_key(), r.field("semester")?.as_i64()?)))
            .collect();

        let mut issues = Vec::new();
        for record in &payload.records {
            self.validate_record(record, &course_semesters, &mut issues);
        }
        issues
    }

    fn validate_record(
        &self,
        record: &DumpRecord,
        course_semesters: &HashMap<String, i64>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let issue = |field: Option<&str>, message: String| ValidationIssue {
            model: record.model.clone(),
            pk: record.pk_key(),
            field: field.map(str::to_string),
            message,
        };

        let Some(entity) = record.entity() else {
            issues.push(issue(None, "unknown model".to_string()));
            return;
        };

        for field in schema(entity).fields {
            if let FieldKind::Choice(choice) = field.kind {
                match record.field(field.name) {
                    None | Some(Value::Null) => {}
                    Some(value) => match value.as_i64() {
                        Some(v) if choice.is_valid(v) => {}
                        _ => issues.push(issue(
                            Some(field.name),
                            format!("{} is not a valid {:?} value", value, choice),
                        )),
                    },
                }
            }
        }

        match entity {
            Entity::Staff => {
                if !self.is_valid_staff_number(&record.pk_key()) {
                    issues.push(issue(
                        Some("staff_number"),
                        "Invalid staff number provided".to_string(),
                    ));
                }
            }
            Entity::Student => {
                if !self.is_valid_student_reg_number(&record.pk_key()) {
                    issues.push(issue(
                        Some("reg_number"),
                        "Invalid student registration number provided".to_string(),
                    ));
                }
            }
            Entity::AcademicSession => {
                let session = record.field("session").and_then(Value::as_str);
                if !session.is_some_and(|s| self.is_valid_session(s)) {
                    issues.push(issue(Some("session"), "Invalid session value".to_string()));
                }
            }
            Entity::CourseRegistration => {
                let course = record.field("course").map(value_key);
                let semester = record.field("semester").and_then(Value::as_i64);
                if let (Some(course), Some(semester)) = (course, semester)
                    && let Some(offered) = course_semesters.get(&course)
                    && *offered != semester
                {
                    issues.push(issue(
                        Some("semester"),
                        "Course is not offered in selected semester".to_string(),
                    ));
                }
            }
            Entity::AttendanceSession => {
                let start = record.field("start_time").and_then(Value::as_str);
                if !start.is_some_and(|s| parse_timestamp(s).is_some()) {
                    issues.push(issue(
                        Some("start_time"),
                        "start time is not a valid timestamp".to_string(),
                    ));
                }
                let duration = record.field("duration").and_then(|v| match v {
                    Value::String(s) => parse_duration(s),
                    Value::Number(n) => n.as_i64().and_then(TimeDelta::try_seconds),
                    _ => None,
                });
                if !duration.is_some_and(|d| d > TimeDelta::zero()) {
                    issues.push(issue(
                        Some("duration"),
                        "duration must be positive".to_string(),
                    ));
                }
            }
            _ => {}
        }
    }
}

/// Parse RFC 3339 timestamps and naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` ones.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parse a duration in `[-][D ]HH:MM:SS[.ffffff]` form. Out-of-range values
/// yield `None`.
pub fn parse_duration(value: &str) -> Option<TimeDelta> {
    let value = value.trim();
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let (days, clock) = match value.split_once(' ') {
        Some((days, clock)) => (days.trim().parse::<i64>().ok()?, clock.trim()),
        None => (0, value),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<i64>().ok()?, m.parse::<i64>().ok()?, *s),
        [m, s] => (0, m.parse::<i64>().ok()?, *s),
        [s] => (0, 0, *s),
        _ => return None,
    };
    let seconds: f64 = seconds.parse().ok()?;
    if !(0.0..60.0).contains(&seconds) && parts.len() > 1 {
        return None;
    }

    let whole = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?;
    let delta = TimeDelta::try_seconds(whole)?
        .checked_add(&TimeDelta::microseconds((seconds * 1_000_000.0).round() as i64))?;
    Some(if negative { -delta } else { delta })
}
