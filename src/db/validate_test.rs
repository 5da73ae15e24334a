use crate::config::{ConfigError, FormatConfig};
use crate::db::validate::{parse_duration, parse_timestamp};
use crate::db::{DumpPayload, Validator};
use chrono::TimeDelta;
use serde_json::json;

fn validator() -> Validator {
    Validator::new(&FormatConfig {
        staff_no_format: r"^SS\d{4}$".to_string(),
        student_reg_no_format: r"^\d{4}/\d{6}$".to_string(),
        session_format: r"^\d{4}/\d{4}$".to_string(),
    })
    .unwrap()
}

fn payload(value: serde_json::Value) -> DumpPayload {
    serde_json::from_value(value).unwrap()
}

#[test]
fn invalid_pattern_is_config_error() {
    let result = Validator::new(&FormatConfig {
        staff_no_format: "([unclosed".to_string(),
        ..FormatConfig::default()
    });

    match result {
        Err(ConfigError::InvalidPattern { key, .. }) => assert_eq!(key, "STAFF_NO_FORMAT"),
        other => panic!("expected InvalidPattern, got {:?}", other),
    }
}

#[test]
fn staff_numbers_are_checked_upper_cased() {
    let v = validator();
    assert!(v.is_valid_staff_number("SS1234"));
    assert!(v.is_valid_staff_number("ss1234"));
    assert!(!v.is_valid_staff_number("SS12"));
}

#[test]
fn student_reg_numbers() {
    let v = validator();
    assert!(v.is_valid_student_reg_number("2017/249901"));
    assert!(!v.is_valid_student_reg_number("2017-249901"));
}

#[test]
fn sessions_must_span_consecutive_years() {
    let v = validator();
    assert!(v.is_valid_session("2021/2022"));
    assert!(!v.is_valid_session("2021/2023"));
    assert!(!v.is_valid_session("2022/2021"));
    assert!(!v.is_valid_session("21/22"));
}

#[test]
fn valid_server_payload_has_no_issues() {
    let issues = validator().validate_payload(&payload(json!([
        {"model": "db.faculty", "pk": 1, "fields": {"name": "Physical Sciences"}},
        {"model": "db.course", "pk": 1, "fields": {"code": "PHY101", "title": "Mechanics", "semester": 1}},
        {"model": "db.academicsession", "pk": 1, "fields": {"session": "2021/2022", "is_current_session": true}},
        {"model": "db.student", "pk": "2017/249901", "fields": {"sex": 2, "admission_status": 1}},
        {"model": "db.staff", "pk": "SS0001", "fields": {}},
        {"model": "db.courseregistration", "pk": 1, "fields": {"course": 1, "semester": 1, "session": 1, "student": "2017/249901"}}
    ])));

    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn reports_every_bad_record() {
    let issues = validator().validate_payload(&payload(json!([
        {"model": "db.course", "pk": 4, "fields": {"semester": 2}},
        {"model": "db.courseregistration", "pk": 9, "fields": {"course": 4, "semester": 1}},
        {"model": "db.student", "pk": "bad-number", "fields": {"sex": 3}},
        {"model": "db.academicsession", "pk": 2, "fields": {"session": "2020/2022"}},
        {"model": "db.nodedevice", "pk": 1, "fields": {}}
    ])));

    let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
    assert_eq!(issues.len(), 5, "{:#?}", rendered);
    assert!(rendered.contains(&"db.courseregistration [9] semester: Course is not offered in selected semester".to_string()));
    assert!(rendered.contains(&"db.student [bad-number] reg_number: Invalid student registration number provided".to_string()));
    assert!(rendered.contains(&"db.student [bad-number] sex: 3 is not a valid Sex value".to_string()));
    assert!(rendered.contains(&"db.academicsession [2] session: Invalid session value".to_string()));
    assert!(rendered.contains(&"db.nodedevice [1]: unknown model".to_string()));
}

#[test]
fn attendance_sessions_need_timestamp_and_positive_duration() {
    let issues = validator().validate_payload(&payload(json!([
        {"model": "db.attendancesession", "pk": 1, "fields": {
            "start_time": "2022-07-14T12:29:15.899Z", "duration": "01:30:00",
            "event_type": 1, "status": 1
        }},
        {"model": "db.attendancesession", "pk": 2, "fields": {
            "start_time": "yesterday", "duration": "00:00:00",
            "event_type": 9
        }}
    ])));

    let fields: Vec<_> = issues.iter().map(|i| (i.pk.as_str(), i.field.as_deref())).collect();
    assert_eq!(
        fields,
        vec![
            ("2", Some("event_type")),
            ("2", Some("start_time")),
            ("2", Some("duration")),
        ]
    );
}

#[test]
fn parses_timestamps() {
    assert!(parse_timestamp("2022-07-14T12:29:15.899Z").is_some());
    assert!(parse_timestamp("2022-07-14T12:29:15+01:00").is_some());
    assert!(parse_timestamp("2022-07-14 12:29:15").is_some());
    assert!(parse_timestamp("14/07/2022").is_none());
}

#[test]
fn parses_durations() {
    assert_eq!(parse_duration("01:30:00"), Some(TimeDelta::minutes(90)));
    assert_eq!(parse_duration("1 02:00:00"), Some(TimeDelta::hours(26)));
    assert_eq!(parse_duration("00:00:01.500000"), Some(TimeDelta::milliseconds(1500)));
    assert_eq!(parse_duration("-00:10:00"), Some(TimeDelta::minutes(-10)));
    assert_eq!(parse_duration("an hour"), None);
}

#[test]
fn out_of_range_durations_are_rejected() {
    assert_eq!(parse_duration("999999999999999999 00:00:01"), None);
    assert_eq!(parse_duration("9223372036854775807:00:00"), None);

    let issues = validator().validate_payload(&payload(json!([
        {"model": "db.attendancesession", "pk": 1, "fields": {
            "start_time": "2022-07-14T12:29:15Z", "duration": 9223372036854775807i64
        }},
        {"model": "db.attendancesession", "pk": 2, "fields": {
            "start_time": "2022-07-14T12:29:15Z", "duration": "999999999999999999 00:00:01"
        }},
        {"model": "db.attendancesession", "pk": 3, "fields": {
            "start_time": "2022-07-14T12:29:15Z", "duration": 5400
        }}
    ])));

    let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "db.attendancesession [1] duration: duration must be positive".to_string(),
            "db.attendancesession [2] duration: duration must be positive".to_string(),
        ]
    );
}

#[test]
fn session_years_far_apart_do_not_overflow() {
    let v = Validator::new(&FormatConfig {
        session_format: r"^-?\d+/-?\d+$".to_string(),
        ..FormatConfig::default()
    })
    .unwrap();

    assert!(!v.is_valid_session("-2147483648/2147483647"));
    assert!(v.is_valid_session("2021/2022"));
}
