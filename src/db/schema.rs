//! Static table layout for every dumpable entity.
//!
//! The layout maps dump field names (relation names such as `faculty`) to
//! SQLite columns (`faculty_id`) and drives both export and import, so the
//! two directions cannot drift apart.

use super::models::{Choice, Entity};

/// Primary key flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkKind {
    /// INTEGER PRIMARY KEY AUTOINCREMENT.
    Auto,
    /// Natural text key (staff number, registration number).
    Text,
}

/// Join table behind a many-to-many field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManyToMany {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
    pub target: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Text,
    Bool,
    Choice(Choice),
    ForeignKey(Entity),
    ManyToMany(ManyToMany),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Name used in dump records.
    pub name: &'static str,
    /// Column on the entity's table. Unused for many-to-many fields.
    pub column: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl Field {
    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, FieldKind::ManyToMany(_))
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub entity: Entity,
    pub table: &'static str,
    pub pk_column: &'static str,
    pub pk_kind: PkKind,
    pub fields: &'static [Field],
    /// Fields that identify a row independently of its primary key.
    pub natural_key: &'static [&'static str],
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields stored as columns on the entity's own table.
    pub fn column_fields(&self) -> impl Iterator<Item = &'static Field> {
        self.fields.iter().filter(|f| !f.is_many_to_many())
    }

    pub fn many_to_many_fields(&self) -> impl Iterator<Item = (&'static Field, ManyToMany)> {
        self.fields.iter().filter_map(|f| match f.kind {
            FieldKind::ManyToMany(m2m) => Some((f, m2m)),
            _ => None,
        })
    }

    /// Entities this table references through foreign keys or join tables.
    pub fn dependencies(&self) -> Vec<Entity> {
        self.fields
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::ForeignKey(target) => Some(target),
                FieldKind::ManyToMany(m2m) => Some(m2m.target),
                _ => None,
            })
            .collect()
    }
}

const fn col(name: &'static str, kind: FieldKind) -> Field {
    Field {
        name,
        column: name,
        kind,
        nullable: false,
    }
}

const fn opt(name: &'static str, kind: FieldKind) -> Field {
    Field {
        name,
        column: name,
        kind,
        nullable: true,
    }
}

const fn fk(name: &'static str, column: &'static str, target: Entity, nullable: bool) -> Field {
    Field {
        name,
        column,
        kind: FieldKind::ForeignKey(target),
        nullable,
    }
}

static STAFF_TITLE: TableSchema = TableSchema {
    entity: Entity::StaffTitle,
    table: "staff_title",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[col("title_full", FieldKind::Text), col("title", FieldKind::Text)],
    natural_key: &["title_full"],
};

static FACULTY: TableSchema = TableSchema {
    entity: Entity::Faculty,
    table: "faculty",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[col("name", FieldKind::Text)],
    natural_key: &["name"],
};

static DEPARTMENT: TableSchema = TableSchema {
    entity: Entity::Department,
    table: "department",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        col("name", FieldKind::Text),
        opt("alias", FieldKind::Text),
        fk("faculty", "faculty_id", Entity::Faculty, false),
    ],
    natural_key: &["name"],
};

static APP_USER: TableSchema = TableSchema {
    entity: Entity::AppUser,
    table: "app_user",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        col("password", FieldKind::Text),
        opt("last_login", FieldKind::Text),
        col("is_superuser", FieldKind::Bool),
        col("username", FieldKind::Text),
        col("first_name", FieldKind::Text),
        col("last_name", FieldKind::Text),
        col("email", FieldKind::Text),
        col("is_staff", FieldKind::Bool),
        col("is_active", FieldKind::Bool),
        col("date_joined", FieldKind::Text),
        opt("other_names", FieldKind::Text),
        opt("fingerprint_template", FieldKind::Text),
        opt("face_encodings", FieldKind::Text),
        col("sex", FieldKind::Choice(Choice::Sex)),
    ],
    natural_key: &["username"],
};

static STAFF: TableSchema = TableSchema {
    entity: Entity::Staff,
    table: "staff",
    pk_column: "staff_number",
    pk_kind: PkKind::Text,
    fields: &[
        fk("user", "user_id", Entity::AppUser, false),
        fk("department", "department_id", Entity::Department, false),
        col("is_exam_officer", FieldKind::Bool),
        Field {
            name: "staff_titles",
            column: "",
            kind: FieldKind::ManyToMany(ManyToMany {
                table: "staff_staff_titles",
                owner_column: "staff_id",
                target_column: "staff_title_id",
                target: Entity::StaffTitle,
            }),
            nullable: true,
        },
    ],
    natural_key: &[],
};

static STUDENT: TableSchema = TableSchema {
    entity: Entity::Student,
    table: "student",
    pk_column: "reg_number",
    pk_kind: PkKind::Text,
    fields: &[
        col("first_name", FieldKind::Text),
        col("last_name", FieldKind::Text),
        opt("other_names", FieldKind::Text),
        fk("department", "department_id", Entity::Department, false),
        col("possible_grad_yr", FieldKind::Int),
        col(
            "admission_status",
            FieldKind::Choice(Choice::AdmissionStatus),
        ),
        opt("level_of_study", FieldKind::Int),
        opt("fingerprint_template", FieldKind::Text),
        opt("face_encodings", FieldKind::Text),
        col("sex", FieldKind::Choice(Choice::Sex)),
        col("is_active", FieldKind::Bool),
    ],
    natural_key: &[],
};

static COURSE: TableSchema = TableSchema {
    entity: Entity::Course,
    table: "course",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        col("code", FieldKind::Text),
        col("title", FieldKind::Text),
        col("level_of_study", FieldKind::Int),
        fk("department", "department_id", Entity::Department, false),
        col("unit_load", FieldKind::Int),
        col("semester", FieldKind::Choice(Choice::Semester)),
        col("elective", FieldKind::Bool),
        col("is_active", FieldKind::Bool),
    ],
    natural_key: &["code", "title", "unit_load"],
};

static ACADEMIC_SESSION: TableSchema = TableSchema {
    entity: Entity::AcademicSession,
    table: "academic_session",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        col("session", FieldKind::Text),
        col("is_current_session", FieldKind::Bool),
    ],
    natural_key: &["session"],
};

static COURSE_REGISTRATION: TableSchema = TableSchema {
    entity: Entity::CourseRegistration,
    table: "course_registration",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        fk("session", "session_id", Entity::AcademicSession, false),
        col("semester", FieldKind::Choice(Choice::Semester)),
        fk("course", "course_id", Entity::Course, false),
        fk("student", "student_id", Entity::Student, false),
    ],
    natural_key: &["student", "course", "session"],
};

static ATTENDANCE_SESSION: TableSchema = TableSchema {
    entity: Entity::AttendanceSession,
    table: "attendance_session",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        fk("initiator", "initiator_id", Entity::Staff, true),
        fk("course", "course_id", Entity::Course, false),
        fk("session", "session_id", Entity::AcademicSession, false),
        col("event_type", FieldKind::Choice(Choice::EventType)),
        col("start_time", FieldKind::Text),
        col("duration", FieldKind::Text),
        col("created_on", FieldKind::Text),
        col(
            "status",
            FieldKind::Choice(Choice::AttendanceSessionStatus),
        ),
        col("recurring", FieldKind::Bool),
    ],
    natural_key: &["course", "session", "start_time", "duration"],
};

static ATTENDANCE_RECORD: TableSchema = TableSchema {
    entity: Entity::AttendanceRecord,
    table: "attendance_record",
    pk_column: "id",
    pk_kind: PkKind::Auto,
    fields: &[
        fk(
            "attendance_session",
            "attendance_session_id",
            Entity::AttendanceSession,
            false,
        ),
        fk("student", "student_id", Entity::Student, false),
        col("record_type", FieldKind::Choice(Choice::RecordType)),
        col("check_in_by", FieldKind::Text),
        opt("check_out_by", FieldKind::Text),
        col("is_valid", FieldKind::Bool),
    ],
    natural_key: &["attendance_session", "student", "record_type"],
};

/// Table layout for an entity.
pub fn schema(entity: Entity) -> &'static TableSchema {
    match entity {
        Entity::StaffTitle => &STAFF_TITLE,
        Entity::Faculty => &FACULTY,
        Entity::Department => &DEPARTMENT,
        Entity::AppUser => &APP_USER,
        Entity::Staff => &STAFF,
        Entity::Student => &STUDENT,
        Entity::Course => &COURSE,
        Entity::AcademicSession => &ACADEMIC_SESSION,
        Entity::CourseRegistration => &COURSE_REGISTRATION,
        Entity::AttendanceSession => &ATTENDANCE_SESSION,
        Entity::AttendanceRecord => &ATTENDANCE_RECORD,
    }
}
