use crate::db::{Entity, ImportMode, schema::schema};
use crate::sync::selection::*;

#[test]
fn server_selection_is_exact() {
    assert_eq!(
        select_entities(true),
        &[
            Entity::StaffTitle,
            Entity::Faculty,
            Entity::Department,
            Entity::AppUser,
            Entity::Staff,
            Entity::Student,
            Entity::Course,
            Entity::AcademicSession,
            Entity::CourseRegistration,
        ]
    );
}

#[test]
fn node_selection_is_exact() {
    assert_eq!(
        select_entities(false),
        &[Entity::AttendanceSession, Entity::AttendanceRecord]
    );
}

#[test]
fn server_lists_reference_data_before_transactional_data() {
    let entities = select_entities(true);
    let first_transactional = entities
        .iter()
        .position(|e| !e.is_reference())
        .expect("server dump carries course registrations");
    assert!(entities[first_transactional..].iter().all(|e| !e.is_reference()));
    assert!(entities[..first_transactional].iter().all(|e| e.is_reference()));
}

#[test]
fn selections_list_parents_before_children() {
    for from_server in [true, false] {
        let entities = select_entities(from_server);
        for (i, entity) in entities.iter().enumerate() {
            for dep in schema(*entity).dependencies() {
                if let Some(j) = entities.iter().position(|e| *e == dep) {
                    assert!(j < i, "{} listed before its parent {}", entity, dep);
                }
            }
        }
    }
}

#[test]
fn loading_reads_the_opposite_dump() {
    assert_eq!(Target::Server.source(), Origin::Node);
    assert_eq!(Target::Node.source(), Origin::Server);
    assert_eq!(Target::Server.source().dump_file_name(), NODE_DUMP);
    assert_eq!(Target::Node.source().dump_file_name(), SERVER_DUMP);
}

#[test]
fn server_merges_and_nodes_replace() {
    assert_eq!(Target::Server.import_mode(), ImportMode::Merge);
    assert_eq!(Target::Node.import_mode(), ImportMode::Replace);
}

#[test]
fn origin_display() {
    assert_eq!(Origin::Server.to_string(), "server");
    assert_eq!(Origin::Node.to_string(), "node");
    assert_eq!(Origin::Node.entities(), select_entities(false));
}
