//! Which tables travel in which direction.

use clap::ValueEnum;
use std::fmt;

use crate::db::{Entity, ImportMode};

/// Dump file written by a server.
pub const SERVER_DUMP: &str = "server_dump.json";
/// Dump file written by a node device.
pub const NODE_DUMP: &str = "node_dump.json";

/// Reference data the server hands to nodes, parents first.
const SERVER_ENTITIES: [Entity; 9] = [
    Entity::StaffTitle,
    Entity::Faculty,
    Entity::Department,
    Entity::AppUser,
    Entity::Staff,
    Entity::Student,
    Entity::Course,
    Entity::AcademicSession,
    Entity::CourseRegistration,
];

/// Attendance collected on a node.
const NODE_ENTITIES: [Entity; 2] = [Entity::AttendanceSession, Entity::AttendanceRecord];

/// Entities to export, keyed by the producing side.
pub fn select_entities(from_server: bool) -> &'static [Entity] {
    if from_server {
        &SERVER_ENTITIES
    } else {
        &NODE_ENTITIES
    }
}

/// The side that produced a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Origin {
    Server,
    Node,
}

impl Origin {
    pub const ALL: [Origin; 2] = [Origin::Server, Origin::Node];

    pub fn is_server(self) -> bool {
        self == Origin::Server
    }

    pub fn entities(self) -> &'static [Entity] {
        select_entities(self.is_server())
    }

    pub fn dump_file_name(self) -> &'static str {
        match self {
            Origin::Server => SERVER_DUMP,
            Origin::Node => NODE_DUMP,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Origin::Server => "server",
            Origin::Node => "node",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The side a dump is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Target {
    Server,
    Node,
}

impl Target {
    /// Loading into one side reads the dump the other side produced.
    pub fn source(self) -> Origin {
        match self {
            Target::Server => Origin::Node,
            Target::Node => Origin::Server,
        }
    }

    /// Nodes mirror the server's keys; the server merges many nodes.
    pub fn import_mode(self) -> ImportMode {
        match self {
            Target::Server => ImportMode::Merge,
            Target::Node => ImportMode::Replace,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Target::Server => "server",
            Target::Node => "node",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
