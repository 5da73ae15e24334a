//! Build script for embedded migrations.
//!
//! `sqlx::migrate!` embeds `data/sql/sqlite` at compile time, so cargo must
//! rebuild when a migration is added or edited.

fn main() {
    println!("cargo:rerun-if-changed=data/sql/sqlite");
}
