use lazy_static::lazy_static;
use rusqlite_migration::{Migrations, M};

lazy_static! {
    pub static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![M::up(
        r#"
        CREATE TABLE notes (
            id BLOB PRIMARY KEY CHECK(length(id) = 16) NOT NULL UNIQUE DEFAULT (uuid7_now()),

            title TEXT NOT NULL CHECK(length(title) > 0),
            content TEXT NOT NULL CHECK(length(content) > 0),
            image TEXT,

            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#
    ),]);
}
