use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{self, DB};

use super::Note;

pub struct NewNote {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

/// Partial changes; `None` keeps the stored value.
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

impl<'a> TryFrom<&Row<'a>> for Note {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            image: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

pub async fn create(db: &DB, note: NewNote) -> db::Result<Note> {
    // id and created_at are assigned here, never taken from the client
    let id = Uuid::now_v7();
    let created_at = Utc::now();

    db.call(move |conn| {
        conn.query_row(
            r#"INSERT INTO notes (id, title, content, image, created_at) VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, content, image, created_at"#,
            params![id, note.title, note.content, note.image, created_at],
            |row| Note::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
}

pub async fn list(db: &DB) -> db::Result<Vec<Note>> {
    db.call(|conn| {
        let notes = conn
            .prepare("SELECT id, title, content, image, created_at FROM notes ORDER BY created_at DESC, id DESC")?
            .query_map([], |row| Note::try_from(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    })
    .await
    .map_err(db::Error::from)
}

pub async fn get(db: &DB, id: Uuid) -> db::Result<Note> {
    db.call(move |conn| {
        let note = conn.query_row(
            "SELECT id, title, content, image, created_at FROM notes WHERE id = ?",
            params![id],
            |row| Note::try_from(row),
        )?;
        Ok(note)
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Note not found"))
}

pub async fn update(db: &DB, id: Uuid, changes: NoteChanges) -> db::Result<Note> {
    db.call(move |conn| {
        conn.query_row(
            r#"UPDATE notes
            SET title = coalesce(?, title), content = coalesce(?, content), image = coalesce(?, image)
            WHERE id = ?
            RETURNING id, title, content, image, created_at"#,
            params![changes.title, changes.content, changes.image, id],
            |row| Note::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Note not found"))
}

pub async fn delete(db: &DB, id: Uuid) -> db::Result<Note> {
    db.call(move |conn| {
        conn.query_row(
            r#"DELETE FROM notes
            WHERE id = ?
            RETURNING id, title, content, image, created_at"#,
            params![id],
            |row| Note::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Note not found"))
}
