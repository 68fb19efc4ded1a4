use std::sync::Arc;

use uuid::Uuid;

use crate::{attachments::AttachmentStore, state::AppState, Error, Result};

use super::{store, CreateNote, Note, UpdateNote};

pub async fn add_note(CreateNote { title, content, image }: CreateNote, state: AppState) -> Result<Note> {
    let (title, content) = match (non_empty(title), non_empty(content)) {
        (Some(title), Some(content)) => (title, content),
        _ => return Err(Error::Validation("Title and content are required".into())),
    };

    let image = match image {
        Some(upload) => Some(state.attachments.resolve(upload).await?),
        None => None,
    };

    // If the insert fails past this point the stored file is orphaned; the
    // resolver has no transactional coupling to the store.
    store::create(
        &state.conn,
        store::NewNote { title, content, image },
    )
    .await
    .map_err(Error::from)
}

pub async fn list_notes(state: AppState) -> Result<Vec<Note>> {
    store::list(&state.conn).await.map_err(Error::from)
}

pub async fn update_note(UpdateNote { id, title, content, image }: UpdateNote, state: AppState) -> Result<Note> {
    let id = id.ok_or_else(|| Error::Validation("id is required".into()))?;
    let title = reject_empty("title", title)?;
    let content = reject_empty("content", content)?;

    let current = store::get(&state.conn, id).await?;

    let image = match image {
        Some(upload) => Some(state.attachments.resolve(upload).await?),
        None => None,
    };

    let changes = store::NoteChanges {
        title,
        content,
        image: image.clone(),
    };
    let updated = match store::update(&state.conn, id, changes).await {
        Ok(note) => note,
        Err(err) => {
            // the write failed after the new upload landed; drop the fresh
            // file so it is not orphaned
            if let Some(reference) = &image {
                release_quietly(&state.attachments, reference).await;
            }
            return Err(err.into());
        }
    };

    // the replaced attachment goes away only once the new reference is durable
    if image.is_some() {
        if let Some(old) = &current.image {
            release_quietly(&state.attachments, old).await;
        }
    }

    Ok(updated)
}

pub async fn remove_note(id: Uuid, state: AppState) -> Result<()> {
    let note = store::delete(&state.conn, id).await?;

    if let Some(reference) = &note.image {
        release_quietly(&state.attachments, reference).await;
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Omitted fields pass through; supplied-but-blank ones are rejected rather
/// than silently kept.
fn reject_empty(field: &'static str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(Error::Validation(format!("{field} must not be empty"))),
        value => Ok(value),
    }
}

async fn release_quietly(store: &Arc<dyn AttachmentStore>, reference: &str) {
    if let Err(error) = store.release(reference).await {
        tracing::warn!(reference, "failed to release attachment: {error}");
    }
}
