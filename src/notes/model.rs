use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachments::Upload;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted by `/note/add`.
#[derive(Debug, Default)]
pub struct CreateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<Upload>,
}

/// Fields accepted by `/note/update`. Omitted fields keep their prior
/// values; a JSON body cannot carry an image.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNote {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(skip)]
    pub image: Option<Upload>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveNote {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub success: bool,
    pub message: String,
    pub note: Note,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListNotesResponse {
    pub success: bool,
    pub data: Vec<Note>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub success: bool,
    pub message: String,
}
