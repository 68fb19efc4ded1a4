use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{attachments::Upload, state::AppState, Error, Result};

use super::{handlers, CreateNote, ListNotesResponse, NoteResponse, RemoveNote, RemovedResponse, UpdateNote};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/note/add", post(add_note))
        .route("/note/list", get(list_notes))
        .route("/note/update", post(update_note))
        .route("/note/remove", post(remove_note))
        .with_state(state)
}

/// `axum::Json` with rejections folded into the shared error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
struct Json<T>(T);

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        axum::Json(self.0).into_response()
    }
}

async fn add_note(State(state): State<AppState>, request: Request) -> Result<(StatusCode, Json<NoteResponse>)> {
    let multipart = Multipart::from_request(request, &()).await?;
    let form = NoteForm::from_multipart(multipart).await?;

    let args = CreateNote {
        title: form.title,
        content: form.content,
        image: form.image,
    };
    let note = handlers::add_note(args, state).await?;

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            success: true,
            message: "Note Added".into(),
            note,
        }),
    ))
}

async fn list_notes(State(state): State<AppState>) -> Result<Json<ListNotesResponse>> {
    let data = handlers::list_notes(state).await?;
    Ok(Json(ListNotesResponse { success: true, data }))
}

/// Takes either a JSON body or a multipart form; only multipart can carry a
/// replacement image.
async fn update_note(State(state): State<AppState>, request: Request) -> Result<Json<NoteResponse>> {
    let args = if is_json(&request) {
        let Json(args) = Json::<UpdateNote>::from_request(request, &()).await?;
        args
    } else {
        let multipart = Multipart::from_request(request, &()).await?;
        let form = NoteForm::from_multipart(multipart).await?;
        UpdateNote {
            id: form.id,
            title: form.title,
            content: form.content,
            image: form.image,
        }
    };

    let note = handlers::update_note(args, state).await?;

    Ok(Json(NoteResponse {
        success: true,
        message: "Note updated successfully".into(),
        note,
    }))
}

async fn remove_note(State(state): State<AppState>, Json(args): Json<RemoveNote>) -> Result<Json<RemovedResponse>> {
    handlers::remove_note(args.id, state).await?;

    Ok(Json(RemovedResponse {
        success: true,
        message: "Note deleted successfully".into(),
    }))
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// The multipart shape both write endpoints accept.
#[derive(Debug, Default)]
struct NoteForm {
    id: Option<Uuid>,
    title: Option<String>,
    content: Option<String>,
    image: Option<Upload>,
}

impl NoteForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("id") => {
                    let text = field.text().await?;
                    let id = text
                        .parse()
                        .map_err(|_| Error::Validation(format!("'{text}' is not a valid note id")))?;
                    form.id = Some(id);
                }
                Some("title") => form.title = Some(field.text().await?),
                Some("content") => form.content = Some(field.text().await?),
                Some("image") => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await?;

                    // an empty file input means "no attachment"
                    if !bytes.is_empty() {
                        form.image = Some(Upload {
                            file_name,
                            content_type,
                            bytes,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum_test::{
        multipart::{MultipartForm, Part},
        TestServer,
    };
    use serde_json::json;
    use uuid::Uuid;

    use crate::{
        attachments::{AttachmentStore, MemoryStore, MAX_ATTACHMENT_BYTES},
        db::{init_test_db, DB},
        errors::Result,
        notes::{ListNotesResponse, NoteResponse, RemovedResponse},
    };

    async fn test_server(db: DB, attachments: Arc<dyn AttachmentStore>) -> Result<TestServer> {
        crate::tests::test_server(db, attachments, super::router).await
    }

    async fn memory_server() -> Result<(TestServer, Arc<MemoryStore>)> {
        let attachments = Arc::new(MemoryStore::new());
        let server = test_server(init_test_db().await?, attachments.clone()).await?;
        Ok((server, attachments))
    }

    fn note_form(title: &str, content: &str) -> MultipartForm {
        MultipartForm::new().add_text("title", title).add_text("content", content)
    }

    fn png_part(bytes: Vec<u8>) -> Part {
        Part::bytes(bytes).file_name("pic.png").mime_type("image/png")
    }

    async fn add(server: &TestServer, title: &str, content: &str) -> NoteResponse {
        let response = server.post("/note/add").multipart(note_form(title, content)).await;
        assert_eq!(response.status_code(), 201);
        response.json::<NoteResponse>()
    }

    #[tokio::test]
    async fn add_note_returns_the_created_note() -> Result<()> {
        let (server, _) = memory_server().await?;

        let body = add(&server, "Groceries", "milk, eggs").await;
        assert!(body.success);
        assert_eq!(body.note.title, "Groceries");
        assert_eq!(body.note.content, "milk, eggs");
        assert_eq!(body.note.image, None);
        Ok(())
    }

    #[tokio::test]
    async fn add_note_requires_title_and_content() -> Result<()> {
        let (server, _) = memory_server().await?;

        for form in [note_form("", "x"), note_form("x", "")] {
            let response = server.post("/note/add").multipart(form).expect_failure().await;
            assert_eq!(response.status_code(), 400);

            let body = response.json::<serde_json::Value>();
            assert_eq!(body["success"], json!(false));
            assert_eq!(body["message"], json!("Title and content are required"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn list_notes_returns_newest_first() -> Result<()> {
        let (server, _) = memory_server().await?;

        let a = add(&server, "A", "first").await;
        let b = add(&server, "B", "second").await;

        let response = server.get("/note/list").await;
        assert_eq!(response.status_code(), 200);

        let body = response.json::<ListNotesResponse>();
        assert!(body.success);
        let ids: Vec<_> = body.data.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.note.id, a.note.id]);
        Ok(())
    }

    #[tokio::test]
    async fn update_note_changes_only_supplied_fields() -> Result<()> {
        let (server, _) = memory_server().await?;
        let created = add(&server, "old title", "old content").await;

        let response = server
            .post("/note/update")
            .json(&json!({ "id": created.note.id, "title": "new title" }))
            .await;
        assert_eq!(response.status_code(), 200);

        let body = response.json::<NoteResponse>();
        assert_eq!(body.note.title, "new title");
        assert_eq!(body.note.content, "old content");
        assert_eq!(body.note.image, None);
        assert_eq!(body.note.created_at, created.note.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn update_note_accepts_multipart() -> Result<()> {
        let (server, attachments) = memory_server().await?;
        let created = add(&server, "plain", "note").await;

        let form = MultipartForm::new()
            .add_text("id", created.note.id.to_string())
            .add_text("content", "now illustrated")
            .add_part("image", png_part(vec![1, 2, 3]));

        let response = server.post("/note/update").multipart(form).await;
        assert_eq!(response.status_code(), 200);

        let body = response.json::<NoteResponse>();
        assert_eq!(body.note.title, "plain");
        assert_eq!(body.note.content, "now illustrated");
        let reference = body.note.image.expect("image reference");
        assert!(attachments.contains(&reference));
        Ok(())
    }

    #[tokio::test]
    async fn update_unknown_note_is_404() -> Result<()> {
        let (server, _) = memory_server().await?;

        let response = server
            .post("/note/update")
            .json(&json!({ "id": Uuid::now_v7(), "title": "x" }))
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), 404);

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Note not found"));
        Ok(())
    }

    #[tokio::test]
    async fn update_replaces_and_releases_the_old_image() -> Result<()> {
        let (server, attachments) = memory_server().await?;

        let form = note_form("pic", "v1").add_part("image", png_part(vec![1]));
        let response = server.post("/note/add").multipart(form).await;
        let created = response.json::<NoteResponse>();
        let old = created.note.image.expect("image reference");

        let form = MultipartForm::new()
            .add_text("id", created.note.id.to_string())
            .add_part("image", png_part(vec![2]));
        let response = server.post("/note/update").multipart(form).await;
        let updated = response.json::<NoteResponse>();
        let new = updated.note.image.expect("image reference");

        assert_ne!(new, old);
        assert!(!attachments.contains(&old));
        assert!(attachments.contains(&new));
        assert_eq!(attachments.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn remove_note_then_list_no_longer_contains_it() -> Result<()> {
        let (server, _) = memory_server().await?;
        let created = add(&server, "Groceries", "milk, eggs").await;

        let response = server.post("/note/remove").json(&json!({ "id": created.note.id })).await;
        assert_eq!(response.status_code(), 200);
        assert!(response.json::<RemovedResponse>().success);

        let list = server.get("/note/list").await.json::<ListNotesResponse>();
        assert!(list.data.is_empty());

        // removing again is a 404
        let response = server
            .post("/note/remove")
            .json(&json!({ "id": created.note.id }))
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), 404);
        Ok(())
    }

    #[tokio::test]
    async fn remove_note_releases_its_attachment() -> Result<()> {
        let (server, attachments) = memory_server().await?;

        let form = note_form("pic", "v1").add_part("image", png_part(vec![1]));
        let created = server.post("/note/add").multipart(form).await.json::<NoteResponse>();
        assert_eq!(attachments.len(), 1);

        server.post("/note/remove").json(&json!({ "id": created.note.id })).await;
        assert!(attachments.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn oversized_image_is_rejected_and_nothing_is_stored() -> Result<()> {
        let (server, attachments) = memory_server().await?;

        let form = note_form("big", "file").add_part("image", png_part(vec![0u8; MAX_ATTACHMENT_BYTES + 1]));
        let response = server.post("/note/add").multipart(form).expect_failure().await;

        assert_eq!(response.status_code(), 400);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("5 MiB"));

        assert!(attachments.is_empty());
        let list = server.get("/note/list").await.json::<ListNotesResponse>();
        assert!(list.data.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() -> Result<()> {
        let (server, attachments) = memory_server().await?;

        let part = Part::bytes(b"hello".to_vec()).file_name("notes.txt").mime_type("text/plain");
        let form = note_form("doc", "text").add_part("image", part);
        let response = server.post("/note/add").multipart(form).expect_failure().await;

        assert_eq!(response.status_code(), 400);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("text/plain"));

        assert!(attachments.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_remove_body_is_400() -> Result<()> {
        let (server, _) = memory_server().await?;

        let response = server
            .post("/note/remove")
            .json(&json!({ "id": "not-a-uuid" }))
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<serde_json::Value>()["success"], json!(false));
        Ok(())
    }
}
