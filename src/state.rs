use std::sync::Arc;

use axum::extract::FromRef;

use crate::{attachments::AttachmentStore, db::DB};

#[derive(FromRef, Clone)]
pub struct AppState {
    pub conn: DB,
    pub attachments: Arc<dyn AttachmentStore>,
}
