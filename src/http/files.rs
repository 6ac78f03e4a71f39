use axum::extract::State;
use axum::Json;

use crate::errors::Result;
use crate::session::UploadSessions;
use crate::types::FileEntry;

// GET /api/files
pub(super) async fn list_files(
    State(sessions): State<UploadSessions>,
) -> Result<Json<Vec<FileEntry>>> {
    Ok(Json(sessions.list_files().await?))
}
