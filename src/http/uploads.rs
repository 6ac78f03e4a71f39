use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State, TypedHeader};
use axum::headers::ContentLength;
use axum::http::{Request, StatusCode};
use axum::Json;
use hyper::body::Body;

use crate::errors::Result;
use crate::session::UploadSessions;
use crate::types::{
    AbortUploadQuery, CompleteUploadRequest, CompleteUploadResponse, StartUploadRequest,
    StartUploadResponse, UploadPartQuery, UploadPartResponse,
};

// POST /api/start-upload
pub(super) async fn start_upload(
    State(sessions): State<UploadSessions>,
    request: std::result::Result<Json<StartUploadRequest>, JsonRejection>,
) -> Result<Json<StartUploadResponse>> {
    let Json(request) = request?;
    Ok(Json(sessions.start_upload(request).await?))
}

// PUT /api/upload-part?key=&uploadId=&partNumber=
//
// the request body is the raw part and is handed to the store as a stream
pub(super) async fn upload_part(
    State(sessions): State<UploadSessions>,
    content_length: Option<TypedHeader<ContentLength>>,
    query: std::result::Result<Query<UploadPartQuery>, QueryRejection>,
    request: Request<Body>,
) -> Result<Json<UploadPartResponse>> {
    let Query(query) = query?;
    let content_length = content_length.map(|TypedHeader(length)| length.0);
    Ok(Json(
        sessions
            .upload_part(query, content_length, request.into_body())
            .await?,
    ))
}

// POST /api/complete-upload
pub(super) async fn complete_upload(
    State(sessions): State<UploadSessions>,
    request: std::result::Result<Json<CompleteUploadRequest>, JsonRejection>,
) -> Result<Json<CompleteUploadResponse>> {
    let Json(request) = request?;
    Ok(Json(sessions.complete_upload(request).await?))
}

// DELETE /api/abort-upload?key=&uploadId=
pub(super) async fn abort_upload(
    State(sessions): State<UploadSessions>,
    query: std::result::Result<Query<AbortUploadQuery>, QueryRejection>,
) -> Result<StatusCode> {
    let Query(query) = query?;
    sessions.abort_upload(query).await?;
    Ok(StatusCode::NO_CONTENT)
}
