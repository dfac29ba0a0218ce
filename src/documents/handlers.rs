use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateDocumentRequest, CreatedDocumentResponse, MessageResponse},
    repo::{Document, NewDocument},
};
use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{ValidJson, ValidPath},
    state::AppState,
};

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route("/documents/:id", delete(delete_document))
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.documents.list_for_user(auth.id).await?))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id))]
pub async fn create_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<CreatedDocumentResponse>), ApiError> {
    let filename = payload.filename.as_deref().map(str::trim).unwrap_or_default();
    let file_path = payload.file_path.as_deref().map(str::trim).unwrap_or_default();
    if filename.is_empty() || file_path.is_empty() {
        return Err(ApiError::invalid("Filename and file_path are required"));
    }

    let doc = state
        .documents
        .insert(auth.id, NewDocument { filename, file_path })
        .await?;

    info!(document_id = doc.id, "document recorded");
    Ok((
        StatusCode::CREATED,
        Json(CreatedDocumentResponse {
            message: "Document record created",
            id: doc.id,
        }),
    ))
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.documents.delete(auth.id, id).await? {
        warn!(document_id = id, "delete of missing or foreign document");
        return Err(ApiError::NotFound("Document not found".into()));
    }
    Ok(Json(MessageResponse {
        message: "Document deleted",
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{
        app::testing::{bearer, send},
        auth::claims::TokenSubject,
        state::AppState,
        users::NewUser,
    };

    async fn user_token(state: &AppState, email: &str) -> String {
        let user = state
            .users
            .insert(NewUser {
                name: "Doc Owner",
                email,
                password_hash: "x",
            })
            .await
            .expect("seed");
        bearer(&state.tokens.issue(&TokenSubject::from(&user)).expect("token"))
    }

    #[tokio::test]
    async fn documents_are_private_to_their_owner() {
        let state = AppState::fake();
        let alice = user_token(&state, "alice@x.com").await;
        let bob = user_token(&state, "bob@x.com").await;

        let (status, created) = send(
            &state,
            Method::POST,
            "/documents",
            Some(&alice),
            Some(json!({ "filename": "notes.pdf", "file_path": "docs/notes.pdf" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["message"], "Document record created");
        let id = created["id"].as_i64().expect("id");

        send(
            &state,
            Method::POST,
            "/documents",
            Some(&alice),
            Some(json!({ "filename": "later.pdf", "file_path": "docs/later.pdf" })),
        )
        .await;

        let (status, listed) = send(&state, Method::GET, "/documents", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().expect("array");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["filename"], "later.pdf");
        assert!(listed[0].get("user_id").is_none());
        assert!(listed[0]["upload_date"].is_string());

        let (_, bobs) = send(&state, Method::GET, "/documents", Some(&bob), None).await;
        assert_eq!(bobs, json!([]));

        let uri = format!("/documents/{id}");
        let (status, _) = send(&state, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&state, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&state, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_requires_both_fields() {
        let state = AppState::fake();
        let token = user_token(&state, "a@x.com").await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/documents",
            Some(&token),
            Some(json!({ "filename": "only-name.pdf" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Filename and file_path are required");
    }

    #[tokio::test]
    async fn listing_needs_a_token() {
        let state = AppState::fake();
        let (status, _) = send(&state, Method::GET, "/documents", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_numeric_id_is_a_json_400() {
        let state = AppState::fake();
        let token = user_token(&state, "a@x.com").await;

        let (status, body) =
            send(&state, Method::DELETE, "/documents/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
