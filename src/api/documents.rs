use crate::api::error_response;
use crate::database::MongoDB;
use crate::models::AuthUser;
use crate::services::document_service;
use crate::storage::FileStore;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};

/// File bytes as an attachment download.
pub fn attachment(filename: &str, content_type: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(content_type.to_string())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename.to_string())],
        })
        .body(bytes)
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}/download",
    tag = "Documents",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "File contents"),
        (status = 403, description = "Not the uploader or a party to the case"),
        (status = 404, description = "Document or file not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_document(
    db: web::Data<MongoDB>,
    store: web::Data<dyn FileStore>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
) -> HttpResponse {
    log::info!("📥 GET /api/documents/{}/download - user: {}", id, user.id);

    match document_service::download(&db, store.get_ref(), &id, &user).await {
        Ok((document, bytes)) => attachment(&document.filename, &document.mime_type, bytes),
        Err(e) => error_response("GET /api/documents/{id}/download", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "Documents",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 403, description = "Not the uploader or assigned lawyer"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_document(
    db: web::Data<MongoDB>,
    store: web::Data<dyn FileStore>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️  DELETE /api/documents/{} - user: {}", id, user.id);

    match document_service::delete(&db, store.get_ref(), &id, &user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Document deleted"
        })),
        Err(e) => error_response("DELETE /api/documents/{id}", e),
    }
}
