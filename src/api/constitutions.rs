use crate::api::documents::attachment;
use crate::api::error_response;
use crate::api::uploads::{read_file_field, ConstitutionUploadForm};
use crate::database::MongoDB;
use crate::models::{
    AuthUser, ConstitutionQuery, ConstitutionResponse, CreateConstitutionRequest,
    GetConstitutionQuery, UpdateConstitutionRequest, UploadedFileResponse,
};
use crate::services::constitution_service;
use crate::services::access_policy::{authorize, Action};
use crate::storage::{FileStore, StorageArea};
use crate::utils::AppError;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

#[utoipa::path(
    get,
    path = "/api/constitutions",
    tag = "Constitutions",
    params(ConstitutionQuery),
    responses((status = 200, description = "Visible constitutions, newest first", body = [ConstitutionResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_constitutions(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<ConstitutionQuery>,
) -> HttpResponse {
    log::info!("📚 GET /api/constitutions - user: {}", user.id);

    match constitution_service::list(&db, &user, &query).await {
        Ok(constitutions) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": constitutions.len(),
            "constitutions": constitutions
        })),
        Err(e) => error_response("GET /api/constitutions", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/constitutions/{id}",
    tag = "Constitutions",
    params(("id" = String, Path, description = "Constitution id"), GetConstitutionQuery),
    responses(
        (status = 200, description = "Constitution metadata", body = ConstitutionResponse),
        (status = 404, description = "Not found or private")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_constitution(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    query: web::Query<GetConstitutionQuery>,
) -> HttpResponse {
    let increment = query.increment.unwrap_or(false);

    match constitution_service::get(&db, &id, increment, &user).await {
        Ok(constitution) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "constitution": constitution
        })),
        Err(e) => error_response("GET /api/constitutions/{id}", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/constitutions/{id}/file",
    tag = "Constitutions",
    params(("id" = String, Path, description = "Constitution id")),
    responses(
        (status = 200, description = "PDF contents"),
        (status = 404, description = "Constitution or file not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_constitution_file(
    db: web::Data<MongoDB>,
    store: web::Data<dyn FileStore>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
) -> HttpResponse {
    match constitution_service::file(&db, store.get_ref(), &id, &user).await {
        Ok((constitution, bytes)) => attachment(&constitution.file_name, "application/pdf", bytes),
        Err(e) => error_response("GET /api/constitutions/{id}/file", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/constitutions/upload",
    tag = "Constitutions",
    request_body(content = ConstitutionUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored; pass the reference to create", body = UploadedFileResponse),
        (status = 400, description = "Missing file, not a PDF or larger than 20 MB"),
        (status = 403, description = "Only lawyers can upload")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_constitution_file(
    store: web::Data<dyn FileStore>,
    user: web::ReqData<AuthUser>,
    payload: Multipart,
) -> HttpResponse {
    log::info!("📤 POST /api/constitutions/upload - user: {}", user.id);

    if let Err(e) = authorize(&user, Action::UploadConstitutionFile) {
        return error_response("POST /api/constitutions/upload", e);
    }

    let file = match read_file_field(payload, "file", StorageArea::Constitutions).await {
        Ok(Some(file)) => file,
        Ok(None) => return error_response("POST /api/constitutions/upload", AppError::validation("Please upload a file")),
        Err(e) => return error_response("POST /api/constitutions/upload", e),
    };

    match constitution_service::upload_file(store.get_ref(), &user, file).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response("POST /api/constitutions/upload", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/constitutions",
    tag = "Constitutions",
    request_body = CreateConstitutionRequest,
    responses(
        (status = 201, description = "Constitution created", body = ConstitutionResponse),
        (status = 400, description = "Invalid data")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_constitution(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    request: web::Json<CreateConstitutionRequest>,
) -> HttpResponse {
    log::info!("📚 POST /api/constitutions - user: {}", user.id);

    match constitution_service::create(&db, &user, &request).await {
        Ok(constitution) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "constitution": constitution
        })),
        Err(e) => error_response("POST /api/constitutions", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/constitutions/{id}",
    tag = "Constitutions",
    params(("id" = String, Path, description = "Constitution id")),
    request_body = UpdateConstitutionRequest,
    responses(
        (status = 200, description = "Constitution updated", body = ConstitutionResponse),
        (status = 403, description = "Not the uploader")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_constitution(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    request: web::Json<UpdateConstitutionRequest>,
) -> HttpResponse {
    match constitution_service::update(&db, &id, &user, &request).await {
        Ok(constitution) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "constitution": constitution
        })),
        Err(e) => error_response("PUT /api/constitutions/{id}", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/constitutions/{id}",
    tag = "Constitutions",
    params(("id" = String, Path, description = "Constitution id")),
    responses(
        (status = 200, description = "Constitution deleted"),
        (status = 403, description = "Not the uploader")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_constitution(
    db: web::Data<MongoDB>,
    store: web::Data<dyn FileStore>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️  DELETE /api/constitutions/{} - user: {}", id, user.id);

    match constitution_service::delete(&db, store.get_ref(), &id, &user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Constitution deleted"
        })),
        Err(e) => error_response("DELETE /api/constitutions/{id}", e),
    }
}
