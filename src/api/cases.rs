use crate::api::error_response;
use crate::api::uploads::{read_file_field, DocumentUploadForm};
use crate::database::MongoDB;
use crate::models::{
    AddNoteRequest, AuthUser, CaseResponse, CreateCaseRequest, DocumentResponse, NoteResponse,
    UpdateCaseRequest,
};
use crate::services::{case_service, document_service, Notifier};
use crate::storage::{FileStore, StorageArea};
use crate::utils::AppError;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "Cases",
    responses((status = 200, description = "Cases where the caller is lawyer or client", body = [CaseResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_cases(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>) -> HttpResponse {
    log::info!("📁 GET /api/cases - user: {}", user.id);

    match case_service::list(&db, &user).await {
        Ok(cases) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": cases.len(),
            "cases": cases
        })),
        Err(e) => error_response("GET /api/cases", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = String, Path, description = "Case id")),
    responses(
        (status = 200, description = "Case with populated parties", body = CaseResponse),
        (status = 403, description = "Not a party to the case"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_case(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    match case_service::get(&db, &id, &user).await {
        Ok(case) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "case": case
        })),
        Err(e) => error_response("GET /api/cases/{id}", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/cases",
    tag = "Cases",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case created", body = CaseResponse),
        (status = 403, description = "Only lawyers can create cases"),
        (status = 404, description = "Client not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_case(
    db: web::Data<MongoDB>,
    notifier: web::Data<Notifier>,
    user: web::ReqData<AuthUser>,
    request: web::Json<CreateCaseRequest>,
) -> HttpResponse {
    log::info!("📁 POST /api/cases - lawyer: {}, client: {}", user.id, request.client_id);

    match case_service::create(&db, &notifier, &user, &request).await {
        Ok(case) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "case": case
        })),
        Err(e) => error_response("POST /api/cases", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = String, Path, description = "Case id")),
    request_body = UpdateCaseRequest,
    responses(
        (status = 200, description = "Case updated", body = CaseResponse),
        (status = 403, description = "Not the assigned lawyer")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_case(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    request: web::Json<UpdateCaseRequest>,
) -> HttpResponse {
    log::info!("📁 PUT /api/cases/{} - user: {}", id, user.id);

    match case_service::update(&db, &id, &user, &request).await {
        Ok(case) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "case": case
        })),
        Err(e) => error_response("PUT /api/cases/{id}", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = String, Path, description = "Case id")),
    responses(
        (status = 200, description = "Case deleted"),
        (status = 403, description = "Not the assigned lawyer"),
        (status = 404, description = "Case not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_case(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    log::info!("🗑️  DELETE /api/cases/{} - user: {}", id, user.id);

    match case_service::delete(&db, &id, &user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Case deleted"
        })),
        Err(e) => error_response("DELETE /api/cases/{id}", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/cases/{id}/notes",
    tag = "Cases",
    params(("id" = String, Path, description = "Case id")),
    request_body = AddNoteRequest,
    responses(
        (status = 201, description = "Note appended; returns the visible notes", body = [NoteResponse]),
        (status = 403, description = "Not a party to the case")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_note(
    db: web::Data<MongoDB>,
    notifier: web::Data<Notifier>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    request: web::Json<AddNoteRequest>,
) -> HttpResponse {
    log::info!("📝 POST /api/cases/{}/notes - user: {}", id, user.id);

    match case_service::add_note(&db, &notifier, &id, &user, &request).await {
        Ok(notes) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "notes": notes
        })),
        Err(e) => error_response("POST /api/cases/{id}/notes", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}/documents",
    tag = "Documents",
    params(("id" = String, Path, description = "Case id")),
    responses(
        (status = 200, description = "Documents of the case, newest first", body = [DocumentResponse]),
        (status = 403, description = "Not a party to the case")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_documents(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    match document_service::list(&db, &id, &user).await {
        Ok(documents) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": documents.len(),
            "documents": documents
        })),
        Err(e) => error_response("GET /api/cases/{id}/documents", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/cases/{id}/documents",
    tag = "Documents",
    params(("id" = String, Path, description = "Case id")),
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document uploaded", body = DocumentResponse),
        (status = 400, description = "Missing file, disallowed type or file too large"),
        (status = 403, description = "Not a party to the case")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_document(
    db: web::Data<MongoDB>,
    store: web::Data<dyn FileStore>,
    notifier: web::Data<Notifier>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    payload: Multipart,
) -> HttpResponse {
    log::info!("📤 POST /api/cases/{}/documents - user: {}", id, user.id);

    let case = match document_service::case_for_upload(&db, &id, &user).await {
        Ok(case) => case,
        Err(e) => return error_response("POST /api/cases/{id}/documents", e),
    };

    let file = match read_file_field(payload, "document", StorageArea::Documents).await {
        Ok(Some(file)) => file,
        Ok(None) => return error_response("POST /api/cases/{id}/documents", AppError::validation("Please upload a file")),
        Err(e) => return error_response("POST /api/cases/{id}/documents", e),
    };

    match document_service::upload(&db, store.get_ref(), &notifier, &case, &user, file).await {
        Ok(document) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "document": document
        })),
        Err(e) => error_response("POST /api/cases/{id}/documents", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::storage::StoredFile;
    use actix_web::dev::Service;
    use actix_web::{test, App, HttpMessage};
    use async_trait::async_trait;
    use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BOUNDARY: &str = "----legalease-boundary";

    /// Counts writes without touching the disk.
    #[derive(Default)]
    struct CountingStore {
        puts: AtomicUsize,
    }

    #[async_trait]
    impl FileStore for CountingStore {
        async fn put(&self, area: StorageArea, owner: &str, _name: &str, bytes: &[u8]) -> Result<StoredFile, AppError> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst);
            Ok(StoredFile {
                key: format!("{}/stub-{}-{}.pdf", area.directory(), owner, n),
                size: bytes.len() as i64,
            })
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, AppError> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    async fn insert_user(db: &MongoDB, role: Role) -> AuthUser {
        let mut user = User {
            id: None,
            name: format!("{} user", role),
            email: format!("{}@example.com", ObjectId::new().to_hex()),
            password: "not-a-real-hash".into(),
            role,
            phone: None,
            is_active: true,
            password_reset_token: None,
            password_reset_expires: None,
            cases: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
        };
        user.id = db.users().insert_one(&user).await.unwrap().inserted_id.as_object_id();
        AuthUser::from_user(&user).unwrap()
    }

    fn multipart_request(case_id: &str, part: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri(&format!("/api/cases/{}/documents", case_id))
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(format!("--{b}\r\n{p}\r\n--{b}--\r\n", b = BOUNDARY, p = part))
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn upload_without_document_part_is_400_and_stores_nothing() {
        let db = crate::database::test_database().await;
        let (notifier, _events) = Notifier::channel();
        let lawyer = insert_user(&db, Role::Lawyer).await;
        let client = insert_user(&db, Role::Client).await;

        let request = CreateCaseRequest {
            title: "Lease dispute".into(),
            description: "Deposit withheld".into(),
            category: None,
            client_id: client.id.to_hex(),
        };
        let case = case_service::create(&db, &notifier, &lawyer, &request).await.unwrap();

        let store = Arc::new(CountingStore::default());
        let store_data: web::Data<dyn FileStore> = web::Data::from(store.clone() as Arc<dyn FileStore>);
        let caller = client.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.clone()))
                .app_data(web::Data::new(notifier))
                .app_data(store_data)
                .wrap_fn(move |req, srv| {
                    req.extensions_mut().insert(caller.clone());
                    srv.call(req)
                })
                .route("/api/cases/{id}/documents", web::post().to(upload_document)),
        )
        .await;

        let text_only = "Content-Disposition: form-data; name=\"note\"\r\n\r\nsee attached";
        let res = test::call_service(&app, multipart_request(&case.id, text_only).to_request()).await;
        assert_eq!(res.status().as_u16(), 400);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "Please upload a file");

        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
        let case_oid = ObjectId::parse_str(&case.id).unwrap();
        assert_eq!(db.documents().count_documents(doc! { "caseId": case_oid }).await.unwrap(), 0);

        let with_file = "Content-Disposition: form-data; name=\"document\"; filename=\"lease.pdf\"\r\n\
                         Content-Type: application/pdf\r\n\r\n%PDF-1.4";
        let res = test::call_service(&app, multipart_request(&case.id, with_file).to_request()).await;
        assert_eq!(res.status().as_u16(), 201);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }
}
