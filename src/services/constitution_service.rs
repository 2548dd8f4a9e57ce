use crate::{
    database::MongoDB,
    models::{
        AuthUser, Constitution, ConstitutionQuery, ConstitutionResponse, CreateConstitutionRequest,
        UpdateConstitutionRequest, UploadedFileResponse,
    },
    services::{
        access_policy::{authorize, Action},
        populate,
    },
    storage::{FileStore, StorageArea, UploadedFile},
    utils::{parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;
use validator::Validate;

/// Everything the caller may see, narrowed by the optional query filters.
fn list_filter(user_id: ObjectId, query: &ConstitutionQuery) -> Document {
    let mut filter = doc! { "$or": [ { "isPublic": true }, { "uploadedBy": user_id } ] };
    if let Some(category) = query.category {
        filter.insert("category", category.as_str());
    }
    if let Some(is_public) = query.is_public {
        filter.insert("isPublic", is_public);
    }
    filter
}

async fn find_constitution(db: &MongoDB, id: &ObjectId) -> Result<Constitution, AppError> {
    db.constitutions()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Constitution not found"))
}

async fn build_response(db: &MongoDB, constitution: Constitution) -> Result<ConstitutionResponse, AppError> {
    let mut uploaders = populate::user_summaries(db, [constitution.uploaded_by]).await?;
    let uploader = uploaders.remove(&constitution.uploaded_by);
    Ok(ConstitutionResponse::new(constitution, uploader))
}

pub async fn list(db: &MongoDB, user: &AuthUser, query: &ConstitutionQuery) -> Result<Vec<ConstitutionResponse>, AppError> {
    let constitutions: Vec<Constitution> = db
        .constitutions()
        .find(list_filter(user.id, query))
        .sort(doc! { "uploadedAt": -1 })
        .await?
        .try_collect()
        .await?;

    let uploaders = populate::user_summaries(db, constitutions.iter().map(|c| c.uploaded_by).collect::<Vec<_>>()).await?;
    Ok(constitutions
        .into_iter()
        .map(|constitution| {
            let uploader = uploaders.get(&constitution.uploaded_by).cloned();
            ConstitutionResponse::new(constitution, uploader)
        })
        .collect())
}

/// With `increment`, the fetch counts as one download.
pub async fn get(db: &MongoDB, id: &str, increment: bool, user: &AuthUser) -> Result<ConstitutionResponse, AppError> {
    let id = parse_object_id(id)?;
    let constitution = find_constitution(db, &id).await?;
    authorize(user, Action::ViewConstitution(&constitution))?;

    if !increment {
        return build_response(db, constitution).await;
    }

    let updated = db
        .constitutions()
        .find_one_and_update(doc! { "_id": id }, doc! { "$inc": { "downloadCount": 1_i64 } })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Constitution not found"))?;
    build_response(db, updated).await
}

/// Stored file bytes for a visible constitution; does not count as a download.
pub async fn file(
    db: &MongoDB,
    store: &dyn FileStore,
    id: &str,
    user: &AuthUser,
) -> Result<(Constitution, Vec<u8>), AppError> {
    let constitution = find_constitution(db, &parse_object_id(id)?).await?;
    authorize(user, Action::ViewConstitution(&constitution))?;

    let bytes = store
        .get(&constitution.file_url)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;
    Ok((constitution, bytes))
}

pub async fn upload_file(store: &dyn FileStore, user: &AuthUser, file: UploadedFile) -> Result<UploadedFileResponse, AppError> {
    authorize(user, Action::UploadConstitutionFile)?;

    let area = StorageArea::Constitutions;
    area.check_mime_type(&file.content_type)?;
    if file.bytes.len() > area.max_bytes() {
        return Err(AppError::validation("File too large"));
    }

    let stored = store.put(area, &user.id.to_hex(), &file.filename, &file.bytes).await?;
    Ok(UploadedFileResponse {
        success: true,
        file_url: stored.key,
        file_name: file.filename,
        file_size: stored.size,
    })
}

/// The referenced file must be the caller's own constitution upload and not yet attached.
async fn check_file_reference(db: &MongoDB, user: &AuthUser, file_url: &str) -> Result<(), AppError> {
    if !StorageArea::Constitutions.is_owned_key(file_url, &user.id.to_hex()) {
        return Err(AppError::validation("Invalid file reference"));
    }
    if db.constitutions().count_documents(doc! { "fileUrl": file_url }).await? > 0 {
        return Err(AppError::Conflict("File is already attached to a constitution".to_string()));
    }
    Ok(())
}

pub async fn create(db: &MongoDB, user: &AuthUser, request: &CreateConstitutionRequest) -> Result<ConstitutionResponse, AppError> {
    request.validate()?;
    check_file_reference(db, user, &request.file_url).await?;

    let mut constitution = Constitution {
        id: None,
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        file_url: request.file_url.clone(),
        file_name: request.file_name.clone(),
        file_size: request.file_size,
        category: request.category,
        uploaded_by: user.id,
        uploaded_at: BsonDateTime::now(),
        download_count: 0,
        is_public: request.is_public.unwrap_or(true),
    };

    let result = db.constitutions().insert_one(&constitution).await?;
    constitution.id = result.inserted_id.as_object_id();

    log::info!("📚 Constitution \"{}\" created by {}", constitution.title, user.id);
    build_response(db, constitution).await
}

pub async fn update(
    db: &MongoDB,
    id: &str,
    user: &AuthUser,
    request: &UpdateConstitutionRequest,
) -> Result<ConstitutionResponse, AppError> {
    request.validate()?;
    let id = parse_object_id(id)?;
    let constitution = find_constitution(db, &id).await?;
    authorize(user, Action::ModifyConstitution(&constitution))?;

    let mut changes = Document::new();
    if let Some(title) = &request.title {
        changes.insert("title", title.trim());
    }
    if let Some(description) = &request.description {
        changes.insert("description", description.as_str());
    }
    if let Some(category) = request.category {
        changes.insert("category", category.as_str());
    }
    if let Some(is_public) = request.is_public {
        changes.insert("isPublic", is_public);
    }

    if changes.is_empty() {
        return build_response(db, constitution).await;
    }

    let updated = db
        .constitutions()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": changes })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Constitution not found"))?;
    build_response(db, updated).await
}

/// Removes the record and, when it still exists, the stored file.
pub async fn delete(db: &MongoDB, store: &dyn FileStore, id: &str, user: &AuthUser) -> Result<(), AppError> {
    let id = parse_object_id(id)?;
    let constitution = find_constitution(db, &id).await?;
    authorize(user, Action::ModifyConstitution(&constitution))?;

    db.constitutions().delete_one(doc! { "_id": id }).await?;

    let still_referenced = db
        .constitutions()
        .count_documents(doc! { "fileUrl": &constitution.file_url })
        .await?;
    if still_referenced > 0 {
        log::warn!("⚠️  Constitution file kept, still referenced: {}", constitution.file_url);
        return Ok(());
    }

    match store.delete(&constitution.file_url).await {
        Ok(true) => {}
        Ok(false) => log::warn!("⚠️  Constitution file already missing: {}", constitution.file_url),
        Err(e) => log::warn!("⚠️  Constitution file not removed ({}): {}", constitution.file_url, e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstitutionCategory, Role};
    use crate::storage::LocalFileStore;

    #[test]
    fn list_filter_always_limits_to_visible_entries() {
        let user = ObjectId::new();
        let query = ConstitutionQuery { category: None, is_public: None };
        let filter = list_filter(user, &query);
        assert!(filter.contains_key("$or"));
        assert!(!filter.contains_key("category"));

        let query = ConstitutionQuery {
            category: Some(ConstitutionCategory::Family),
            is_public: Some(false),
        };
        let filter = list_filter(user, &query);
        assert_eq!(filter.get_str("category").unwrap(), "Family");
        assert!(!filter.get_bool("isPublic").unwrap());
        assert!(filter.contains_key("$or"));
    }

    fn lawyer() -> AuthUser {
        AuthUser {
            id: ObjectId::new(),
            name: "Counsel".into(),
            email: "counsel@example.com".into(),
            role: Role::Lawyer,
        }
    }

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile {
            filename: name.into(),
            content_type: "application/pdf".into(),
            bytes: b"%PDF-1.7".to_vec(),
        }
    }

    #[tokio::test]
    async fn upload_file_is_lawyer_only_and_pdf_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).await.unwrap();

        let owner = lawyer();
        let uploaded = upload_file(&store, &owner, pdf("charter.pdf")).await.unwrap();
        assert!(uploaded.file_url.starts_with("constitutions/const-"));
        assert!(StorageArea::Constitutions.is_owned_key(&uploaded.file_url, &owner.id.to_hex()));
        assert_eq!(uploaded.file_name, "charter.pdf");
        assert_eq!(uploaded.file_size, 8);

        let client = AuthUser { role: Role::Client, ..lawyer() };
        assert!(matches!(
            upload_file(&store, &client, pdf("charter.pdf")).await,
            Err(AppError::Forbidden(_))
        ));

        let mut image = pdf("photo.png");
        image.content_type = "image/png".into();
        assert!(matches!(upload_file(&store, &lawyer(), image).await, Err(AppError::Validation(_))));
    }

    fn create_request(file_url: &str) -> CreateConstitutionRequest {
        CreateConstitutionRequest {
            title: "Labour Code".into(),
            description: None,
            file_url: file_url.into(),
            file_name: "labour.pdf".into(),
            file_size: 1024,
            category: ConstitutionCategory::General,
            is_public: Some(false),
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn create_only_attaches_the_callers_unused_upload() {
        let db = crate::database::test_database().await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).await.unwrap();

        let owner = lawyer();
        let uploaded = upload_file(&store, &owner, pdf("charter.pdf")).await.unwrap();
        let created = create(&db, &owner, &create_request(&uploaded.file_url)).await.unwrap();
        assert_eq!(created.file_url, uploaded.file_url);

        // Another user copying the public file reference is refused.
        let other = lawyer();
        assert!(matches!(
            create(&db, &other, &create_request(&uploaded.file_url)).await,
            Err(AppError::Validation(_))
        ));
        // So is a case document, even the caller's own.
        let document = store
            .put(StorageArea::Documents, &owner.id.to_hex(), "brief.pdf", b"%PDF")
            .await
            .unwrap();
        assert!(matches!(
            create(&db, &owner, &create_request(&document.key)).await,
            Err(AppError::Validation(_))
        ));
        // The owner cannot attach the same file twice.
        assert!(matches!(
            create(&db, &owner, &create_request(&uploaded.file_url)).await,
            Err(AppError::Conflict(_))
        ));

        delete(&db, &store, &created.id, &owner).await.unwrap();
        assert!(store.get(&uploaded.file_url).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn delete_keeps_a_file_another_record_points_at() {
        let db = crate::database::test_database().await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).await.unwrap();

        let owner = lawyer();
        let uploaded = upload_file(&store, &owner, pdf("charter.pdf")).await.unwrap();
        let created = create(&db, &owner, &create_request(&uploaded.file_url)).await.unwrap();

        // Two records on one file, as concurrent creates could leave behind.
        let mut shared = db
            .constitutions()
            .find_one(doc! { "_id": parse_object_id(&created.id).unwrap() })
            .await
            .unwrap()
            .unwrap();
        shared.id = None;
        shared.uploaded_by = ObjectId::new();
        db.constitutions().insert_one(&shared).await.unwrap();

        delete(&db, &store, &created.id, &owner).await.unwrap();
        assert!(store.get(&uploaded.file_url).await.unwrap().is_some());
        db.constitutions().delete_many(doc! { "fileUrl": &uploaded.file_url }).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn increment_adds_exactly_one_per_fetch() {
        let db = crate::database::test_database().await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).await.unwrap();
        let owner = lawyer();
        let uploaded = upload_file(&store, &owner, pdf("labour.pdf")).await.unwrap();
        let created = create(&db, &owner, &create_request(&uploaded.file_url)).await.unwrap();
        assert_eq!(created.download_count, 0);

        assert_eq!(get(&db, &created.id, true, &owner).await.unwrap().download_count, 1);
        assert_eq!(get(&db, &created.id, true, &owner).await.unwrap().download_count, 2);
        assert_eq!(get(&db, &created.id, false, &owner).await.unwrap().download_count, 2);

        let reader = AuthUser { id: ObjectId::new(), role: Role::Client, ..owner.clone() };
        assert!(matches!(get(&db, &created.id, true, &reader).await, Err(AppError::NotFound(_))));
    }
}
