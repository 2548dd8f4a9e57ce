use crate::{
    database::MongoDB,
    models::{AuthUser, Case, Document, DocumentResponse},
    services::{
        access_policy::{authorize, Action},
        case_service,
        notification_service::{self, Notifier},
        populate,
    },
    storage::{FileStore, StorageArea, UploadedFile},
    utils::{parse_object_id, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};

async fn find_document(db: &MongoDB, id: &str) -> Result<Document, AppError> {
    let id = parse_object_id(id)?;
    db.documents()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))
}

/// Checked before the upload body is read.
pub async fn case_for_upload(db: &MongoDB, case_id: &str, user: &AuthUser) -> Result<Case, AppError> {
    let case = case_service::find_case(db, &parse_object_id(case_id)?).await?;
    authorize(user, Action::AccessCaseDocuments(&case))?;
    Ok(case)
}

pub async fn upload(
    db: &MongoDB,
    store: &dyn FileStore,
    notifier: &Notifier,
    case: &Case,
    user: &AuthUser,
    file: UploadedFile,
) -> Result<DocumentResponse, AppError> {
    authorize(user, Action::AccessCaseDocuments(case))?;

    let area = StorageArea::Documents;
    area.check_mime_type(&file.content_type)?;
    if file.bytes.len() > area.max_bytes() {
        return Err(AppError::validation("File too large"));
    }

    let stored = store.put(area, &user.id.to_hex(), &file.filename, &file.bytes).await?;

    let mut document = Document {
        id: None,
        filename: file.filename,
        path: stored.key.clone(),
        size: stored.size,
        mime_type: file.content_type,
        case_id: case.id.ok_or_else(|| AppError::internal("Stored case has no id"))?,
        uploaded_by: user.id,
        uploaded_at: BsonDateTime::now(),
    };

    let inserted = match db.documents().insert_one(&document).await {
        Ok(result) => result,
        Err(e) => {
            // Record failed; don't leave an orphaned file behind
            if let Err(cleanup) = store.delete(&stored.key).await {
                log::error!("❌ Failed to remove orphaned upload {}: {}", stored.key, cleanup);
            }
            return Err(e.into());
        }
    };
    let document_id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::internal("Inserted document has no ObjectId"))?;
    document.id = Some(document_id);

    db.cases()
        .update_one(
            doc! { "_id": document.case_id },
            doc! { "$addToSet": { "documents": document_id }, "$set": { "updatedAt": BsonDateTime::now() } },
        )
        .await?;

    if let Some(recipient) = case.counterpart(&user.id) {
        notifier.notify(notification_service::document_uploaded(&document, case, recipient));
    }

    log::info!("📄 Document {} uploaded to case {} by {}", document_id, document.case_id, user.id);
    Ok(DocumentResponse::new(&document, Some(user.name.clone())))
}

/// Documents of a case, newest first.
pub async fn list(db: &MongoDB, case_id: &str, user: &AuthUser) -> Result<Vec<DocumentResponse>, AppError> {
    let case = case_service::find_case(db, &parse_object_id(case_id)?).await?;
    authorize(user, Action::AccessCaseDocuments(&case))?;

    let documents: Vec<Document> = db
        .documents()
        .find(doc! { "caseId": case.id })
        .sort(doc! { "uploadedAt": -1 })
        .await?
        .try_collect()
        .await?;

    let uploaders = populate::user_summaries(db, documents.iter().map(|d| d.uploaded_by).collect::<Vec<_>>()).await?;
    Ok(documents
        .iter()
        .map(|document| {
            DocumentResponse::new(
                document,
                uploaders.get(&document.uploaded_by).map(|u| u.name.clone()),
            )
        })
        .collect())
}

/// Metadata plus file bytes.
pub async fn download(
    db: &MongoDB,
    store: &dyn FileStore,
    id: &str,
    user: &AuthUser,
) -> Result<(Document, Vec<u8>), AppError> {
    let document = find_document(db, id).await?;
    let case = case_service::find_case(db, &document.case_id).await?;
    authorize(user, Action::DownloadDocument(&document, &case))?;

    let bytes = store
        .get(&document.path)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;
    Ok((document, bytes))
}

pub async fn delete(db: &MongoDB, store: &dyn FileStore, id: &str, user: &AuthUser) -> Result<(), AppError> {
    let document = find_document(db, id).await?;
    let case = case_service::find_case(db, &document.case_id).await?;
    authorize(user, Action::DeleteDocument(&document, &case))?;

    db.documents().delete_one(doc! { "_id": document.id }).await?;
    db.cases()
        .update_one(doc! { "_id": document.case_id }, doc! { "$pull": { "documents": document.id } })
        .await?;

    match store.delete(&document.path).await {
        Ok(true) => {}
        Ok(false) => log::warn!("⚠️  File already missing for document {}: {}", id, document.path),
        Err(e) => log::error!("❌ Failed to remove file {}: {}", document.path, e),
    }

    log::info!("🗑️  Document {} deleted by {}", id, user.id);
    Ok(())
}
