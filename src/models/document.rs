use crate::utils::time::to_chrono;
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Uploaded file metadata tied to a case (`documents` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Name the file was uploaded with
    pub filename: String,
    /// Location inside the file store
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub case_id: ObjectId,
    pub uploaded_by: ObjectId,
    pub uploaded_at: BsonDateTime,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub filename: String,
    pub size: i64,
    pub mime_type: String,
    pub case_id: String,
    pub uploaded_by: String,
    pub uploaded_by_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentResponse {
    pub fn new(document: &Document, uploaded_by_name: Option<String>) -> Self {
        DocumentResponse {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            filename: document.filename.clone(),
            size: document.size,
            mime_type: document.mime_type.clone(),
            case_id: document.case_id.to_hex(),
            uploaded_by: document.uploaded_by.to_hex(),
            uploaded_by_name,
            uploaded_at: to_chrono(document.uploaded_at),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        DocumentSummary {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            filename: document.filename.clone(),
            mime_type: document.mime_type.clone(),
            size: document.size,
            uploaded_at: to_chrono(document.uploaded_at),
        }
    }
}
