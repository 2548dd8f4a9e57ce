use super::user::UserSummary;
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
pub enum ConstitutionCategory {
    Criminal,
    Civil,
    Family,
    Corporate,
    General,
}

impl ConstitutionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstitutionCategory::Criminal => "Criminal",
            ConstitutionCategory::Civil => "Civil",
            ConstitutionCategory::Family => "Family",
            ConstitutionCategory::Corporate => "Corporate",
            ConstitutionCategory::General => "General",
        }
    }
}

fn default_is_public() -> bool {
    true
}

/// Reference PDF shared independently of cases (`constitutions` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constitution {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub category: ConstitutionCategory,
    pub uploaded_by: ObjectId,
    pub uploaded_at: BsonDateTime,
    #[serde(default)]
    pub download_count: i64,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConstitutionRequest {
    #[validate(length(min = 1, max = 200, message = "Please provide a title"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Please provide the uploaded file reference"))]
    pub file_url: String,
    #[validate(length(min = 1, max = 255, message = "Please provide a file name"))]
    pub file_name: String,
    #[validate(range(min = 0, message = "File size cannot be negative"))]
    pub file_size: i64,
    pub category: ConstitutionCategory,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConstitutionRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub category: Option<ConstitutionCategory>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ConstitutionQuery {
    pub category: Option<ConstitutionCategory>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetConstitutionQuery {
    /// Count this fetch as a download
    pub increment: Option<bool>,
}

// ==================== RESPONSES ====================

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConstitutionResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub category: ConstitutionCategory,
    pub uploaded_by: Option<UserSummary>,
    pub uploaded_at: DateTime<Utc>,
    pub download_count: i64,
    pub is_public: bool,
}

impl ConstitutionResponse {
    pub fn new(constitution: Constitution, uploaded_by: Option<UserSummary>) -> Self {
        ConstitutionResponse {
            id: constitution.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: constitution.title,
            description: constitution.description,
            file_url: constitution.file_url,
            file_name: constitution.file_name,
            file_size: constitution.file_size,
            category: constitution.category,
            uploaded_by,
            uploaded_at: crate::utils::time::to_chrono(constitution.uploaded_at),
            download_count: constitution.download_count,
            is_public: constitution.is_public,
        }
    }
}

/// Reference returned by the file upload endpoint, fed back into `create`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileResponse {
    pub success: bool,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
}
