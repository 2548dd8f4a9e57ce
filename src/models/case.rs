use super::user::UserSummary;
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Pending,
    Closed,
}

impl Default for CaseStatus {
    fn default() -> Self {
        CaseStatus::Open
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CaseCategory {
    Criminal,
    Civil,
    Family,
    Employment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseNote {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub content: String,
    pub created_by: ObjectId,
    pub created_at: BsonDateTime,
    #[serde(default)]
    pub is_private: bool,
}

/// Legal matter linking one client and one lawyer (`cases` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CaseCategory>,
    #[serde(default)]
    pub status: CaseStatus,
    pub client_id: ObjectId,
    pub lawyer_id: ObjectId,
    #[serde(default)]
    pub notes: Vec<CaseNote>,
    #[serde(default)]
    pub documents: Vec<ObjectId>,
    #[serde(default)]
    pub appointments: Vec<ObjectId>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Case {
    pub fn is_party(&self, user_id: &ObjectId) -> bool {
        &self.client_id == user_id || &self.lawyer_id == user_id
    }

    /// The other owning party, if `user_id` is one of them.
    pub fn counterpart(&self, user_id: &ObjectId) -> Option<ObjectId> {
        if &self.client_id == user_id {
            Some(self.lawyer_id)
        } else if &self.lawyer_id == user_id {
            Some(self.client_id)
        } else {
            None
        }
    }
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    #[validate(length(min = 1, max = 200, message = "Please provide a case title"))]
    pub title: String,
    #[validate(length(min = 1, message = "Please provide a case description"))]
    pub description: String,
    pub category: Option<CaseCategory>,
    pub client_id: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateCaseRequest {
    #[validate(length(min = 1, max = 200, message = "Case title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Case description cannot be empty"))]
    pub description: Option<String>,
    pub category: Option<CaseCategory>,
    pub status: Option<CaseStatus>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteRequest {
    #[validate(length(min = 1, max = 1000, message = "Note must be between 1 and 1000 characters"))]
    pub content: String,
    #[serde(default)]
    pub is_private: bool,
}

// ==================== RESPONSES ====================

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: String,
    pub content: String,
    pub created_by: String,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseReference {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<CaseCategory>,
    pub status: CaseStatus,
    pub client_id: String,
    pub lawyer_id: String,
    pub client: Option<UserSummary>,
    pub lawyer: Option<UserSummary>,
    pub notes: Vec<NoteResponse>,
    pub documents: Vec<super::document::DocumentSummary>,
    pub appointments: Vec<super::appointment::AppointmentSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_kebab_case() {
        assert_eq!(serde_json::to_string(&CaseStatus::InProgress).unwrap(), "\"in-progress\"");
        let status: CaseStatus = serde_json::from_str("\"closed\"").unwrap();
        assert_eq!(status, CaseStatus::Closed);
    }

    #[test]
    fn counterpart_is_the_other_party() {
        let client = ObjectId::new();
        let lawyer = ObjectId::new();
        let case = Case {
            id: Some(ObjectId::new()),
            title: "Lease dispute".into(),
            description: "Tenant claim".into(),
            category: Some(CaseCategory::Civil),
            status: CaseStatus::Open,
            client_id: client,
            lawyer_id: lawyer,
            notes: vec![],
            documents: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        };

        assert_eq!(case.counterpart(&client), Some(lawyer));
        assert_eq!(case.counterpart(&lawyer), Some(client));
        assert_eq!(case.counterpart(&ObjectId::new()), None);
        assert!(case.is_party(&client));
        assert!(!case.is_party(&ObjectId::new()));
    }
}
