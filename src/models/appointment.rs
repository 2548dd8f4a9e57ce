use super::case::CaseReference;
use super::user::UserSummary;
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Rescheduled => "Rescheduled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(AppointmentStatus::Pending),
            "Scheduled" => Some(AppointmentStatus::Scheduled),
            "Completed" => Some(AppointmentStatus::Completed),
            "Cancelled" => Some(AppointmentStatus::Cancelled),
            "Rescheduled" => Some(AppointmentStatus::Rescheduled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_duration() -> i32 {
    60
}

fn default_location() -> String {
    "Office".to_string()
}

/// Meeting between a lawyer and a client (`appointments` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: BsonDateTime,
    pub time: String,
    /// minutes
    #[serde(default = "default_duration")]
    pub duration: i32,
    pub lawyer_id: ObjectId,
    pub client_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<ObjectId>,
    pub status: AppointmentStatus,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub reminder_sent: bool,
    pub created_at: BsonDateTime,
}

impl Appointment {
    pub fn is_party(&self, user_id: &ObjectId) -> bool {
        &self.client_id == user_id || &self.lawyer_id == user_id
    }
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 1, max = 200, message = "Please provide an appointment title"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub date: String,
    #[validate(length(min = 1, max = 20, message = "Please provide an appointment time"))]
    pub time: String,
    #[validate(range(min = 5, max = 1440, message = "Duration must be between 5 and 1440 minutes"))]
    pub duration: Option<i32>,
    pub client_id: Option<String>,
    pub case_id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location cannot be empty"))]
    pub location: Option<String>,
    #[validate(url(message = "Meeting link must be a valid URL"))]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub date: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Time cannot be empty"))]
    pub time: Option<String>,
    #[validate(range(min = 5, max = 1440, message = "Duration must be between 5 and 1440 minutes"))]
    pub duration: Option<i32>,
    #[validate(length(min = 1, max = 200, message = "Location cannot be empty"))]
    pub location: Option<String>,
    #[validate(url(message = "Meeting link must be a valid URL"))]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// A status name or `all`
    pub status: Option<String>,
    pub upcoming: Option<bool>,
}

// ==================== RESPONSES ====================

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub time: String,
    pub duration: i32,
    pub lawyer_id: String,
    pub client_id: String,
    pub lawyer: Option<UserSummary>,
    pub client: Option<UserSummary>,
    pub case: Option<CaseReference>,
    pub status: AppointmentStatus,
    pub location: String,
    pub meeting_link: Option<String>,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// One page of the caller's appointments.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPage {
    pub count: usize,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub appointments: Vec<AppointmentResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub status: AppointmentStatus,
}

impl From<&Appointment> for AppointmentSummary {
    fn from(appointment: &Appointment) -> Self {
        AppointmentSummary {
            id: appointment.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: appointment.title.clone(),
            date: crate::utils::time::to_chrono(appointment.date),
            time: appointment.time.clone(),
            status: appointment.status,
        }
    }
}
