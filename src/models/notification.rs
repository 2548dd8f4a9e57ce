use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Appointment,
    Document,
    Case,
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
pub enum EntityType {
    Case,
    Appointment,
    Document,
    Constitution,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntity {
    pub entity_type: EntityType,
    pub entity_id: ObjectId,
}

impl RelatedEntity {
    pub fn new(entity_type: EntityType, entity_id: ObjectId) -> Self {
        RelatedEntity { entity_type, entity_id }
    }
}

/// In-app message stored in the `notifications` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity: Option<RelatedEntity>,
    #[serde(default)]
    pub read: bool,
    pub created_at: BsonDateTime,
}

/// Notification waiting in the outbound queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub recipient: ObjectId,
    pub related_entity: Option<RelatedEntity>,
}

impl NewNotification {
    pub fn into_record(self) -> Notification {
        Notification {
            id: None,
            title: self.title,
            message: self.message,
            notification_type: self.notification_type,
            recipient: self.recipient,
            related_entity: self.related_entity,
            read: false,
            created_at: BsonDateTime::now(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntityResponse {
    pub entity_type: EntityType,
    pub entity_id: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: String,
    pub related_entity: Option<RelatedEntityResponse>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        NotificationResponse {
            id: notification.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: notification.title,
            message: notification.message,
            notification_type: notification.notification_type,
            recipient: notification.recipient.to_hex(),
            related_entity: notification.related_entity.map(|related| RelatedEntityResponse {
                entity_type: related.entity_type,
                entity_id: related.entity_id.to_hex(),
            }),
            read: notification.read,
            created_at: crate::utils::time::to_chrono(notification.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_type_field_name() {
        let record = NewNotification {
            title: "Hello".into(),
            message: "World".into(),
            notification_type: NotificationType::System,
            recipient: ObjectId::new(),
            related_entity: Some(RelatedEntity::new(EntityType::Case, ObjectId::new())),
        }
        .into_record();
        assert!(!record.read);

        let json = serde_json::to_value(NotificationResponse::from(record)).unwrap();
        assert_eq!(json["type"], "system");
        assert_eq!(json["relatedEntity"]["entityType"], "Case");
        assert_eq!(json["read"], false);
    }
}
