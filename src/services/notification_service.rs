use crate::database::MongoDB;
use crate::models::{
    Appointment, AuthUser, Case, Document, EntityType, NewNotification, Notification,
    NotificationType, RelatedEntity,
};
use crate::services::access_policy::{authorize, Action};
use crate::services::mailer::EmailMessage;
use crate::utils::time::to_chrono;
use crate::utils::{parse_object_id, AppError};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ==================== OUTBOUND QUEUE ====================

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    InApp(NewNotification),
    Email(EmailMessage),
}

/// Publishing side of the outbound queue. Cheap to clone; every handler gets one.
#[derive(Clone)]
pub struct Notifier {
    sender: UnboundedSender<OutboundEvent>,
}

impl Notifier {
    pub fn channel() -> (Self, UnboundedReceiver<OutboundEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn publish(&self, event: OutboundEvent) {
        if let Err(e) = self.sender.send(event) {
            log::warn!("⚠️  Outbound queue closed, dropping event: {:?}", e.0);
        }
    }

    pub fn notify(&self, notification: NewNotification) {
        self.publish(OutboundEvent::InApp(notification));
    }

    pub fn email(&self, message: EmailMessage) {
        self.publish(OutboundEvent::Email(message));
    }
}

// ==================== MESSAGE BUILDERS ====================

fn appointment_entity(appointment: &Appointment) -> Option<RelatedEntity> {
    appointment
        .id
        .map(|id| RelatedEntity::new(EntityType::Appointment, id))
}

fn case_entity(case: &Case) -> Option<RelatedEntity> {
    case.id.map(|id| RelatedEntity::new(EntityType::Case, id))
}

fn schedule_text(appointment: &Appointment) -> String {
    format!(
        "{} at {}",
        to_chrono(appointment.date).format("%Y-%m-%d"),
        appointment.time
    )
}

pub fn welcome(recipient: ObjectId) -> NewNotification {
    NewNotification {
        title: "Welcome to Legal Ease Lite".to_string(),
        message: "Thank you for registering with Legal Ease Lite. You can now book appointments and manage your cases.".to_string(),
        notification_type: NotificationType::System,
        recipient,
        related_entity: None,
    }
}

pub fn case_created(case: &Case) -> NewNotification {
    NewNotification {
        title: "New Case Created".to_string(),
        message: format!("A new case \"{}\" has been created for you.", case.title),
        notification_type: NotificationType::Case,
        recipient: case.client_id,
        related_entity: case_entity(case),
    }
}

pub fn note_added(case: &Case, recipient: ObjectId) -> NewNotification {
    NewNotification {
        title: "New Note Added".to_string(),
        message: format!("A new note has been added to case \"{}\".", case.title),
        notification_type: NotificationType::Case,
        recipient,
        related_entity: case_entity(case),
    }
}

pub fn document_uploaded(document: &Document, case: &Case, recipient: ObjectId) -> NewNotification {
    NewNotification {
        title: "New Document Uploaded".to_string(),
        message: format!(
            "A new document \"{}\" has been uploaded to your case \"{}\"",
            document.filename, case.title
        ),
        notification_type: NotificationType::Document,
        recipient,
        related_entity: case_entity(case),
    }
}

pub fn appointment_scheduled(appointment: &Appointment) -> NewNotification {
    NewNotification {
        title: "New Appointment Scheduled".to_string(),
        message: format!(
            "Your appointment \"{}\" is scheduled for {}",
            appointment.title,
            schedule_text(appointment)
        ),
        notification_type: NotificationType::Appointment,
        recipient: appointment.client_id,
        related_entity: appointment_entity(appointment),
    }
}

pub fn appointment_requested(appointment: &Appointment, client_name: &str) -> NewNotification {
    NewNotification {
        title: "New Appointment Request".to_string(),
        message: format!(
            "Client {} requested appointment \"{}\" on {}",
            client_name,
            appointment.title,
            schedule_text(appointment)
        ),
        notification_type: NotificationType::Appointment,
        recipient: appointment.lawyer_id,
        related_entity: appointment_entity(appointment),
    }
}

pub fn appointment_status_changed(appointment: &Appointment) -> NewNotification {
    NewNotification {
        title: "Appointment Status Updated".to_string(),
        message: format!(
            "Your appointment \"{}\" is now {}",
            appointment.title, appointment.status
        ),
        notification_type: NotificationType::Appointment,
        recipient: appointment.client_id,
        related_entity: appointment_entity(appointment),
    }
}

// ==================== PERSISTENCE ====================

/// Stores a notification. Only the outbound dispatcher calls this.
pub async fn create(db: &MongoDB, notification: NewNotification) -> Result<Notification, AppError> {
    let mut record = notification.into_record();
    let result = db.notifications().insert_one(&record).await?;
    record.id = result.inserted_id.as_object_id();
    Ok(record)
}

/// Newest first, with the unread count.
pub async fn list(db: &MongoDB, user: &AuthUser) -> Result<(Vec<Notification>, u64), AppError> {
    let notifications: Vec<Notification> = db
        .notifications()
        .find(doc! { "recipient": user.id })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    let unread = notifications.iter().filter(|n| !n.read).count() as u64;
    Ok((notifications, unread))
}

async fn find_owned(db: &MongoDB, id: &str, user: &AuthUser) -> Result<Notification, AppError> {
    let id = parse_object_id(id)?;
    let notification = db
        .notifications()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Notification not found"))?;

    authorize(user, Action::ManageNotification(&notification))?;
    Ok(notification)
}

pub async fn mark_read(db: &MongoDB, id: &str, user: &AuthUser) -> Result<Notification, AppError> {
    let mut notification = find_owned(db, id, user).await?;
    db.notifications()
        .update_one(doc! { "_id": notification.id }, doc! { "$set": { "read": true } })
        .await?;
    notification.read = true;
    Ok(notification)
}

/// Returns the number of notifications that changed.
pub async fn mark_all_read(db: &MongoDB, user: &AuthUser) -> Result<u64, AppError> {
    let result = db
        .notifications()
        .update_many(
            doc! { "recipient": user.id, "read": false },
            doc! { "$set": { "read": true } },
        )
        .await?;
    Ok(result.modified_count)
}

pub async fn delete(db: &MongoDB, id: &str, user: &AuthUser) -> Result<(), AppError> {
    let notification = find_owned(db, id, user).await?;
    db.notifications()
        .delete_one(doc! { "_id": notification.id })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, CaseStatus};
    use mongodb::bson::DateTime as BsonDateTime;

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Some(ObjectId::new()),
            title: "Initial consultation".into(),
            description: None,
            date: BsonDateTime::from_millis(1_767_225_600_000),
            time: "09:15".into(),
            duration: 30,
            lawyer_id: ObjectId::new(),
            client_id: ObjectId::new(),
            case_id: None,
            status,
            location: "Office".into(),
            meeting_link: None,
            reminder_sent: false,
            created_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn status_change_goes_to_client_and_names_status() {
        let appointment = appointment(AppointmentStatus::Scheduled);
        let notification = appointment_status_changed(&appointment);

        assert_eq!(notification.recipient, appointment.client_id);
        assert_eq!(notification.notification_type, NotificationType::Appointment);
        assert!(notification.message.contains("Scheduled"));
        assert_eq!(
            notification.related_entity,
            Some(RelatedEntity::new(EntityType::Appointment, appointment.id.unwrap()))
        );
    }

    #[test]
    fn request_goes_to_lawyer() {
        let appointment = appointment(AppointmentStatus::Pending);
        let notification = appointment_requested(&appointment, "Grace");
        assert_eq!(notification.recipient, appointment.lawyer_id);
        assert_eq!(
            notification.message,
            "Client Grace requested appointment \"Initial consultation\" on 2026-01-01 at 09:15"
        );
    }

    #[test]
    fn case_created_targets_client() {
        let case = Case {
            id: Some(ObjectId::new()),
            title: "Custody".into(),
            description: "Custody hearing".into(),
            category: None,
            status: CaseStatus::Open,
            client_id: ObjectId::new(),
            lawyer_id: ObjectId::new(),
            notes: vec![],
            documents: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        };
        let notification = case_created(&case);
        assert_eq!(notification.recipient, case.client_id);
        assert_eq!(notification.message, "A new case \"Custody\" has been created for you.");
    }

    #[tokio::test]
    async fn notifier_queues_events_in_order() {
        let (notifier, mut receiver) = Notifier::channel();
        let recipient = ObjectId::new();
        notifier.notify(welcome(recipient));
        notifier.email(EmailMessage {
            to: "a@example.com".into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
        });

        match receiver.recv().await {
            Some(OutboundEvent::InApp(n)) => assert_eq!(n.recipient, recipient),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(receiver.recv().await, Some(OutboundEvent::Email(_))));
    }

    #[test]
    fn publishing_after_close_does_not_panic() {
        let (notifier, receiver) = Notifier::channel();
        drop(receiver);
        notifier.notify(welcome(ObjectId::new()));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn mark_all_read_counts_only_unread() {
        let db = crate::database::test_database().await;
        let user = AuthUser {
            id: ObjectId::new(),
            name: "Reader".into(),
            email: "reader@example.com".into(),
            role: crate::models::Role::Client,
        };

        create(&db, welcome(user.id)).await.unwrap();
        create(&db, welcome(user.id)).await.unwrap();

        let (items, unread) = list(&db, &user).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(unread, 2);

        assert_eq!(mark_all_read(&db, &user).await.unwrap(), 2);
        assert_eq!(mark_all_read(&db, &user).await.unwrap(), 0);

        let id = items[0].id.unwrap().to_hex();
        let stranger = AuthUser { id: ObjectId::new(), ..user.clone() };
        assert!(delete(&db, &id, &stranger).await.is_err());
        delete(&db, &id, &user).await.unwrap();
    }
}
