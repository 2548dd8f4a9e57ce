// ==================== OUTBOUND DISPATCHER ====================
// Drains the notifier queue in the background: in-app notifications are
// stored, emails are handed to the configured mailer. Failures are logged
// and the event is dropped.

use crate::database::MongoDB;
use crate::models::NewNotification;
use crate::services::mailer::Mailer;
use crate::services::notification_service::{self, OutboundEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Where in-app notifications end up.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn store(&self, notification: NewNotification) -> Result<(), String>;
}

#[async_trait]
impl NotificationSink for MongoDB {
    async fn store(&self, notification: NewNotification) -> Result<(), String> {
        notification_service::create(self, notification)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Spawns the dispatcher. The task ends once every `Notifier` clone is
/// dropped and the queue is empty.
pub fn start_notification_dispatcher(
    mut receiver: UnboundedReceiver<OutboundEvent>,
    sink: Arc<dyn NotificationSink>,
    mailer: Arc<dyn Mailer>,
) -> JoinHandle<()> {
    log::info!("📨 Starting outbound notification dispatcher");

    tokio::spawn(async move {
        let mut delivered = 0u64;
        while let Some(event) = receiver.recv().await {
            if dispatch(event, sink.as_ref(), mailer.as_ref()).await {
                delivered += 1;
            }
        }
        log::info!("📨 Notification dispatcher stopped ({} events delivered)", delivered);
    })
}

async fn dispatch(event: OutboundEvent, sink: &dyn NotificationSink, mailer: &dyn Mailer) -> bool {
    match event {
        OutboundEvent::InApp(notification) => {
            let recipient = notification.recipient;
            match sink.store(notification).await {
                Ok(()) => {
                    log::debug!("🔔 Notification stored for {}", recipient);
                    true
                }
                Err(e) => {
                    log::error!("❌ Failed to store notification for {}: {}", recipient, e);
                    false
                }
            }
        }
        OutboundEvent::Email(message) => match mailer.send(&message).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("❌ Failed to send email to {}: {}", message.to, e);
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::EmailMessage;
    use crate::services::notification_service::{welcome, Notifier};
    use mongodb::bson::oid::ObjectId;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        stored: Mutex<Vec<NewNotification>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn store(&self, notification: NewNotification) -> Result<(), String> {
            self.stored.lock().await.push(notification);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), String> {
            if self.fail {
                return Err("smtp down".to_string());
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn email(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Subject".into(),
            html: "<p>Body</p>".into(),
        }
    }

    #[tokio::test]
    async fn drains_queue_after_notifier_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let mailer = Arc::new(RecordingMailer::default());
        let (notifier, receiver) = Notifier::channel();

        let handle = start_notification_dispatcher(receiver, sink.clone(), mailer.clone());

        let recipient = ObjectId::new();
        notifier.notify(welcome(recipient));
        notifier.email(email("client@example.com"));
        notifier.notify(welcome(recipient));
        drop(notifier);

        handle.await.unwrap();

        assert_eq!(sink.stored.lock().await.len(), 2);
        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "client@example.com");
    }

    #[tokio::test]
    async fn mail_failure_does_not_stop_dispatch() {
        let sink = Arc::new(RecordingSink::default());
        let mailer = Arc::new(RecordingMailer { fail: true, ..Default::default() });
        let (notifier, receiver) = Notifier::channel();
        let handle = start_notification_dispatcher(receiver, sink.clone(), mailer);

        notifier.email(email("a@example.com"));
        notifier.notify(welcome(ObjectId::new()));
        drop(notifier);
        handle.await.unwrap();

        assert_eq!(sink.stored.lock().await.len(), 1);
    }
}
