// ==================== OUTBOUND EMAIL ====================
// Delivery backends for emails queued by the notifier. Mailgun is used
// when configured, otherwise messages are only logged.

use crate::config::{MailSettings, MailgunSettings};
use crate::models::Appointment;
use crate::utils::time::to_chrono;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), String>;
}

/// Writes emails to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), String> {
        log::info!("📧 [log mailer] to={} subject=\"{}\"", message.to, message.subject);
        Ok(())
    }
}

pub struct MailgunMailer {
    client: reqwest::Client,
    from: String,
    settings: MailgunSettings,
}

impl MailgunMailer {
    pub fn new(from: String, settings: MailgunSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            from,
            settings,
        }
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), String> {
        let url = format!(
            "https://api.mailgun.net/v3/{}/messages",
            urlencoding::encode(&self.settings.domain)
        );

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.settings.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", message.to.as_str()),
                ("subject", message.subject.as_str()),
                ("html", message.html.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("Mailgun request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Mailgun API error ({}): {}", status, body));
        }

        log::info!("📧 Email sent to {} ({})", message.to, message.subject);
        Ok(())
    }
}

pub fn from_settings(settings: &MailSettings) -> Arc<dyn Mailer> {
    match &settings.mailgun {
        Some(mailgun) => {
            log::info!("📧 Mail delivery: Mailgun ({})", mailgun.domain);
            Arc::new(MailgunMailer::new(settings.from.clone(), mailgun.clone()))
        }
        None => {
            log::info!("📧 Mail delivery: log only (MAILGUN_DOMAIN/MAILGUN_API_KEY not set)");
            Arc::new(LogMailer)
        }
    }
}

// ==================== TEMPLATES ====================

/// Escapes text for HTML element content and quoted attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Only plain http(s) links become anchors; anything else is shown as text.
fn meeting_link_html(link: &str) -> String {
    let lower = link.trim().to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        format!("<a href=\"{}\">Join Meeting</a>", escape_html(link.trim()))
    } else {
        escape_html(link)
    }
}

fn appointment_details(appointment: &Appointment) -> String {
    let mut html = format!(
        "<p><strong>Title:</strong> {}</p>\
         <p><strong>Date:</strong> {}</p>\
         <p><strong>Time:</strong> {}</p>\
         <p><strong>Description:</strong> {}</p>\
         <p><strong>Location:</strong> {}</p>",
        escape_html(&appointment.title),
        to_chrono(appointment.date).format("%Y-%m-%d"),
        escape_html(&appointment.time),
        escape_html(appointment.description.as_deref().unwrap_or("N/A")),
        escape_html(&appointment.location),
    );
    if let Some(link) = &appointment.meeting_link {
        html.push_str(&format!(
            "<p><strong>Meeting Link:</strong> {}</p>",
            meeting_link_html(link)
        ));
    }
    html
}

pub fn appointment_confirmation(to: &str, appointment: &Appointment) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Appointment Confirmed: {}", appointment.title),
        html: format!(
            "<h2>Appointment Confirmed</h2><p>Your appointment has been scheduled:</p>{}\
             <br><p>If you need to reschedule, please contact us as soon as possible.</p>",
            appointment_details(appointment)
        ),
    }
}

pub fn appointment_reminder(to: &str, appointment: &Appointment) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Reminder: Appointment for {}", appointment.title),
        html: format!(
            "<h2>Appointment Reminder</h2><p>You have an upcoming appointment:</p>{}\
             <br><p>Please make sure to be on time.</p>\
             <p>If you need to reschedule, please contact us as soon as possible.</p>",
            appointment_details(appointment)
        ),
    }
}

pub fn appointment_request(to: &str, appointment: &Appointment, client_name: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("New Appointment Request: {}", appointment.title),
        html: format!(
            "<h2>New Appointment Request</h2><p>A client has requested a new appointment:</p>\
             <p><strong>Client:</strong> {}</p>{}\
             <br><p>Please log in to your dashboard to approve or modify this appointment.</p>",
            escape_html(client_name),
            appointment_details(appointment)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

    fn appointment(meeting_link: Option<&str>) -> Appointment {
        Appointment {
            id: Some(ObjectId::new()),
            title: "Contract review".into(),
            description: None,
            date: BsonDateTime::from_millis(1_767_225_600_000), // 2026-01-01
            time: "14:30".into(),
            duration: 60,
            lawyer_id: ObjectId::new(),
            client_id: ObjectId::new(),
            case_id: None,
            status: AppointmentStatus::Scheduled,
            location: "Office".into(),
            meeting_link: meeting_link.map(str::to_string),
            reminder_sent: false,
            created_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn reminder_includes_schedule_details() {
        let message = appointment_reminder("client@example.com", &appointment(None));
        assert_eq!(message.to, "client@example.com");
        assert_eq!(message.subject, "Reminder: Appointment for Contract review");
        assert!(message.html.contains("2026-01-01"));
        assert!(message.html.contains("14:30"));
        assert!(message.html.contains("N/A"));
        assert!(!message.html.contains("Meeting Link"));
    }

    #[test]
    fn meeting_link_rendered_when_present() {
        let message = appointment_confirmation("c@example.com", &appointment(Some("https://meet.example.com/x")));
        assert!(message.html.contains("https://meet.example.com/x"));
    }

    #[test]
    fn request_names_the_client() {
        let message = appointment_request("lawyer@example.com", &appointment(None), "Grace");
        assert!(message.subject.starts_with("New Appointment Request"));
        assert!(message.html.contains("Grace"));
    }

    #[test]
    fn user_text_is_escaped_in_html() {
        let mut appt = appointment(Some("https://x.example/\"><img src=y>"));
        appt.title = "<a href=\"https://evil.example\">Click to verify</a>".into();
        appt.description = Some("<script>x()</script>".into());
        appt.location = "Room <1> & 'B'".into();

        let message = appointment_request("lawyer@example.com", &appt, "<b>Eve</b>");
        assert!(!message.html.contains("<script>"));
        assert!(!message.html.contains("<b>Eve</b>"));
        assert!(!message.html.contains("<img"));
        assert!(!message.html.contains("href=\"https://evil.example"));
        assert!(message.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(message.html.contains("Room &lt;1&gt; &amp; &#x27;B&#x27;"));
        assert!(message.html.contains("<a href=\"https://x.example/&quot;&gt;&lt;img src=y&gt;\">Join Meeting</a>"));
    }

    #[test]
    fn non_http_meeting_link_is_not_a_link() {
        let message = appointment_confirmation("c@example.com", &appointment(Some("javascript:alert(1)")));
        assert!(!message.html.contains("href"));
        assert!(message.html.contains("javascript:alert(1)"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let message = appointment_reminder("c@example.com", &appointment(None));
        assert!(LogMailer.send(&message).await.is_ok());
    }
}
