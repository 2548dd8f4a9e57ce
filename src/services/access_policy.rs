//! Role and ownership rules shared by every handler group.
//!
//! Each decision is a pure function of the caller and the already-loaded
//! record, so handlers fetch first and then call [`authorize`].

use crate::models::{Appointment, AppointmentStatus, AuthUser, Case, Constitution, Document, Notification};
use crate::utils::AppError;

pub enum Action<'a> {
    CreateCase,
    ViewCase(&'a Case),
    AnnotateCase(&'a Case),
    EditCase(&'a Case),
    DeleteCase(&'a Case),
    ViewAppointment(&'a Appointment),
    EditAppointment(&'a Appointment),
    DeleteAppointment(&'a Appointment),
    ChangeAppointmentStatus(&'a Appointment),
    SendReminder(&'a Appointment),
    AccessCaseDocuments(&'a Case),
    /// The document and the case it belongs to
    DownloadDocument(&'a Document, &'a Case),
    DeleteDocument(&'a Document, &'a Case),
    UploadConstitutionFile,
    ModifyConstitution(&'a Constitution),
    ViewConstitution(&'a Constitution),
    ManageNotification(&'a Notification),
}

pub fn authorize(user: &AuthUser, action: Action<'_>) -> Result<(), AppError> {
    let allowed = |ok: bool, message: &str| {
        if ok {
            Ok(())
        } else {
            Err(AppError::forbidden(message))
        }
    };

    match action {
        Action::CreateCase => allowed(user.is_lawyer(), "Only lawyers can create cases"),
        Action::ViewCase(case) | Action::AnnotateCase(case) | Action::AccessCaseDocuments(case) => {
            allowed(case.is_party(&user.id), "Access denied")
        }
        Action::EditCase(case) | Action::DeleteCase(case) => {
            allowed(case.lawyer_id == user.id, "Access denied")
        }
        Action::ViewAppointment(appointment) | Action::DeleteAppointment(appointment) => {
            allowed(appointment.is_party(&user.id), "Not authorized")
        }
        Action::EditAppointment(appointment) => {
            allowed(appointment.is_party(&user.id), "Not authorized")?;
            allowed(
                !user.is_client() || appointment.status == AppointmentStatus::Pending,
                "Can only update pending appointments",
            )
        }
        Action::ChangeAppointmentStatus(appointment) | Action::SendReminder(appointment) => {
            allowed(appointment.lawyer_id == user.id, "Not authorized")
        }
        Action::DownloadDocument(document, case) => allowed(
            document.uploaded_by == user.id || case.is_party(&user.id),
            "Access denied",
        ),
        Action::DeleteDocument(document, case) => allowed(
            document.uploaded_by == user.id || case.lawyer_id == user.id,
            "Access denied",
        ),
        Action::UploadConstitutionFile => {
            allowed(user.is_lawyer(), "Only lawyers can upload constitution files")
        }
        Action::ModifyConstitution(constitution) => {
            allowed(constitution.uploaded_by == user.id, "Not authorized")
        }
        Action::ViewConstitution(constitution) => {
            // Private entries are hidden rather than refused
            if constitution.is_public || constitution.uploaded_by == user.id {
                Ok(())
            } else {
                Err(AppError::not_found("Constitution not found"))
            }
        }
        Action::ManageNotification(notification) => {
            allowed(notification.recipient == user.id, "Not authorized")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseStatus, ConstitutionCategory, NotificationType, Role};
    use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: ObjectId::new(),
            name: "Test".into(),
            email: "test@example.com".into(),
            role,
        }
    }

    fn case_for(client: &AuthUser, lawyer: &AuthUser) -> Case {
        Case {
            id: Some(ObjectId::new()),
            title: "Contract".into(),
            description: "Breach of contract".into(),
            category: None,
            status: CaseStatus::Open,
            client_id: client.id,
            lawyer_id: lawyer.id,
            notes: vec![],
            documents: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    fn appointment_for(client: &AuthUser, lawyer: &AuthUser, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Some(ObjectId::new()),
            title: "Consultation".into(),
            description: None,
            date: BsonDateTime::now(),
            time: "10:00".into(),
            duration: 60,
            lawyer_id: lawyer.id,
            client_id: client.id,
            case_id: None,
            status,
            location: "Office".into(),
            meeting_link: None,
            reminder_sent: false,
            created_at: BsonDateTime::now(),
        }
    }

    fn status_of(result: Result<(), AppError>) -> u16 {
        use actix_web::ResponseError;
        result.unwrap_err().status_code().as_u16()
    }

    #[test]
    fn only_lawyers_create_cases() {
        assert!(authorize(&user(Role::Lawyer), Action::CreateCase).is_ok());
        assert_eq!(status_of(authorize(&user(Role::Client), Action::CreateCase)), 403);
    }

    #[test]
    fn case_visible_to_both_parties_but_edited_by_lawyer_only() {
        let client = user(Role::Client);
        let lawyer = user(Role::Lawyer);
        let stranger = user(Role::Lawyer);
        let case = case_for(&client, &lawyer);

        assert!(authorize(&client, Action::ViewCase(&case)).is_ok());
        assert!(authorize(&lawyer, Action::AnnotateCase(&case)).is_ok());
        assert!(authorize(&stranger, Action::ViewCase(&case)).is_err());

        assert!(authorize(&lawyer, Action::EditCase(&case)).is_ok());
        assert!(authorize(&client, Action::EditCase(&case)).is_err());
        assert!(authorize(&client, Action::DeleteCase(&case)).is_err());
        assert!(authorize(&lawyer, Action::DeleteCase(&case)).is_ok());
    }

    #[test]
    fn client_edits_only_pending_appointments() {
        let client = user(Role::Client);
        let lawyer = user(Role::Lawyer);

        let pending = appointment_for(&client, &lawyer, AppointmentStatus::Pending);
        let scheduled = appointment_for(&client, &lawyer, AppointmentStatus::Scheduled);

        assert!(authorize(&client, Action::EditAppointment(&pending)).is_ok());
        let err = authorize(&client, Action::EditAppointment(&scheduled)).unwrap_err();
        assert_eq!(err.to_string(), "Can only update pending appointments");
        assert!(authorize(&lawyer, Action::EditAppointment(&scheduled)).is_ok());
    }

    #[test]
    fn status_changes_and_reminders_are_lawyer_only() {
        let client = user(Role::Client);
        let lawyer = user(Role::Lawyer);
        let other_lawyer = user(Role::Lawyer);
        let appointment = appointment_for(&client, &lawyer, AppointmentStatus::Pending);

        assert!(authorize(&lawyer, Action::ChangeAppointmentStatus(&appointment)).is_ok());
        assert_eq!(status_of(authorize(&client, Action::ChangeAppointmentStatus(&appointment))), 403);
        assert_eq!(status_of(authorize(&other_lawyer, Action::SendReminder(&appointment))), 403);
    }

    #[test]
    fn document_rules_follow_case_and_uploader() {
        let client = user(Role::Client);
        let lawyer = user(Role::Lawyer);
        let outsider = user(Role::Client);
        let case = case_for(&client, &lawyer);
        let document = Document {
            id: Some(ObjectId::new()),
            filename: "contract.pdf".into(),
            path: "documents/contract.pdf".into(),
            size: 10,
            mime_type: "application/pdf".into(),
            case_id: case.id.unwrap(),
            uploaded_by: client.id,
            uploaded_at: BsonDateTime::now(),
        };

        assert!(authorize(&lawyer, Action::DownloadDocument(&document, &case)).is_ok());
        assert!(authorize(&outsider, Action::DownloadDocument(&document, &case)).is_err());
        assert!(authorize(&client, Action::DeleteDocument(&document, &case)).is_ok());
        assert!(authorize(&lawyer, Action::DeleteDocument(&document, &case)).is_ok());
        assert!(authorize(&outsider, Action::DeleteDocument(&document, &case)).is_err());
    }

    #[test]
    fn private_constitutions_hidden_from_others() {
        let owner = user(Role::Lawyer);
        let reader = user(Role::Client);
        let mut constitution = Constitution {
            id: Some(ObjectId::new()),
            title: "Penal Code".into(),
            description: None,
            file_url: "constitutions/penal.pdf".into(),
            file_name: "penal.pdf".into(),
            file_size: 100,
            category: ConstitutionCategory::Criminal,
            uploaded_by: owner.id,
            uploaded_at: BsonDateTime::now(),
            download_count: 0,
            is_public: true,
        };

        assert!(authorize(&reader, Action::ViewConstitution(&constitution)).is_ok());
        constitution.is_public = false;
        assert_eq!(status_of(authorize(&reader, Action::ViewConstitution(&constitution))), 404);
        assert!(authorize(&owner, Action::ViewConstitution(&constitution)).is_ok());
        assert!(authorize(&reader, Action::ModifyConstitution(&constitution)).is_err());
        assert!(authorize(&reader, Action::UploadConstitutionFile).is_err());
        assert!(authorize(&owner, Action::UploadConstitutionFile).is_ok());
    }

    #[test]
    fn notifications_managed_by_recipient() {
        let recipient = user(Role::Client);
        let notification = Notification {
            id: Some(ObjectId::new()),
            title: "Hi".into(),
            message: "There".into(),
            notification_type: NotificationType::System,
            recipient: recipient.id,
            related_entity: None,
            read: false,
            created_at: BsonDateTime::now(),
        };
        assert!(authorize(&recipient, Action::ManageNotification(&notification)).is_ok());
        assert!(authorize(&user(Role::Client), Action::ManageNotification(&notification)).is_err());
    }
}
