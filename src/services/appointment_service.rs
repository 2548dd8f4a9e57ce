use crate::{
    database::MongoDB,
    models::{
        Appointment, AppointmentPage, AppointmentQuery, AppointmentResponse, AppointmentStatus,
        AuthUser, CreateAppointmentRequest, Role, UpdateAppointmentRequest, User,
    },
    services::{
        access_policy::{authorize, Action},
        case_service, mailer,
        notification_service::{self, Notifier},
        populate,
    },
    utils::{
        parse_object_id,
        time::{parse_date, to_bson, to_chrono},
        AppError,
    },
};
use chrono::{Duration, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;
use validator::Validate;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;
const UPCOMING_WINDOW_DAYS: i64 = 7;

/// (page, limit, skip) with page starting at 1.
fn page_window(page: Option<u64>, limit: Option<u64>) -> (u64, u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

fn total_pages(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit)
}

/// `None` (or `all`) means no status filter.
fn status_filter(raw: Option<&str>) -> Result<Option<AppointmentStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => AppointmentStatus::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("Invalid status: {}", value))),
    }
}

fn parse_appointment_date(raw: &str) -> Result<BsonDateTime, AppError> {
    parse_date(raw)
        .map(to_bson)
        .ok_or_else(|| AppError::validation("Please provide a valid date"))
}

fn party_filter(user: &AuthUser) -> Document {
    doc! { "$or": [ { "lawyerId": user.id }, { "clientId": user.id } ] }
}

async fn build_responses(db: &MongoDB, appointments: Vec<Appointment>) -> Result<Vec<AppointmentResponse>, AppError> {
    let users = populate::user_summaries(
        db,
        appointments
            .iter()
            .flat_map(|a| [a.lawyer_id, a.client_id])
            .collect::<Vec<_>>(),
    )
    .await?;
    let cases = populate::case_references(db, appointments.iter().filter_map(|a| a.case_id).collect::<Vec<_>>()).await?;

    Ok(appointments
        .into_iter()
        .map(|appointment| AppointmentResponse {
            id: appointment.id.map(|id| id.to_hex()).unwrap_or_default(),
            lawyer: users.get(&appointment.lawyer_id).cloned(),
            client: users.get(&appointment.client_id).cloned(),
            case: appointment.case_id.and_then(|id| cases.get(&id)).cloned(),
            lawyer_id: appointment.lawyer_id.to_hex(),
            client_id: appointment.client_id.to_hex(),
            title: appointment.title,
            description: appointment.description,
            date: to_chrono(appointment.date),
            time: appointment.time,
            duration: appointment.duration,
            status: appointment.status,
            location: appointment.location,
            meeting_link: appointment.meeting_link,
            reminder_sent: appointment.reminder_sent,
            created_at: to_chrono(appointment.created_at),
        })
        .collect())
}

async fn build_response(db: &MongoDB, appointment: Appointment) -> Result<AppointmentResponse, AppError> {
    build_responses(db, vec![appointment])
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Appointment population returned nothing"))
}

async fn find_appointment(db: &MongoDB, id: &str) -> Result<Appointment, AppError> {
    let id = parse_object_id(id)?;
    db.appointments()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))
}

async fn find_user(db: &MongoDB, id: ObjectId, missing: &str) -> Result<User, AppError> {
    db.users()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found(missing))
}

// ==================== OPERATIONS ====================

pub async fn list(db: &MongoDB, user: &AuthUser, query: &AppointmentQuery) -> Result<AppointmentPage, AppError> {
    let mut filter = party_filter(user);
    if let Some(status) = status_filter(query.status.as_deref())? {
        filter.insert("status", status.as_str());
    }
    if query.upcoming.unwrap_or(false) {
        filter.insert("date", doc! { "$gte": BsonDateTime::now() });
    }

    let (page, limit, skip) = page_window(query.page, query.limit);
    let total = db.appointments().count_documents(filter.clone()).await?;

    let appointments: Vec<Appointment> = db
        .appointments()
        .find(filter)
        .sort(doc! { "date": 1, "time": 1 })
        .skip(skip)
        .limit(limit as i64)
        .await?
        .try_collect()
        .await?;

    let appointments = build_responses(db, appointments).await?;
    Ok(AppointmentPage {
        count: appointments.len(),
        total,
        total_pages: total_pages(total, limit),
        current_page: page,
        appointments,
    })
}

/// Scheduled appointments in the coming week.
pub async fn upcoming(db: &MongoDB, user: &AuthUser) -> Result<Vec<AppointmentResponse>, AppError> {
    let now = Utc::now();
    let mut filter = party_filter(user);
    filter.insert("status", AppointmentStatus::Scheduled.as_str());
    filter.insert(
        "date",
        doc! {
            "$gte": to_bson(now),
            "$lte": to_bson(now + Duration::days(UPCOMING_WINDOW_DAYS)),
        },
    );

    let appointments: Vec<Appointment> = db
        .appointments()
        .find(filter)
        .sort(doc! { "date": 1, "time": 1 })
        .await?
        .try_collect()
        .await?;

    build_responses(db, appointments).await
}

pub async fn get(db: &MongoDB, id: &str, user: &AuthUser) -> Result<AppointmentResponse, AppError> {
    let appointment = find_appointment(db, id).await?;
    authorize(user, Action::ViewAppointment(&appointment))?;
    build_response(db, appointment).await
}

pub async fn create(
    db: &MongoDB,
    notifier: &Notifier,
    user: &AuthUser,
    request: &CreateAppointmentRequest,
) -> Result<AppointmentResponse, AppError> {
    request.validate()?;
    let date = parse_appointment_date(&request.date)?;

    // Clients book with the first available lawyer; lawyers book for a named client.
    let (lawyer, client, status) = match user.role {
        Role::Client => {
            let lawyer = db
                .users()
                .find_one(doc! { "role": Role::Lawyer.as_str(), "isActive": true })
                .sort(doc! { "createdAt": 1 })
                .await?
                .ok_or_else(|| AppError::validation("No available lawyer"))?;
            let client = find_user(db, user.id, "User not found").await?;
            (lawyer, client, AppointmentStatus::Pending)
        }
        Role::Lawyer => {
            let client_id = request
                .client_id
                .as_deref()
                .ok_or_else(|| AppError::validation("Please provide a client"))?;
            let client = find_user(db, parse_object_id(client_id)?, "Client not found").await?;
            if client.role != Role::Client {
                return Err(AppError::validation("Selected user is not a client"));
            }
            let lawyer = find_user(db, user.id, "User not found").await?;
            (lawyer, client, AppointmentStatus::Scheduled)
        }
        Role::Admin => return Err(AppError::forbidden("Only lawyers and clients can book appointments")),
    };

    let lawyer_id = lawyer.id.ok_or_else(|| AppError::internal("Stored lawyer has no id"))?;
    let client_id = client.id.ok_or_else(|| AppError::internal("Stored client has no id"))?;

    let case_id = match request.case_id.as_deref().filter(|id| !id.is_empty()) {
        Some(raw) => {
            let case = case_service::find_case(db, &parse_object_id(raw)?).await?;
            if case.client_id != client_id || case.lawyer_id != lawyer_id {
                return Err(AppError::validation("Case does not belong to this lawyer and client"));
            }
            case.id
        }
        None => None,
    };

    let mut appointment = Appointment {
        id: None,
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        date,
        time: request.time.trim().to_string(),
        duration: request.duration.unwrap_or(60),
        lawyer_id,
        client_id,
        case_id,
        status,
        location: request.location.clone().unwrap_or_else(|| "Office".to_string()),
        meeting_link: request.meeting_link.clone(),
        reminder_sent: false,
        created_at: BsonDateTime::now(),
    };

    let result = db.appointments().insert_one(&appointment).await?;
    let appointment_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::internal("Inserted appointment has no ObjectId"))?;
    appointment.id = Some(appointment_id);

    db.users()
        .update_many(
            doc! { "_id": { "$in": [lawyer_id, client_id] } },
            doc! { "$addToSet": { "appointments": appointment_id } },
        )
        .await?;
    if let Some(case_id) = case_id {
        db.cases()
            .update_one(
                doc! { "_id": case_id },
                doc! { "$addToSet": { "appointments": appointment_id }, "$set": { "updatedAt": BsonDateTime::now() } },
            )
            .await?;
    }

    if user.is_lawyer() {
        notifier.email(mailer::appointment_confirmation(&client.email, &appointment));
        notifier.notify(notification_service::appointment_scheduled(&appointment));
    } else {
        notifier.email(mailer::appointment_request(&lawyer.email, &appointment, &client.name));
        notifier.notify(notification_service::appointment_requested(&appointment, &client.name));
    }

    log::info!(
        "📅 Appointment {} created by {} ({})",
        appointment_id,
        user.id,
        appointment.status
    );
    build_response(db, appointment).await
}

pub async fn update(
    db: &MongoDB,
    id: &str,
    user: &AuthUser,
    request: &UpdateAppointmentRequest,
) -> Result<AppointmentResponse, AppError> {
    request.validate()?;
    let appointment = find_appointment(db, id).await?;
    authorize(user, Action::EditAppointment(&appointment))?;

    let mut changes = Document::new();
    if let Some(title) = &request.title {
        changes.insert("title", title.trim());
    }
    if let Some(description) = &request.description {
        changes.insert("description", description.as_str());
    }
    if let Some(date) = &request.date {
        changes.insert("date", parse_appointment_date(date)?);
    }
    if let Some(time) = &request.time {
        changes.insert("time", time.trim());
    }
    if let Some(duration) = request.duration {
        changes.insert("duration", duration);
    }
    if let Some(location) = &request.location {
        changes.insert("location", location.as_str());
    }
    if let Some(link) = &request.meeting_link {
        changes.insert("meetingLink", link.as_str());
    }

    if changes.is_empty() {
        return build_response(db, appointment).await;
    }

    let updated = db
        .appointments()
        .find_one_and_update(doc! { "_id": appointment.id }, doc! { "$set": changes })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    build_response(db, updated).await
}

pub async fn update_status(
    db: &MongoDB,
    notifier: &Notifier,
    id: &str,
    user: &AuthUser,
    status: AppointmentStatus,
) -> Result<AppointmentResponse, AppError> {
    let appointment = find_appointment(db, id).await?;
    authorize(user, Action::ChangeAppointmentStatus(&appointment))?;

    let updated = db
        .appointments()
        .find_one_and_update(
            doc! { "_id": appointment.id },
            doc! { "$set": { "status": status.as_str() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    notifier.notify(notification_service::appointment_status_changed(&updated));
    if status == AppointmentStatus::Scheduled {
        let client = find_user(db, updated.client_id, "Client not found").await?;
        notifier.email(mailer::appointment_confirmation(&client.email, &updated));
    }

    log::info!("📅 Appointment {} status -> {}", id, status);
    build_response(db, updated).await
}

pub async fn delete(db: &MongoDB, id: &str, user: &AuthUser) -> Result<(), AppError> {
    let appointment = find_appointment(db, id).await?;
    authorize(user, Action::DeleteAppointment(&appointment))?;

    db.users()
        .update_many(
            doc! { "_id": { "$in": [appointment.lawyer_id, appointment.client_id] } },
            doc! { "$pull": { "appointments": appointment.id } },
        )
        .await?;
    if let Some(case_id) = appointment.case_id {
        db.cases()
            .update_one(doc! { "_id": case_id }, doc! { "$pull": { "appointments": appointment.id } })
            .await?;
    }
    db.appointments().delete_one(doc! { "_id": appointment.id }).await?;

    log::info!("🗑️  Appointment {} deleted by {}", id, user.id);
    Ok(())
}

/// Queues the reminder email again on every call.
pub async fn send_reminder(db: &MongoDB, notifier: &Notifier, id: &str, user: &AuthUser) -> Result<(), AppError> {
    let appointment = find_appointment(db, id).await?;
    authorize(user, Action::SendReminder(&appointment))?;

    let client = find_user(db, appointment.client_id, "Client not found").await?;
    notifier.email(mailer::appointment_reminder(&client.email, &appointment));

    db.appointments()
        .update_one(doc! { "_id": appointment.id }, doc! { "$set": { "reminderSent": true } })
        .await?;
    Ok(())
}
