use crate::api::error_response;
use crate::database::MongoDB;
use crate::models::{
    AppointmentPage, AppointmentQuery, AppointmentResponse, AuthUser, CreateAppointmentRequest,
    UpdateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::{appointment_service, Notifier};
use actix_web::{web, HttpResponse};

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "Appointments",
    params(AppointmentQuery),
    responses((status = 200, description = "Caller's appointments, paginated", body = AppointmentPage)),
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    query: web::Query<AppointmentQuery>,
) -> HttpResponse {
    log::info!("📅 GET /api/appointments - user: {}", user.id);

    match appointment_service::list(&db, &user, &query).await {
        Ok(page) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": page.count,
            "total": page.total,
            "totalPages": page.total_pages,
            "currentPage": page.current_page,
            "appointments": page.appointments
        })),
        Err(e) => error_response("GET /api/appointments", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/appointments/upcoming",
    tag = "Appointments",
    responses((status = 200, description = "Scheduled appointments in the next 7 days", body = [AppointmentResponse])),
    security(("bearer_auth" = []))
)]
pub async fn upcoming_appointments(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>) -> HttpResponse {
    match appointment_service::upcoming(&db, &user).await {
        Ok(appointments) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": appointments.len(),
            "appointments": appointments
        })),
        Err(e) => error_response("GET /api/appointments/upcoming", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentResponse),
        (status = 403, description = "Not a party"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    match appointment_service::get(&db, &id, &user).await {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "appointment": appointment
        })),
        Err(e) => error_response("GET /api/appointments/{id}", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment created or requested", body = AppointmentResponse),
        (status = 400, description = "Invalid data or no lawyer available")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    db: web::Data<MongoDB>,
    notifier: web::Data<Notifier>,
    user: web::ReqData<AuthUser>,
    request: web::Json<CreateAppointmentRequest>,
) -> HttpResponse {
    log::info!("📅 POST /api/appointments - user: {} ({})", user.id, user.role);

    match appointment_service::create(&db, &notifier, &user, &request).await {
        Ok(appointment) => {
            let message = if user.is_lawyer() {
                "Appointment created"
            } else {
                "Appointment request submitted"
            };
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": message,
                "appointment": appointment
            }))
        }
        Err(e) => error_response("POST /api/appointments", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentResponse),
        (status = 403, description = "Not a party, or client editing a non-pending appointment")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_appointment(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    request: web::Json<UpdateAppointmentRequest>,
) -> HttpResponse {
    log::info!("📅 PUT /api/appointments/{} - user: {}", id, user.id);

    match appointment_service::update(&db, &id, &user, &request).await {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Appointment updated",
            "appointment": appointment
        })),
        Err(e) => error_response("PUT /api/appointments/{id}", e),
    }
}

#[utoipa::path(
    patch,
    path = "/api/appointments/{id}/status",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = AppointmentResponse),
        (status = 403, description = "Not the assigned lawyer")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_appointment_status(
    db: web::Data<MongoDB>,
    notifier: web::Data<Notifier>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
    request: web::Json<UpdateStatusRequest>,
) -> HttpResponse {
    log::info!("📅 PATCH /api/appointments/{}/status -> {}", id, request.status);

    match appointment_service::update_status(&db, &notifier, &id, &user, request.status).await {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": format!("Appointment status updated to {}", request.status),
            "appointment": appointment
        })),
        Err(e) => error_response("PATCH /api/appointments/{id}/status", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment deleted"),
        (status = 403, description = "Not a party")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_appointment(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    log::info!("🗑️  DELETE /api/appointments/{} - user: {}", id, user.id);

    match appointment_service::delete(&db, &id, &user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Appointment deleted"
        })),
        Err(e) => error_response("DELETE /api/appointments/{id}", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/appointments/{id}/send-reminder",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Reminder queued"),
        (status = 403, description = "Not the assigned lawyer")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_reminder(
    db: web::Data<MongoDB>,
    notifier: web::Data<Notifier>,
    user: web::ReqData<AuthUser>,
    id: web::Path<String>,
) -> HttpResponse {
    log::info!("⏰ POST /api/appointments/{}/send-reminder", id);

    match appointment_service::send_reminder(&db, &notifier, &id, &user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Appointment reminder sent"
        })),
        Err(e) => error_response("POST /api/appointments/{id}/send-reminder", e),
    }
}
