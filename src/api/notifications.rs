use crate::api::error_response;
use crate::database::MongoDB;
use crate::models::{AuthUser, NotificationResponse};
use crate::services::notification_service;
use actix_web::{web, HttpResponse};

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    responses((status = 200, description = "Caller's notifications, newest first, with unread count", body = [NotificationResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>) -> HttpResponse {
    match notification_service::list(&db, &user).await {
        Ok((notifications, unread)) => {
            let notifications: Vec<NotificationResponse> =
                notifications.into_iter().map(NotificationResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "count": notifications.len(),
                "unreadCount": unread,
                "notifications": notifications
            }))
        }
        Err(e) => error_response("GET /api/notifications", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = NotificationResponse),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    match notification_service::mark_read(&db, &id, &user).await {
        Ok(notification) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "notification": NotificationResponse::from(notification)
        })),
        Err(e) => error_response("PUT /api/notifications/{id}/read", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses((status = 200, description = "All notifications marked as read")),
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>) -> HttpResponse {
    match notification_service::mark_all_read(&db, &user).await {
        Ok(modified) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "All notifications marked as read",
            "modifiedCount": modified
        })),
        Err(e) => error_response("PUT /api/notifications/read-all", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 403, description = "Not the recipient")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_notification(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>, id: web::Path<String>) -> HttpResponse {
    match notification_service::delete(&db, &id, &user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Notification deleted"
        })),
        Err(e) => error_response("DELETE /api/notifications/{id}", e),
    }
}
