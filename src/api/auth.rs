use crate::api::error_response;
use crate::config::AppConfig;
use crate::database::MongoDB;
use crate::models::{
    AuthResponse, AuthUser, ForgotPasswordRequest, LoginRequest, PasswordResetResponse,
    RegisterRequest, ResetPasswordRequest, UpdateDetailsRequest, UpdatePasswordRequest, UserInfo,
};
use crate::services::{auth_service, Notifier};
use actix_web::{web, HttpResponse};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid data, admin role or email already registered")
    )
)]
pub async fn signup(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    notifier: web::Data<Notifier>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /api/auth/signup - email: {}, role: {}", request.email, request.role);

    match auth_service::register(&db, &config, &notifier, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => error_response("POST /api/auth/signup", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials or inactive account")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔐 POST /api/auth/login - email: {}", email);

    match auth_service::login(&db, &config, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => error_response("POST /api/auth/login", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(db: web::Data<MongoDB>, user: web::ReqData<AuthUser>) -> HttpResponse {
    match auth_service::me(&db, &user).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => error_response("GET /api/auth/me", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/auth/updatedetails",
    tag = "Auth",
    request_body = UpdateDetailsRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserInfo),
        (status = 400, description = "Invalid data or email taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_details(
    db: web::Data<MongoDB>,
    user: web::ReqData<AuthUser>,
    request: web::Json<UpdateDetailsRequest>,
) -> HttpResponse {
    log::info!("👤 PUT /api/auth/updatedetails - user: {}", user.id);

    match auth_service::update_details(&db, &user, &request).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => error_response("PUT /api/auth/updatedetails", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/auth/updatepassword",
    tag = "Auth",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed, new token issued", body = AuthResponse),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_password(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: web::ReqData<AuthUser>,
    request: web::Json<UpdatePasswordRequest>,
) -> HttpResponse {
    log::info!("🔑 PUT /api/auth/updatepassword - user: {}", user.id);

    match auth_service::update_password(&db, &config, &user, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response("PUT /api/auth/updatepassword", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/forgotpassword",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token generated", body = PasswordResetResponse),
        (status = 404, description = "No user with that email")
    )
)]
pub async fn forgot_password(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<ForgotPasswordRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /api/auth/forgotpassword - email: {}", request.email);

    match auth_service::forgot_password(&db, &config, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response("POST /api/auth/forgotpassword", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/auth/resetpassword/{token}",
    tag = "Auth",
    params(("token" = String, Path, description = "Raw reset token")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = AuthResponse),
        (status = 400, description = "Token invalid or expired")
    )
)]
pub async fn reset_password(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    token: web::Path<String>,
    request: web::Json<ResetPasswordRequest>,
) -> HttpResponse {
    log::info!("🔑 PUT /api/auth/resetpassword");

    match auth_service::reset_password(&db, &config, &token, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response("PUT /api/auth/resetpassword", e),
    }
}

/// Tokens are stateless; the client discards its copy.
#[utoipa::path(
    get,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logged out")),
    security(("bearer_auth" = []))
)]
pub async fn logout(user: web::ReqData<AuthUser>) -> HttpResponse {
    log::info!("👋 GET /api/auth/logout - user: {}", user.id);
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}
