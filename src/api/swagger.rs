use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LegalEase Service API",
        version = "1.0.0",
        description = "Legal practice management API: cases, documents, appointments, reference constitutions and notifications for lawyers and clients.\n\n**Authentication:** every `/api` endpoint except signup, login, forgot/reset password requires a JWT Bearer token."
    ),
    paths(
        // Auth
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::me,
        crate::api::auth::update_details,
        crate::api::auth::update_password,
        crate::api::auth::forgot_password,
        crate::api::auth::reset_password,
        crate::api::auth::logout,

        // Cases
        crate::api::cases::list_cases,
        crate::api::cases::get_case,
        crate::api::cases::create_case,
        crate::api::cases::update_case,
        crate::api::cases::delete_case,
        crate::api::cases::add_note,

        // Documents
        crate::api::cases::list_documents,
        crate::api::cases::upload_document,
        crate::api::documents::download_document,
        crate::api::documents::delete_document,

        // Appointments
        crate::api::appointments::list_appointments,
        crate::api::appointments::upcoming_appointments,
        crate::api::appointments::get_appointment,
        crate::api::appointments::create_appointment,
        crate::api::appointments::update_appointment,
        crate::api::appointments::update_appointment_status,
        crate::api::appointments::delete_appointment,
        crate::api::appointments::send_reminder,

        // Constitutions
        crate::api::constitutions::list_constitutions,
        crate::api::constitutions::get_constitution,
        crate::api::constitutions::get_constitution_file,
        crate::api::constitutions::upload_constitution_file,
        crate::api::constitutions::create_constitution,
        crate::api::constitutions::update_constitution,
        crate::api::constitutions::delete_constitution,

        // Notifications
        crate::api::notifications::list_notifications,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,
        crate::api::notifications::delete_notification,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            crate::models::Role,
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::UpdateDetailsRequest,
            crate::models::UpdatePasswordRequest,
            crate::models::ForgotPasswordRequest,
            crate::models::ResetPasswordRequest,
            crate::models::UserInfo,
            crate::models::UserSummary,
            crate::models::AuthResponse,
            crate::models::PasswordResetResponse,

            crate::models::CaseStatus,
            crate::models::CaseCategory,
            crate::models::CreateCaseRequest,
            crate::models::UpdateCaseRequest,
            crate::models::AddNoteRequest,
            crate::models::NoteResponse,
            crate::models::CaseReference,
            crate::models::CaseResponse,

            crate::models::DocumentResponse,
            crate::models::DocumentSummary,

            crate::models::AppointmentStatus,
            crate::models::CreateAppointmentRequest,
            crate::models::UpdateAppointmentRequest,
            crate::models::UpdateStatusRequest,
            crate::models::AppointmentResponse,
            crate::models::AppointmentSummary,
            crate::models::AppointmentPage,

            crate::models::ConstitutionCategory,
            crate::models::CreateConstitutionRequest,
            crate::models::UpdateConstitutionRequest,
            crate::models::ConstitutionResponse,
            crate::models::UploadedFileResponse,

            crate::models::NotificationType,
            crate::models::EntityType,
            crate::models::RelatedEntityResponse,
            crate::models::NotificationResponse,

            crate::api::uploads::DocumentUploadForm,
            crate::api::uploads::ConstitutionUploadForm,
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, profile and password reset."),
        (name = "Cases", description = "Case records shared by a client and their lawyer, with notes."),
        (name = "Documents", description = "Files attached to cases."),
        (name = "Appointments", description = "Meetings between lawyers and clients, status lifecycle and reminders."),
        (name = "Constitutions", description = "Reference legal documents, public or private."),
        (name = "Notifications", description = "In-app notifications for the current user."),
        (name = "Health", description = "Health check and metrics."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT from /api/auth/login or /api/auth/signup"))
                        .build(),
                ),
            );
        }
    }
}
