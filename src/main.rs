mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod services;
mod storage;
mod utils;

use actix_cors::Cors;
use actix_web::{dev::Service, http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::services::{mailer, Notifier};
use crate::storage::{FileStore, LocalFileStore};

const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    utils::expose_internal_errors(config.is_development());

    log::info!("🚀 Starting LegalEase Service...");
    log::info!("⚙️  Environment: {:?}", config.environment);

    let db = database::MongoDB::new(&config.database_url).await.map_err(|e| {
        log::error!("❌ Failed to connect to MongoDB: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;
    log::info!("✅ MongoDB connected successfully");

    let store: Arc<dyn FileStore> = Arc::new(
        LocalFileStore::open(&config.upload_dir)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
    );
    log::info!("📁 Upload directory: {}", config.upload_dir.display());

    let (notifier, receiver) = Notifier::channel();
    let dispatcher = jobs::notification_dispatcher::start_notification_dispatcher(
        receiver,
        Arc::new(db.clone()),
        mailer::from_settings(&config.mail),
    );

    let bind_address = config.bind_address();
    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);

    let db_data = web::Data::new(db.clone());
    let config_data = web::Data::new(config.clone());
    let notifier_data = web::Data::new(notifier.clone());
    let store_data: web::Data<dyn FileStore> = web::Data::from(store);
    let openapi = api::swagger::ApiDoc::openapi();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config_data.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers(vec![header::CONTENT_TYPE, header::CONTENT_DISPOSITION])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(notifier_data.clone())
            .app_data(store_data.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .app_data(api::path_config())
            .wrap_fn(|req, srv| {
                let fut = srv.call(req);
                async move {
                    let outcome = fut.await;
                    api::metrics::record_outcome(&outcome);
                    outcome
                }
            })
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
            .route("/health", web::get().to(api::health::health_check))
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            .route("/signup", web::post().to(api::auth::signup))
                            .route("/login", web::post().to(api::auth::login))
                            .route("/forgotpassword", web::post().to(api::auth::forgot_password))
                            .route("/resetpassword/{token}", web::put().to(api::auth::reset_password))
                            .service(
                                web::resource("/me")
                                    .wrap(middleware::AuthMiddleware)
                                    .route(web::get().to(api::auth::me)),
                            )
                            .service(
                                web::resource("/updatedetails")
                                    .wrap(middleware::AuthMiddleware)
                                    .route(web::put().to(api::auth::update_details)),
                            )
                            .service(
                                web::resource("/updatepassword")
                                    .wrap(middleware::AuthMiddleware)
                                    .route(web::put().to(api::auth::update_password)),
                            )
                            .service(
                                web::resource("/logout")
                                    .wrap(middleware::AuthMiddleware)
                                    .route(web::get().to(api::auth::logout)),
                            ),
                    )
                    .service(
                        web::scope("/cases")
                            .wrap(middleware::AuthMiddleware)
                            .route("", web::get().to(api::cases::list_cases))
                            .route("", web::post().to(api::cases::create_case))
                            .route("/{id}", web::get().to(api::cases::get_case))
                            .route("/{id}", web::put().to(api::cases::update_case))
                            .route("/{id}", web::delete().to(api::cases::delete_case))
                            .route("/{id}/notes", web::post().to(api::cases::add_note))
                            .route("/{id}/documents", web::get().to(api::cases::list_documents))
                            .route("/{id}/documents", web::post().to(api::cases::upload_document)),
                    )
                    .service(
                        web::scope("/documents")
                            .wrap(middleware::AuthMiddleware)
                            .route("/{id}/download", web::get().to(api::documents::download_document))
                            .route("/{id}", web::delete().to(api::documents::delete_document)),
                    )
                    .service(
                        web::scope("/appointments")
                            .wrap(middleware::AuthMiddleware)
                            .route("", web::get().to(api::appointments::list_appointments))
                            .route("", web::post().to(api::appointments::create_appointment))
                            // before /{id}
                            .route("/upcoming", web::get().to(api::appointments::upcoming_appointments))
                            .route("/{id}", web::get().to(api::appointments::get_appointment))
                            .route("/{id}", web::put().to(api::appointments::update_appointment))
                            .route("/{id}", web::delete().to(api::appointments::delete_appointment))
                            .route("/{id}/status", web::patch().to(api::appointments::update_appointment_status))
                            .route("/{id}/send-reminder", web::post().to(api::appointments::send_reminder)),
                    )
                    .service(
                        web::scope("/constitutions")
                            .wrap(middleware::AuthMiddleware)
                            .route("", web::get().to(api::constitutions::list_constitutions))
                            .route("", web::post().to(api::constitutions::create_constitution))
                            .route("/upload", web::post().to(api::constitutions::upload_constitution_file))
                            .route("/{id}", web::get().to(api::constitutions::get_constitution))
                            .route("/{id}", web::put().to(api::constitutions::update_constitution))
                            .route("/{id}", web::delete().to(api::constitutions::delete_constitution))
                            .route("/{id}/file", web::get().to(api::constitutions::get_constitution_file)),
                    )
                    .service(
                        web::scope("/notifications")
                            .wrap(middleware::AuthMiddleware)
                            .route("", web::get().to(api::notifications::list_notifications))
                            .route("/read-all", web::put().to(api::notifications::mark_all_read))
                            .route("/{id}/read", web::put().to(api::notifications::mark_read))
                            .route("/{id}", web::delete().to(api::notifications::delete_notification)),
                    ),
            )
    })
    .bind(&bind_address)?
    .run()
    .await?;

    log::info!("🛑 HTTP server stopped, draining outbound queue...");
    drop(notifier);
    match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher).await {
        Ok(Ok(())) => log::info!("✅ Outbound queue drained"),
        Ok(Err(e)) => log::error!("❌ Notification dispatcher panicked: {}", e),
        Err(_) => log::warn!("⚠️  Outbound queue not drained within {:?}", DISPATCHER_DRAIN_TIMEOUT),
    }
    db.shutdown().await;

    Ok(())
}
