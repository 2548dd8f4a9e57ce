use crate::{config::AppConfig, database::MongoDB, services::auth_service, utils::AppError};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

/// Verifies the bearer token, loads the account and attaches it to the
/// request as `AuthUser` (read with `web::ReqData<AuthUser>`).
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = bearer_token(&req)
                .ok_or_else(|| AppError::unauthorized("Not authorized to access this route"))?;

            let config = req
                .app_data::<web::Data<AppConfig>>()
                .cloned()
                .ok_or_else(|| AppError::internal("AppConfig is not registered"))?;
            let claims = auth_service::verify_token(&token, &config.jwt)?;

            let db = req
                .app_data::<web::Data<MongoDB>>()
                .cloned()
                .ok_or_else(|| AppError::internal("MongoDB is not registered"))?;
            let user = auth_service::load_active_user(&db, &claims.sub).await?;

            log::debug!("🔓 {} {} as {} ({})", req.method(), req.path(), user.email, user.role);
            req.extensions_mut().insert(user);

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use actix_web::{test, App, HttpResponse};

    async fn protected() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn missing_or_malformed_token_is_401() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(test_config())).service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/private", web::get().to(protected)),
            ),
        )
        .await;

        let cases = [
            None,
            Some("Basic dXNlcjpwYXNz"),
            Some("Bearer "),
            Some("Bearer not.a.jwt"),
        ];
        for header_value in cases {
            let mut req = test::TestRequest::get().uri("/api/private");
            if let Some(value) = header_value {
                req = req.insert_header((header::AUTHORIZATION, value));
            }
            let err = test::try_call_service(&app, req.to_request())
                .await
                .err()
                .expect("request should be rejected");
            assert_eq!(err.as_response_error().status_code().as_u16(), 401);
        }
    }

    #[actix_web::test]
    async fn token_signed_for_other_audience_is_401() {
        let config = test_config();
        let mut foreign = config.jwt.clone();
        foreign.audience = "another-api".into();

        let user = crate::models::User {
            id: Some(mongodb::bson::oid::ObjectId::new()),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: String::new(),
            role: crate::models::Role::Client,
            phone: None,
            is_active: true,
            password_reset_token: None,
            password_reset_expires: None,
            cases: vec![],
            appointments: vec![],
            created_at: mongodb::bson::DateTime::now(),
        };
        let token = auth_service::generate_jwt(&user, &foreign).unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(config)).service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/private", web::get().to(protected)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/private")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let err = test::try_call_service(&app, req).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code().as_u16(), 401);
    }
}
