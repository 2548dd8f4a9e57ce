use actix_web::{dev::ServiceResponse, http::StatusCode, Error, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static CLIENT_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static SERVER_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

/// Called once per finished request.
fn record_response(status: StatusCode) {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
    if status.is_client_error() {
        CLIENT_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
    } else if status.is_server_error() {
        SERVER_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
    }
}

/// Status a finished request is answered with, including middleware rejections.
fn outcome_status<B>(outcome: &Result<ServiceResponse<B>, Error>) -> StatusCode {
    match outcome {
        Ok(res) => res.status(),
        Err(e) => e.as_response_error().status_code(),
    }
}

pub fn record_outcome<B>(outcome: &Result<ServiceResponse<B>, Error>) {
    record_response(outcome_status(outcome));
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_client_errors_total: u64,
    pub http_server_errors_total: u64,
}

fn snapshot() -> MetricsResponse {
    MetricsResponse {
        http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
        http_client_errors_total: CLIENT_ERROR_COUNT.load(Ordering::Relaxed),
        http_server_errors_total: SERVER_ERROR_COUNT.load(Ordering::Relaxed),
    }
}

fn render(metrics: &MetricsResponse) -> String {
    format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         \n\
         # HELP http_client_errors_total Responses with a 4xx status\n\
         # TYPE http_client_errors_total counter\n\
         http_client_errors_total {}\n\
         \n\
         # HELP http_server_errors_total Responses with a 5xx status\n\
         # TYPE http_server_errors_total counter\n\
         http_server_errors_total {}\n",
        metrics.http_requests_total, metrics.http_client_errors_total, metrics.http_server_errors_total
    )
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus text exposition")
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render(&snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::middleware::AuthMiddleware;
    use actix_web::dev::Service;
    use actix_web::{test as actix_test, web, App};

    #[test]
    fn counts_errors_by_class() {
        let before = snapshot();
        record_response(StatusCode::OK);
        record_response(StatusCode::NOT_FOUND);
        record_response(StatusCode::INTERNAL_SERVER_ERROR);
        let after = snapshot();

        // Counters are global; other tests may add to them concurrently.
        assert!(after.http_requests_total >= before.http_requests_total + 3);
        assert!(after.http_client_errors_total > before.http_client_errors_total);
        assert!(after.http_server_errors_total > before.http_server_errors_total);
    }

    #[test]
    fn renders_prometheus_text() {
        let text = render(&MetricsResponse {
            http_requests_total: 7,
            http_client_errors_total: 2,
            http_server_errors_total: 1,
        });
        assert!(text.contains("http_requests_total 7\n"));
        assert!(text.contains("http_client_errors_total 2\n"));
        assert!(text.contains("# TYPE http_server_errors_total counter"));
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn rejected_token_is_counted_as_client_error() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .wrap_fn(|req, srv| {
                    let fut = srv.call(req);
                    async move {
                        let outcome = fut.await;
                        assert_eq!(outcome_status(&outcome), StatusCode::UNAUTHORIZED);
                        record_outcome(&outcome);
                        outcome
                    }
                })
                .service(
                    web::scope("/api")
                        .wrap(AuthMiddleware)
                        .route("/private", web::get().to(ok)),
                ),
        )
        .await;

        let before = snapshot();
        let req = actix_test::TestRequest::get().uri("/api/private").to_request();
        assert!(actix_test::try_call_service(&app, req).await.is_err());
        let after = snapshot();

        assert!(after.http_requests_total > before.http_requests_total);
        assert!(after.http_client_errors_total > before.http_client_errors_total);
    }
}
