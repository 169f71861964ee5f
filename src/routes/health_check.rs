use actix_web::HttpResponse;

/// `GET /health_check`
///
/// Used by the load balancer; says nothing about Postgres or MailChimp.
pub async fn health_check() -> HttpResponse { HttpResponse::Ok().finish() }
