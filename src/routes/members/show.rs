use actix_web::web;
use actix_web::HttpResponse;
use sqlx::PgPool;
use uuid::Uuid;

use super::MemberError;
use crate::storage;

/// `GET /members/{member_id}`
///
/// Local lookup only; MailChimp is never consulted. An orphan shows up here
/// with `"mailchimp_id": null`, which is how callers tell a synchronized
/// record from one whose create never completed remotely.
#[tracing::instrument(name = "Showing member", skip(pool), fields(member_id = %*member_id))]
pub async fn show_member(
    member_id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, MemberError> {
    let member_id = member_id.into_inner();
    let member = storage::fetch_member(&pool, member_id)
        .await?
        .ok_or(MemberError::NotFound(member_id))?;
    Ok(HttpResponse::Ok().json(member))
}
