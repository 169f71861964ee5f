use actix_web::web;
use actix_web::HttpResponse;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::MemberError;
use crate::mailchimp_client::MailchimpClient;
use crate::member_locks::MemberLocks;
use crate::storage;

/// `DELETE /members/{member_id}`
///
/// Local delete first, then MailChimp. A failed remote delete cannot be
/// rolled back -- the local row is already gone and the id stops resolving
/// -- so it is reported with a dedicated error variant rather than a plain
/// remote failure, and must not be retried against the same member id.
/// Orphans are rejected up front: with no MailChimp id there is no remote
/// resource to delete.
#[tracing::instrument(
    name = "Removing member",
    skip(pool, mailchimp, locks),
    fields(member_id = %*member_id)
)]
pub async fn remove_member(
    member_id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    mailchimp: web::Data<MailchimpClient>,
    locks: web::Data<MemberLocks>,
) -> Result<HttpResponse, MemberError> {
    let member_id = member_id.into_inner();
    let _guard = locks.acquire(member_id).await;

    let member = storage::fetch_member(&pool, member_id)
        .await?
        .ok_or(MemberError::NotFound(member_id))?;
    let mailchimp_id = member
        .mailchimp_id
        .as_deref()
        .ok_or(MemberError::NotSynchronized(member_id))?;

    storage::delete_member(&pool, member_id).await?;

    mailchimp
        .delete(&format!("lists/{}/members/{}", member.list_id, mailchimp_id))
        .await
        .map_err(|source| MemberError::RemoteAfterDelete { member_id, source })?;

    Ok(HttpResponse::Ok().json(json!({})))
}
