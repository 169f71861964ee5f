use actix_web::web;
use actix_web::HttpResponse;
use sqlx::PgPool;
use uuid::Uuid;

use super::MemberError;
use crate::domain::MemberData;
use crate::mailchimp_client::MailchimpClient;
use crate::member_locks::MemberLocks;
use crate::storage;

/// `PUT /members/{member_id}`
///
/// Merge semantics: supplied fields overwrite, omitted fields keep their
/// stored values. The write order is the reverse of create -- MailChimp
/// first, then the local row -- so that after a failed remote call the
/// stored record is still exactly what MailChimp last accepted. An orphan
/// (NULL mailchimp_id) cannot be addressed remotely and is rejected before
/// any write.
#[tracing::instrument(
    name = "Updating member",
    skip(data, pool, mailchimp, locks),
    fields(member_id = %*member_id)
)]
pub async fn update_member(
    member_id: web::Path<Uuid>,
    data: web::Json<MemberData>,
    pool: web::Data<PgPool>,
    mailchimp: web::Data<MailchimpClient>,
    locks: web::Data<MemberLocks>,
) -> Result<HttpResponse, MemberError> {
    let member_id = member_id.into_inner();
    // held across both writes; a concurrent update or remove of the same
    // member waits here instead of interleaving with ours
    let _guard = locks.acquire(member_id).await;

    let member = storage::fetch_member(&pool, member_id)
        .await?
        .ok_or(MemberError::NotFound(member_id))?;
    let merged = member.merge(data.into_inner()).map_err(MemberError::Validation)?;
    let mailchimp_id = merged
        .mailchimp_id
        .as_deref()
        .ok_or(MemberError::NotSynchronized(member_id))?;

    mailchimp
        .patch(
            &format!("lists/{}/members/{}", merged.list_id, mailchimp_id),
            &merged.mailchimp_payload(),
        )
        .await
        .map_err(MemberError::Remote)?;

    storage::update_member(&pool, &merged).await?;

    Ok(HttpResponse::Ok().json(merged))
}
