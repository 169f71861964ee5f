use actix_web::web;
use actix_web::HttpResponse;
use anyhow::Context;
use serde_json::Value;
use sqlx::PgPool;

use super::MemberError;
use crate::domain::Member;
use crate::domain::MemberData;
use crate::mailchimp_client::MailchimpClient;
use crate::storage;

/// `POST /members`
///
/// Local first, then MailChimp:
///     1. validate the field map (no side effects on failure)
///     2. INSERT the record with a NULL mailchimp_id
///     3. create the member on MailChimp
///     4. stamp the returned id onto the row
///
/// A failure in step 3 or 4 leaves the row from step 2 in place with its
/// NULL mailchimp_id -- the orphan that a reconciliation sweep can find
/// later. There is no transaction spanning the two stores, so nothing is
/// rolled back.
#[tracing::instrument(
    name = "Creating member",
    skip(data, pool, mailchimp),
    fields(member_id = tracing::field::Empty)
)]
pub async fn create_member(
    data: web::Json<MemberData>,
    // all subsequent args are inherited via App.app_data
    pool: web::Data<PgPool>,
    mailchimp: web::Data<MailchimpClient>,
) -> Result<HttpResponse, MemberError> {
    let member = Member::new(data.into_inner()).map_err(MemberError::Validation)?;
    tracing::Span::current().record("member_id", tracing::field::display(member.member_id));

    storage::insert_member(&pool, &member).await?;

    let response = mailchimp
        .post(
            &format!("lists/{}/members", member.list_id),
            &member.mailchimp_payload(),
        )
        .await
        .map_err(MemberError::Remote)?;
    let mailchimp_id = response
        .get("id")
        .and_then(Value::as_str)
        .context("MailChimp create response did not contain a member id")?
        .to_owned();

    let member = member.with_mailchimp_id(mailchimp_id);
    storage::update_member(&pool, &member).await?;

    Ok(HttpResponse::Ok().json(member))
}
