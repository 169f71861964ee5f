//! Row mapping and queries for the `members` table. Column names stay in
//! here; the domain type never sees them.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Location;
use crate::domain::MarketingPermission;
use crate::domain::Member;
use crate::domain::MemberEmail;

#[derive(sqlx::FromRow)]
struct MemberRow {
    member_id: Uuid,
    list_id: String,
    mailchimp_id: Option<String>,
    email_address: String,
    email_type: String,
    status: Option<String>,
    language: Option<String>,
    vip: bool,
    ip_signup: Option<String>,
    timestamp_signup: String,
    ip_opt: Option<String>,
    timestamp_opt: Option<String>,
    tags: Option<Json<BTreeSet<String>>>,
    interests: Option<Json<BTreeSet<String>>>,
    merge_fields: Option<Json<BTreeMap<String, String>>>,
    location: Option<Json<Location>>,
    marketing_permissions: Option<Json<Vec<MarketingPermission>>>,
    created_at: DateTime<Utc>,
}

/// Emails were parsed on the way in, but a row may have been written by
/// another tool since; re-parse rather than trust the column.
fn member_from_row(row: MemberRow) -> Result<Member, sqlx::Error> {
    let email_address = MemberEmail::parse(row.email_address)
        .map_err(|e| sqlx::Error::Decode(format!("invalid email in members row: {e}").into()))?;

    Ok(Member {
        member_id: row.member_id,
        list_id: row.list_id,
        mailchimp_id: row.mailchimp_id,
        email_address,
        email_type: row.email_type,
        status: row.status,
        language: row.language,
        vip: row.vip,
        ip_signup: row.ip_signup,
        timestamp_signup: row.timestamp_signup,
        ip_opt: row.ip_opt,
        timestamp_opt: row.timestamp_opt,
        tags: row.tags.map(|Json(tags)| tags),
        interests: row.interests.map(|Json(interests)| interests),
        merge_fields: row.merge_fields.map(|Json(merge_fields)| merge_fields),
        location: row.location.map(|Json(location)| location),
        marketing_permissions: row.marketing_permissions.map(|Json(permissions)| permissions),
        created_at: row.created_at,
    })
}

#[tracing::instrument(name = "INSERTing member into db", skip(pool, member))]
pub async fn insert_member(
    pool: &PgPool,
    member: &Member,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "
    INSERT INTO members
        (member_id, list_id, mailchimp_id, email_address, email_type, status,
         language, vip, ip_signup, timestamp_signup, ip_opt, timestamp_opt,
         tags, interests, merge_fields, location, marketing_permissions, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
",
    )
    .bind(member.member_id)
    .bind(&member.list_id)
    .bind(&member.mailchimp_id)
    .bind(member.email_address.as_ref())
    .bind(&member.email_type)
    .bind(&member.status)
    .bind(&member.language)
    .bind(member.vip)
    .bind(&member.ip_signup)
    .bind(&member.timestamp_signup)
    .bind(&member.ip_opt)
    .bind(&member.timestamp_opt)
    .bind(member.tags.as_ref().map(Json))
    .bind(member.interests.as_ref().map(Json))
    .bind(member.merge_fields.as_ref().map(Json))
    .bind(member.location.as_ref().map(Json))
    .bind(member.marketing_permissions.as_ref().map(Json))
    .bind(member.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("bad query: {e:?}");
        e
    })?;
    Ok(())
}

/// Overwrite the row for `member.member_id` with the record as given. Used
/// both to stamp the MailChimp id after a successful create and to commit a
/// merged update.
#[tracing::instrument(name = "UPDATEing member in db", skip(pool, member))]
pub async fn update_member(
    pool: &PgPool,
    member: &Member,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "
    UPDATE members SET
        list_id = $2, mailchimp_id = $3, email_address = $4, email_type = $5,
        status = $6, language = $7, vip = $8, ip_signup = $9,
        timestamp_signup = $10, ip_opt = $11, timestamp_opt = $12, tags = $13,
        interests = $14, merge_fields = $15, location = $16,
        marketing_permissions = $17
    WHERE member_id = $1
",
    )
    .bind(member.member_id)
    .bind(&member.list_id)
    .bind(&member.mailchimp_id)
    .bind(member.email_address.as_ref())
    .bind(&member.email_type)
    .bind(&member.status)
    .bind(&member.language)
    .bind(member.vip)
    .bind(&member.ip_signup)
    .bind(&member.timestamp_signup)
    .bind(&member.ip_opt)
    .bind(&member.timestamp_opt)
    .bind(member.tags.as_ref().map(Json))
    .bind(member.interests.as_ref().map(Json))
    .bind(member.merge_fields.as_ref().map(Json))
    .bind(member.location.as_ref().map(Json))
    .bind(member.marketing_permissions.as_ref().map(Json))
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("bad query: {e:?}");
        e
    })?;
    Ok(())
}

#[tracing::instrument(name = "SELECTing member from db", skip(pool))]
pub async fn fetch_member(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, MemberRow>("SELECT * FROM members WHERE member_id = $1")
        .bind(member_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("bad query: {e:?}");
            e
        })?
        .map(member_from_row)
        .transpose()
}

#[tracing::instrument(name = "DELETEing member from db", skip(pool))]
pub async fn delete_member(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM members WHERE member_id = $1")
        .bind(member_id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("bad query: {e:?}");
            e
        })?;
    Ok(())
}
