use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::MemberEmail;

/// A list member as it exists on both sides of the sync: the local database
/// and MailChimp.
///
/// `mailchimp_id` is the synchronization marker. It is `None` from the moment
/// the record is first persisted until MailChimp accepts the create, and is
/// written exactly once after that. A persisted record whose `mailchimp_id`
/// is still `None` is an orphan: a create whose remote half never completed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Member {
    pub member_id: Uuid,
    pub list_id: String,
    pub mailchimp_id: Option<String>,
    pub email_address: MemberEmail,
    pub email_type: String,
    pub status: Option<String>,
    pub language: Option<String>,
    pub vip: bool,
    pub ip_signup: Option<String>,
    pub timestamp_signup: String,
    pub ip_opt: Option<String>,
    pub timestamp_opt: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub interests: Option<BTreeSet<String>>,
    pub merge_fields: Option<BTreeMap<String, String>>,
    pub location: Option<Location>,
    pub marketing_permissions: Option<Vec<MarketingPermission>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: String,
    pub longitude: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketingPermission {
    pub marketing_permission_id: String,
    pub enabled: bool,
}

/// The inbound field map for create and update requests. Every field is
/// optional at this stage; which ones must be present is decided by
/// validation, not by deserialization, so that a request missing three fields
/// reports all three.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MemberData {
    pub list_id: Option<String>,
    pub email_address: Option<String>,
    pub email_type: Option<String>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub vip: Option<bool>,
    pub ip_signup: Option<String>,
    pub timestamp_signup: Option<String>,
    pub ip_opt: Option<String>,
    pub timestamp_opt: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub interests: Option<BTreeSet<String>>,
    pub merge_fields: Option<BTreeMap<String, String>>,
    pub location: Option<Location>,
    pub marketing_permissions: Option<Vec<MarketingPermission>>,
}

/// Validation failures keyed by the snake_case field name as it appears on
/// the wire, each with one message per violated rule.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct FieldViolations(BTreeMap<String, Vec<String>>);

impl FieldViolations {
    fn push(
        &mut self,
        field: &str,
        message: impl Into<String>,
    ) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }
}

impl std::fmt::Display for FieldViolations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{rendered}")
    }
}

fn require<T>(
    value: Option<T>,
    field: &str,
    violations: &mut FieldViolations,
) -> Option<T> {
    if value.is_none() {
        violations.push(field, format!("{field} is required"));
    }
    value
}

impl Member {
    /// Validate a raw field map into a fresh record: a new `member_id`, no
    /// `mailchimp_id`. Nothing is persisted here; on failure the caller gets
    /// every violated field, not just the first.
    pub fn new(data: MemberData) -> Result<Self, FieldViolations> {
        Self::build(Uuid::new_v4(), None, Utc::now(), data)
    }

    fn build(
        member_id: Uuid,
        mailchimp_id: Option<String>,
        created_at: DateTime<Utc>,
        data: MemberData,
    ) -> Result<Self, FieldViolations> {
        let mut violations = FieldViolations::default();

        let email_address = match require(data.email_address, "email_address", &mut violations) {
            Some(raw) => match MemberEmail::parse(raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    violations.push("email_address", e);
                    None
                }
            },
            None => None,
        };
        let list_id = require(data.list_id, "list_id", &mut violations);
        let email_type = require(data.email_type, "email_type", &mut violations);
        let vip = require(data.vip, "vip", &mut violations);
        let timestamp_signup = require(data.timestamp_signup, "timestamp_signup", &mut violations);

        match (list_id, email_address, email_type, vip, timestamp_signup) {
            (
                Some(list_id),
                Some(email_address),
                Some(email_type),
                Some(vip),
                Some(timestamp_signup),
            ) => Ok(Self {
                member_id,
                list_id,
                mailchimp_id,
                email_address,
                email_type,
                status: data.status,
                language: data.language,
                vip,
                ip_signup: data.ip_signup,
                timestamp_signup,
                ip_opt: data.ip_opt,
                timestamp_opt: data.timestamp_opt,
                tags: data.tags,
                interests: data.interests,
                merge_fields: data.merge_fields,
                location: data.location,
                marketing_permissions: data.marketing_permissions,
                created_at,
            }),
            _ => Err(violations),
        }
    }

    /// Apply the supplied fields of `patch` on top of this record; omitted
    /// fields keep their current values. Returns a new, re-validated record
    /// and leaves `self` untouched, so a caller can still compare against
    /// (or re-persist) the original on a failed remote write. An empty patch
    /// merges to an identical record.
    pub fn merge(
        &self,
        patch: MemberData,
    ) -> Result<Self, FieldViolations> {
        let data = MemberData {
            list_id: patch.list_id.or_else(|| Some(self.list_id.clone())),
            email_address: patch
                .email_address
                .or_else(|| Some(self.email_address.as_ref().to_owned())),
            email_type: patch.email_type.or_else(|| Some(self.email_type.clone())),
            status: patch.status.or_else(|| self.status.clone()),
            language: patch.language.or_else(|| self.language.clone()),
            vip: patch.vip.or(Some(self.vip)),
            ip_signup: patch.ip_signup.or_else(|| self.ip_signup.clone()),
            timestamp_signup: patch
                .timestamp_signup
                .or_else(|| Some(self.timestamp_signup.clone())),
            ip_opt: patch.ip_opt.or_else(|| self.ip_opt.clone()),
            timestamp_opt: patch.timestamp_opt.or_else(|| self.timestamp_opt.clone()),
            tags: patch.tags.or_else(|| self.tags.clone()),
            interests: patch.interests.or_else(|| self.interests.clone()),
            merge_fields: patch.merge_fields.or_else(|| self.merge_fields.clone()),
            location: patch.location.or_else(|| self.location.clone()),
            marketing_permissions: patch
                .marketing_permissions
                .or_else(|| self.marketing_permissions.clone()),
        };
        Self::build(self.member_id, self.mailchimp_id.clone(), self.created_at, data)
    }

    /// Record the id MailChimp assigned. The id is written at most once; a
    /// record that already carries one is returned unchanged.
    pub fn with_mailchimp_id(
        mut self,
        id: String,
    ) -> Self {
        self.mailchimp_id.get_or_insert(id);
        self
    }

    /// The field map sent to MailChimp: every attribute except local
    /// bookkeeping (`member_id`, `mailchimp_id`, `created_at`). `list_id`
    /// travels in the request path rather than the body.
    pub fn mailchimp_payload(&self) -> MailchimpPayload<'_> {
        MailchimpPayload {
            email_address: self.email_address.as_ref(),
            email_type: &self.email_type,
            status: self.status.as_deref(),
            language: self.language.as_deref(),
            vip: self.vip,
            ip_signup: self.ip_signup.as_deref(),
            timestamp_signup: &self.timestamp_signup,
            ip_opt: self.ip_opt.as_deref(),
            timestamp_opt: self.timestamp_opt.as_deref(),
            tags: self.tags.as_ref(),
            interests: self.interests.as_ref(),
            merge_fields: self.merge_fields.as_ref(),
            location: self.location.as_ref(),
            marketing_permissions: self.marketing_permissions.as_deref(),
        }
    }
}

/// See [`Member::mailchimp_payload`].
#[derive(Debug, Serialize)]
pub struct MailchimpPayload<'a> {
    email_address: &'a str,
    email_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    vip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_signup: Option<&'a str>,
    timestamp_signup: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_opt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp_opt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interests: Option<&'a BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_fields: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marketing_permissions: Option<&'a [MarketingPermission]>,
}
