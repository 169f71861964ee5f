mod create;
mod remove;
mod show;
mod update;

pub use create::create_member;
pub use remove::remove_member;
pub use show::show_member;
pub use update::update_member;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde_json::json;
use uuid::Uuid;

use crate::domain::FieldViolations;

/// Everything a member operation can fail with. Which side effects have
/// already happened when a variant is returned is part of its contract; see
/// the variant docs.
#[derive(thiserror::Error)]
pub enum MemberError {
    /// Nothing was written, locally or remotely.
    #[error("Invalid data given")]
    Validation(FieldViolations),

    /// Nothing was written.
    #[error("Member[{0}] not found")]
    NotFound(Uuid),

    /// The record carries no MailChimp id (a failed create left it
    /// orphaned), so there is nothing on the remote side to address. Nothing
    /// was written.
    #[error("Member[{0}] has not been synchronized with MailChimp")]
    NotSynchronized(Uuid),

    #[error("database error")]
    Storage(#[from] sqlx::Error),

    /// MailChimp rejected the call or could not be reached. For a create the
    /// local record is kept with a NULL mailchimp_id (an orphan); for an
    /// update nothing was written locally.
    #[error("MailChimp request failed: {0}")]
    Remote(#[source] reqwest::Error),

    /// The local row was already deleted when the MailChimp delete failed.
    /// The id no longer resolves locally; retrying against it cannot work.
    #[error("Member[{member_id}] was removed locally, but the MailChimp delete failed: {source}")]
    RemoteAfterDelete {
        member_id: Uuid,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for MemberError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for MemberError {
    fn status_code(&self) -> StatusCode {
        match self {
            MemberError::Validation(_) => StatusCode::BAD_REQUEST,
            MemberError::NotFound(_) => StatusCode::NOT_FOUND,
            MemberError::NotSynchronized(_) => StatusCode::CONFLICT,
            MemberError::Storage(_) | MemberError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            MemberError::Remote(_) | MemberError::RemoteAfterDelete { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            MemberError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}
