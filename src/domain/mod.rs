mod member;
mod member_email;

// allow external `use` statements to skip `member` etc
pub use member::FieldViolations;
pub use member::Location;
pub use member::MailchimpPayload;
pub use member::MarketingPermission;
pub use member::Member;
pub use member::MemberData;
pub use member_email::MemberEmail;
