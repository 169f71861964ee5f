use serde::Serialize;
use validator::ValidateEmail;

/// Email address of a list member. `parse` is the only way to construct one,
/// so any `MemberEmail` held by the rest of the crate is syntactically valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberEmail(String);

impl MemberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        ValidateEmail::validate_email(&email)
            .then_some(Self(email.clone()))
            .ok_or(format!("{email:?} is not a valid email address"))
    }
}

impl AsRef<str> for MemberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for MemberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}
