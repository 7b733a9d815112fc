use validator::validate_email;

/// A validated member email address, 7 to 50 characters long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEmail(String);

impl MemberEmail {
    pub fn parse(s: String) -> Result<MemberEmail, String> {
        if s.len() < 7 || s.len() > 50 {
            return Err(format!("{} must be 7 to 50 characters long.", s));
        }
        if validate_email(&s) {
            Ok(Self(s))
        } else {
            Err(format!("{} is not a valid member email.", s))
        }
    }
}

impl AsRef<str> for MemberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
