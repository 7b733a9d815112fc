use secrecy::{ExposeSecret, Secret};

/// A candidate password, 8 to 15 characters. Held behind `Secret` so it never
/// shows up in logs or debug output.
#[derive(Clone, Debug)]
pub struct NewPassword(Secret<String>);

impl NewPassword {
    pub fn parse(s: Secret<String>) -> Result<NewPassword, String> {
        let length = s.expose_secret().chars().count();
        if !(8..=15).contains(&length) {
            return Err("password must be 8 to 15 characters long.".into());
        }
        Ok(Self(s))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}
