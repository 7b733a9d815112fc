use unicode_segmentation::UnicodeSegmentation;

/// A unique display nickname, 2 to 30 graphemes.
#[derive(Debug, Clone)]
pub struct Nickname(String);

impl Nickname {
    pub fn parse(s: String) -> Result<Nickname, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let length = s.graphemes(true).count();
        let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
        let contains_forbidden_characters =
            s.chars().any(|c| forbidden_characters.contains(&c));

        if is_empty_or_whitespace || length < 2 || length > 30 || contains_forbidden_characters {
            Err(format!("{} is not a valid nickname.", s))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for Nickname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
