use unicode_segmentation::UnicodeSegmentation;

/// A member's real name, 2 to 50 graphemes with no forbidden characters.
#[derive(Debug, Clone)]
pub struct MemberName(String);

impl MemberName {
    pub fn parse(s: String) -> Result<MemberName, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let length = s.graphemes(true).count();
        let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
        let contains_forbidden_characters =
            s.chars().any(|c| forbidden_characters.contains(&c));

        if is_empty_or_whitespace || length < 2 || length > 50 || contains_forbidden_characters {
            Err(format!("{} is not a valid member name.", s))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for MemberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
