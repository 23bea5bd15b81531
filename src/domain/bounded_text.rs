use unicode_segmentation::UnicodeSegmentation;

use super::field_errors::BLANK;

/// Non-blank text, trimmed, of at most `max_length` graphemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedText(String);

impl AsRef<str> for BoundedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl BoundedText {
    pub fn parse(text: impl AsRef<str>, max_length: usize) -> Result<Self, String> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(BLANK.to_string());
        }
        if text.graphemes(true).count() > max_length {
            return Err(format!(
                "Ensure this field has no more than {max_length} characters."
            ));
        }
        Ok(Self(text.to_string()))
    }

    /// Like `parse`, without a length bound.
    pub fn non_blank(text: impl AsRef<str>) -> Result<String, String> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            Err(BLANK.to_string())
        } else {
            Ok(text.to_string())
        }
    }

    /// Free text without a length bound; blank is allowed.
    pub fn optional(text: impl AsRef<str>) -> String {
        text.as_ref().trim().to_string()
    }
}
