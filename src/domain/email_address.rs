use validator::ValidateEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl EmailAddress {
    pub fn parse(email: impl AsRef<str>) -> Result<Self, String> {
        let email = email.as_ref().trim().to_string();
        if email.is_empty() {
            return Err(super::field_errors::BLANK.to_string());
        }
        if !ValidateEmail::validate_email(&email) {
            return Err("Enter a valid email address.".to_string());
        }
        Ok(Self(email))
    }
}
