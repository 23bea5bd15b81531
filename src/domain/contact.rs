use super::lenient::INVALID_STRING;
use super::{BoundedText, EmailAddress, FieldErrors, Lenient};

pub const NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Default, serde::Deserialize)]
pub struct ContactForm {
    pub name: Option<Lenient<String>>,
    pub email: Option<Lenient<String>>,
    pub message: Option<Lenient<String>>,
}

/// A contact form submission that passed validation and is ready to relay.
#[derive(Debug)]
pub struct ContactMessage {
    pub name: BoundedText,
    pub email: EmailAddress,
    pub message: String,
}

impl TryFrom<ContactForm> for ContactMessage {
    type Error = FieldErrors;

    fn try_from(form: ContactForm) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::new();
        let name = match form.name {
            Some(name) => errors.check(
                "name",
                name.valid_or(INVALID_STRING)
                    .and_then(|name| BoundedText::parse(name, NAME_MAX_LENGTH)),
            ),
            None => errors.require("name", None),
        };
        let email = match form.email {
            Some(email) => errors.check(
                "email",
                email.valid_or(INVALID_STRING).and_then(EmailAddress::parse),
            ),
            None => errors.require("email", None),
        };
        let message = match form.message {
            Some(message) => errors.check(
                "message",
                message.valid_or(INVALID_STRING).and_then(BoundedText::non_blank),
            ),
            None => errors.require("message", None),
        };

        match (name, email, message) {
            (Some(name), Some(email), Some(message)) => Ok(Self {
                name,
                email,
                message,
            }),
            _ => Err(errors),
        }
    }
}

impl ContactMessage {
    pub fn subject(&self) -> String {
        format!("Contact Form Message from {}", self.name.as_ref())
    }

    pub fn body(&self) -> String {
        format!(
            "From: {}\nEmail: {}\n\nMessage:\n{}",
            self.name.as_ref(),
            self.email,
            self.message
        )
    }
}
