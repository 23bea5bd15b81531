use super::lenient::{INVALID_BOOLEAN, INVALID_STRING};
use super::{BoundedText, EmailAddress, FieldErrors, Lenient};

pub const NAME_MAX_LENGTH: usize = 200;

#[derive(Debug, Default, serde::Deserialize)]
pub struct SubscriberPayload {
    pub name: Option<Lenient<String>>,
    pub email: Option<Lenient<String>>,
    pub opted_out: Option<Lenient<bool>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberDraft {
    pub name: BoundedText,
    pub email: EmailAddress,
    pub opted_out: bool,
}

impl SubscriberPayload {
    pub fn into_new(self) -> Result<SubscriberDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = match self.name {
            Some(name) => errors.check(
                "name",
                name.valid_or(INVALID_STRING)
                    .and_then(|name| BoundedText::parse(name, NAME_MAX_LENGTH)),
            ),
            None => errors.require("name", None),
        };
        let email = match self.email {
            Some(email) => errors.check(
                "email",
                email.valid_or(INVALID_STRING).and_then(EmailAddress::parse),
            ),
            None => errors.require("email", None),
        };
        let opted_out = self
            .opted_out
            .and_then(|opted_out| errors.check("opted_out", opted_out.valid_or(INVALID_BOOLEAN)));

        match (name, email) {
            (Some(name), Some(email)) if errors.is_empty() => Ok(SubscriberDraft {
                name,
                email,
                opted_out: opted_out.unwrap_or(false),
            }),
            _ => Err(errors),
        }
    }

    pub fn into_update(
        self,
        current: SubscriberPayload,
        partial: bool,
    ) -> Result<SubscriberDraft, FieldErrors> {
        let current = if partial {
            current
        } else {
            SubscriberPayload {
                name: None,
                email: None,
                ..current
            }
        };
        SubscriberPayload {
            name: self.name.or(current.name),
            email: self.email.or(current.email),
            opted_out: self.opted_out.or(current.opted_out),
        }
        .into_new()
    }
}
