use chrono::{DateTime, Utc};

use super::lenient::{INVALID_BOOLEAN, INVALID_DATETIME, INVALID_STRING, json_type_name};
use super::{EmailAddress, FieldErrors, Lenient, deserialize_some};

#[derive(Debug, Default, serde::Deserialize)]
pub struct RegistrationPayload {
    pub date_registered: Option<Lenient<DateTime<Utc>>>,
    pub cancelled: Option<Lenient<bool>>,
    pub email: Option<Lenient<String>>,
    /// `null` detaches the registration from its event.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub event: Option<Option<Lenient<i64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationDraft {
    pub date_registered: DateTime<Utc>,
    pub cancelled: bool,
    pub email: EmailAddress,
    /// Requested event; it may not exist.
    pub event_id: Option<i64>,
}

fn incorrect_event_type(raw: &serde_json::Value) -> String {
    format!(
        "Incorrect type. Expected pk value, received {}.",
        json_type_name(raw)
    )
}

impl RegistrationPayload {
    pub fn into_new(self) -> Result<RegistrationDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let date_registered = self.date_registered.and_then(|date_registered| {
            errors.check(
                "date_registered",
                date_registered.valid_or(INVALID_DATETIME),
            )
        });
        let cancelled = self
            .cancelled
            .and_then(|cancelled| errors.check("cancelled", cancelled.valid_or(INVALID_BOOLEAN)));
        let email = match self.email {
            Some(email) => errors.check(
                "email",
                email.valid_or(INVALID_STRING).and_then(EmailAddress::parse),
            ),
            None => errors.require("email", None),
        };
        let event_id = self
            .event
            .flatten()
            .and_then(|event| errors.check("event", event.valid_or_else(incorrect_event_type)));

        match email {
            Some(email) if errors.is_empty() => Ok(RegistrationDraft {
                date_registered: date_registered.unwrap_or_else(Utc::now),
                cancelled: cancelled.unwrap_or(false),
                email,
                event_id,
            }),
            _ => Err(errors),
        }
    }

    /// A full update still needs `email`; everything else falls back to `current`.
    pub fn into_update(
        self,
        current: RegistrationPayload,
        partial: bool,
    ) -> Result<RegistrationDraft, FieldErrors> {
        let current = if partial {
            current
        } else {
            RegistrationPayload {
                email: None,
                ..current
            }
        };
        RegistrationPayload {
            date_registered: self.date_registered.or(current.date_registered),
            cancelled: self.cancelled.or(current.cancelled),
            email: self.email.or(current.email),
            event: self.event.or(current.event),
        }
        .into_new()
    }
}
