mod bounded_text;
mod contact;
mod email_address;
mod event;
mod field_errors;
mod lenient;
mod registration;
mod subscriber;

pub use bounded_text::BoundedText;
pub use contact::{ContactForm, ContactMessage};
pub use email_address::EmailAddress;
pub use event::{EventDraft, EventPayload};
pub use field_errors::FieldErrors;
pub use lenient::Lenient;
pub use registration::{RegistrationDraft, RegistrationPayload};
pub use subscriber::{SubscriberDraft, SubscriberPayload};

/// Lets a payload tell an explicit `null` apart from an absent key: absent stays
/// `None` through `#[serde(default)]`, `null` becomes `Some(None)`.
pub(crate) fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
