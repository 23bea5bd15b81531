use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::lenient::{INVALID_BOOLEAN, INVALID_DATETIME, INVALID_NUMBER, INVALID_STRING};
use super::{BoundedText, FieldErrors, Lenient};

pub const TITLE_MAX_LENGTH: usize = 200;
const PRICE_MAX_DIGITS: u32 = 10;
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_MAX_WHOLE_DIGITS: u32 = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;

/// Event fields as they arrive over the wire; read-only keys are ignored.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EventPayload {
    pub title: Option<Lenient<String>>,
    pub description: Option<Lenient<String>>,
    pub eventdatetime: Option<Lenient<DateTime<Utc>>>,
    pub address: Option<Lenient<String>>,
    pub price: Option<Lenient<Decimal>>,
    pub cancelled: Option<Lenient<bool>>,
}

/// A complete, validated set of writable event fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: BoundedText,
    pub description: String,
    pub eventdatetime: DateTime<Utc>,
    pub address: String,
    pub price: Decimal,
    pub cancelled: bool,
}

impl EventPayload {
    pub fn into_new(self) -> Result<EventDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = match self.title {
            Some(title) => errors.check(
                "title",
                title
                    .valid_or(INVALID_STRING)
                    .and_then(|title| BoundedText::parse(title, TITLE_MAX_LENGTH)),
            ),
            None => errors.require("title", None),
        };
        let description = self.description.and_then(|description| {
            errors.check(
                "description",
                description.valid_or(INVALID_STRING).map(BoundedText::optional),
            )
        });
        let eventdatetime = match self.eventdatetime {
            Some(eventdatetime) => {
                errors.check("eventdatetime", eventdatetime.valid_or(INVALID_DATETIME))
            }
            None => errors.require("eventdatetime", None),
        };
        let address = self.address.and_then(|address| {
            errors.check(
                "address",
                address.valid_or(INVALID_STRING).map(BoundedText::optional),
            )
        });
        let price = match self.price {
            Some(price) => errors.check(
                "price",
                price.valid_or(INVALID_NUMBER).and_then(parse_price),
            ),
            None => errors.require("price", None),
        };
        let cancelled = self
            .cancelled
            .and_then(|cancelled| errors.check("cancelled", cancelled.valid_or(INVALID_BOOLEAN)));

        match (title, eventdatetime, price) {
            (Some(title), Some(eventdatetime), Some(price)) if errors.is_empty() => {
                Ok(EventDraft {
                    title,
                    description: description.unwrap_or_default(),
                    eventdatetime,
                    address: address.unwrap_or_default(),
                    price,
                    cancelled: cancelled.unwrap_or(false),
                })
            }
            _ => Err(errors),
        }
    }

    /// Validate against the stored event. A full update still needs every required
    /// field; a partial one takes whatever is absent from `current`.
    pub fn into_update(
        self,
        current: EventPayload,
        partial: bool,
    ) -> Result<EventDraft, FieldErrors> {
        let current = if partial {
            current
        } else {
            EventPayload {
                title: None,
                eventdatetime: None,
                price: None,
                ..current
            }
        };
        self.or(current).into_new()
    }

    fn or(self, fallback: EventPayload) -> Self {
        EventPayload {
            title: self.title.or(fallback.title),
            description: self.description.or(fallback.description),
            eventdatetime: self.eventdatetime.or(fallback.eventdatetime),
            address: self.address.or(fallback.address),
            price: self.price.or(fallback.price),
            cancelled: self.cancelled.or(fallback.cancelled),
        }
    }
}

/// Prices are stored as NUMERIC(10, 2); sign is not checked.
fn parse_price(price: Decimal) -> Result<Decimal, String> {
    let mut price = price.normalize();
    let decimal_places = price.scale();
    let whole = price.abs().trunc();
    let whole_digits = if whole.is_zero() {
        0
    } else {
        whole.to_string().len() as u32
    };

    if whole_digits + decimal_places > PRICE_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ));
    }
    if decimal_places > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    if whole_digits > PRICE_MAX_WHOLE_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_WHOLE_DIGITS} digits before the \
             decimal point."
        ));
    }
    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}
