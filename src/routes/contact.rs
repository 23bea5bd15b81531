use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};

use crate::domain::{ContactForm, ContactMessage, EmailAddress, FieldErrors};
use crate::email_client::EmailClient;
use crate::util::error_chain_fmt;

/// Mailbox that receives contact form submissions.
pub struct ContactRecipient(pub EmailAddress);

#[derive(thiserror::Error)]
pub enum ContactError {
    #[error("Invalid contact form: {0}")]
    ValidationError(FieldErrors),
    #[error("Failed to send the contact form email")]
    SendEmailError(#[source] reqwest::Error),
}

impl std::fmt::Debug for ContactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ContactError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::SendEmailError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::ValidationError(errors) => HttpResponse::BadRequest().json(errors),
            Self::SendEmailError(_) => HttpResponse::InternalServerError().json(
                serde_json::json!({ "error": "Failed to send email. Please try again later." }),
            ),
        }
    }
}

#[tracing::instrument(
    name = "Relay a contact form message",
    skip(form, email_client, recipient),
    fields(sender_email = tracing::field::Empty)
)]
pub async fn contact(
    form: web::Json<ContactForm>,
    email_client: web::Data<EmailClient>,
    recipient: web::Data<ContactRecipient>,
) -> Result<HttpResponse, ContactError> {
    let message =
        ContactMessage::try_from(form.into_inner()).map_err(ContactError::ValidationError)?;
    tracing::Span::current().record("sender_email", tracing::field::display(&message.email));

    email_client
        .send_email(&recipient.0, &message.subject(), &message.body())
        .await
        .map_err(ContactError::SendEmailError)?;

    Ok(HttpResponse::Ok()
        .json(serde_json::json!({ "message": "Your message has been sent successfully!" })))
}
