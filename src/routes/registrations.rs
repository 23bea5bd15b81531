use actix_web::{HttpResponse, web};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ApiError;
use crate::domain::{Lenient, RegistrationDraft, RegistrationPayload};

/// Shown as `event_title` for registrations without an event.
pub const NO_EVENT_TITLE: &str = "No Event";

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Registration {
    pub id: i64,
    pub date_registered: DateTime<Utc>,
    pub cancelled: bool,
    pub email: String,
    pub event: Option<i64>,
    #[serde(serialize_with = "event_title_or_sentinel")]
    pub event_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn event_title_or_sentinel<S>(title: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(title.as_deref().unwrap_or(NO_EVENT_TITLE))
}

impl From<Registration> for RegistrationPayload {
    fn from(registration: Registration) -> Self {
        Self {
            date_registered: Some(registration.date_registered.into()),
            cancelled: Some(registration.cancelled.into()),
            email: Some(registration.email.into()),
            event: Some(registration.event.map(Lenient::from)),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct RegistrationFilter {
    event: Option<i64>,
}

const SELECT_REGISTRATIONS: &str = r#"
    SELECT r.id, r.date_registered, r.cancelled, r.email, r.event_id AS event,
           e.title AS event_title, r.created_at, r.updated_at
    FROM register r
    LEFT JOIN event e ON e.id = r.event_id"#;

#[tracing::instrument(name = "List registrations", skip(pool))]
pub async fn list_registrations(
    filter: web::Query<RegistrationFilter>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let registrations = get_registrations(&pool, filter.event).await?;
    Ok(HttpResponse::Ok().json(registrations))
}

#[tracing::instrument(name = "Retrieve a registration", skip(pool))]
pub async fn retrieve_registration(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let registration = get_registration(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(registration))
}

#[tracing::instrument(
    name = "Register for an event",
    skip(payload, pool),
    fields(registration_id = tracing::field::Empty)
)]
pub async fn create_registration(
    payload: web::Json<RegistrationPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let draft = payload.into_inner().into_new()?;
    let (registration_id, event_id) = insert_registration(&pool, &draft).await?;
    tracing::Span::current().record("registration_id", tracing::field::display(registration_id));
    warn_if_event_dropped(&draft, event_id);

    let registration = get_registration(&pool, registration_id)
        .await?
        .context("A newly created registration could not be read back")?;
    Ok(HttpResponse::Created().json(registration))
}

#[tracing::instrument(name = "Update a registration", skip(payload, pool))]
pub async fn update_registration(
    path: web::Path<i64>,
    payload: web::Json<RegistrationPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    apply_update(&pool, path.into_inner(), payload.into_inner(), false).await
}

#[tracing::instrument(name = "Partially update a registration", skip(payload, pool))]
pub async fn partial_update_registration(
    path: web::Path<i64>,
    payload: web::Json<RegistrationPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    apply_update(&pool, path.into_inner(), payload.into_inner(), true).await
}

async fn apply_update(
    pool: &PgPool,
    registration_id: i64,
    payload: RegistrationPayload,
    partial: bool,
) -> Result<HttpResponse, ApiError> {
    let current = get_registration(pool, registration_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let draft = payload.into_update(current.into(), partial)?;
    let event_id = store_registration(pool, registration_id, &draft)
        .await?
        .ok_or(ApiError::NotFound)?;
    warn_if_event_dropped(&draft, event_id);

    let registration = get_registration(pool, registration_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(registration))
}

#[tracing::instrument(name = "Delete a registration", skip(pool))]
pub async fn delete_registration(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query("DELETE FROM register WHERE id = $1")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await
        .context("Failed to delete a registration")?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::NoContent().finish())
}

/// An event reference that does not resolve is stored as no reference at all.
fn warn_if_event_dropped(draft: &RegistrationDraft, stored_event_id: Option<i64>) {
    if let (Some(requested), None) = (draft.event_id, stored_event_id) {
        tracing::warn!(
            requested_event_id = requested,
            "Unknown event; registration stored without an event"
        );
    }
}

#[tracing::instrument(name = "Get registrations from the database", skip(pool))]
async fn get_registrations(
    pool: &PgPool,
    event_id: Option<i64>,
) -> Result<Vec<Registration>, anyhow::Error> {
    let query = format!(
        "{SELECT_REGISTRATIONS} WHERE ($1::BIGINT IS NULL OR r.event_id = $1) ORDER BY r.id"
    );
    sqlx::query_as::<_, Registration>(&query)
        .bind(event_id)
        .fetch_all(pool)
        .await
        .context("Failed to fetch registrations")
}

#[tracing::instrument(name = "Get a registration from the database", skip(pool))]
async fn get_registration(
    pool: &PgPool,
    registration_id: i64,
) -> Result<Option<Registration>, anyhow::Error> {
    let query = format!("{SELECT_REGISTRATIONS} WHERE r.id = $1");
    sqlx::query_as::<_, Registration>(&query)
        .bind(registration_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch a registration")
}

/// Returns the new id and the event reference that was actually stored.
#[tracing::instrument(name = "Save new registration to database", skip(pool, draft))]
async fn insert_registration(
    pool: &PgPool,
    draft: &RegistrationDraft,
) -> Result<(i64, Option<i64>), anyhow::Error> {
    sqlx::query_as::<_, (i64, Option<i64>)>(
        r#"
        INSERT INTO register (date_registered, cancelled, email, event_id)
        VALUES ($1, $2, $3, (SELECT id FROM event WHERE id = $4))
        RETURNING id, event_id
        "#,
    )
    .bind(draft.date_registered)
    .bind(draft.cancelled)
    .bind(draft.email.as_ref())
    .bind(draft.event_id)
    .fetch_one(pool)
    .await
    .context("Failed to insert a new registration")
}

/// `None` when the registration no longer exists, otherwise the stored event reference.
#[tracing::instrument(name = "Save registration changes to database", skip(pool, draft))]
async fn store_registration(
    pool: &PgPool,
    registration_id: i64,
    draft: &RegistrationDraft,
) -> Result<Option<Option<i64>>, anyhow::Error> {
    let row = sqlx::query_as::<_, (Option<i64>,)>(
        r#"
        UPDATE register
        SET date_registered = $2, cancelled = $3, email = $4,
            event_id = (SELECT id FROM event WHERE id = $5), updated_at = now()
        WHERE id = $1
        RETURNING event_id
        "#,
    )
    .bind(registration_id)
    .bind(draft.date_registered)
    .bind(draft.cancelled)
    .bind(draft.email.as_ref())
    .bind(draft.event_id)
    .fetch_optional(pool)
    .await
    .context("Failed to update a registration")?;
    Ok(row.map(|(event_id,)| event_id))
}
