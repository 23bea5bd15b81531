use actix_web::{HttpResponse, web};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::ApiError;
use crate::domain::{EventDraft, EventPayload};

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub eventdatetime: DateTime<Utc>,
    pub address: String,
    pub price: Decimal,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Registrations of this event that are not cancelled.
    pub registrations_count: i64,
}

impl From<Event> for EventPayload {
    fn from(event: Event) -> Self {
        Self {
            title: Some(event.title.into()),
            description: Some(event.description.into()),
            eventdatetime: Some(event.eventdatetime.into()),
            address: Some(event.address.into()),
            price: Some(event.price.into()),
            cancelled: Some(event.cancelled.into()),
        }
    }
}

const SELECT_EVENTS: &str = r#"
    SELECT e.id, e.title, e.description, e.eventdatetime, e.address, e.price, e.cancelled,
           e.created_at, e.updated_at,
           (SELECT COUNT(*) FROM register r WHERE r.event_id = e.id AND NOT r.cancelled)
               AS registrations_count
    FROM event e"#;

#[tracing::instrument(name = "List events", skip(pool))]
pub async fn list_events(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let events = get_events(&pool).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[tracing::instrument(name = "Retrieve an event", skip(pool))]
pub async fn retrieve_event(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let event = get_event(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(event))
}

#[tracing::instrument(
    name = "Create an event",
    skip(payload, pool),
    fields(event_id = tracing::field::Empty)
)]
pub async fn create_event(
    payload: web::Json<EventPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let draft = payload.into_inner().into_new()?;
    let event = insert_event(&pool, &draft).await?;
    tracing::Span::current().record("event_id", tracing::field::display(event.id));
    Ok(HttpResponse::Created().json(event))
}

#[tracing::instrument(name = "Update an event", skip(payload, pool))]
pub async fn update_event(
    path: web::Path<i64>,
    payload: web::Json<EventPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    apply_update(&pool, path.into_inner(), payload.into_inner(), false).await
}

#[tracing::instrument(name = "Partially update an event", skip(payload, pool))]
pub async fn partial_update_event(
    path: web::Path<i64>,
    payload: web::Json<EventPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    apply_update(&pool, path.into_inner(), payload.into_inner(), true).await
}

async fn apply_update(
    pool: &PgPool,
    event_id: i64,
    payload: EventPayload,
    partial: bool,
) -> Result<HttpResponse, ApiError> {
    let current = get_event(pool, event_id).await?.ok_or(ApiError::NotFound)?;
    let draft = payload.into_update(current.into(), partial)?;
    if !store_event(pool, event_id, &draft).await? {
        return Err(ApiError::NotFound);
    }
    let event = get_event(pool, event_id).await?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(event))
}

#[tracing::instrument(name = "Delete an event", skip(pool))]
pub async fn delete_event(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    if delete_event_with_registrations(&pool, path.into_inner()).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::NotFound)
    }
}

#[tracing::instrument(name = "Get events from the database", skip(pool))]
async fn get_events(pool: &PgPool) -> Result<Vec<Event>, anyhow::Error> {
    let query = format!("{SELECT_EVENTS} ORDER BY e.eventdatetime, e.id");
    sqlx::query_as::<_, Event>(&query)
        .fetch_all(pool)
        .await
        .context("Failed to fetch events")
}

#[tracing::instrument(name = "Get an event from the database", skip(pool))]
pub async fn get_event(pool: &PgPool, event_id: i64) -> Result<Option<Event>, anyhow::Error> {
    let query = format!("{SELECT_EVENTS} WHERE e.id = $1");
    sqlx::query_as::<_, Event>(&query)
        .bind(event_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch an event")
}

#[tracing::instrument(name = "Save new event to database", skip(pool, draft))]
async fn insert_event(pool: &PgPool, draft: &EventDraft) -> Result<Event, anyhow::Error> {
    sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO event (title, description, eventdatetime, address, price, cancelled)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, description, eventdatetime, address, price, cancelled,
                  created_at, updated_at, 0::BIGINT AS registrations_count
        "#,
    )
    .bind(draft.title.as_ref())
    .bind(&draft.description)
    .bind(draft.eventdatetime)
    .bind(&draft.address)
    .bind(draft.price)
    .bind(draft.cancelled)
    .fetch_one(pool)
    .await
    .context("Failed to insert a new event")
}

/// Returns `false` when the event no longer exists.
#[tracing::instrument(name = "Save event changes to database", skip(pool, draft))]
async fn store_event(
    pool: &PgPool,
    event_id: i64,
    draft: &EventDraft,
) -> Result<bool, anyhow::Error> {
    let result = sqlx::query(
        r#"
        UPDATE event
        SET title = $2, description = $3, eventdatetime = $4, address = $5, price = $6,
            cancelled = $7, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .bind(draft.title.as_ref())
    .bind(&draft.description)
    .bind(draft.eventdatetime)
    .bind(&draft.address)
    .bind(draft.price)
    .bind(draft.cancelled)
    .execute(pool)
    .await
    .context("Failed to update an event")?;
    Ok(result.rows_affected() > 0)
}

/// Removes the event's registrations, then the event, in one transaction.
/// Returns `false` (and changes nothing) when the event does not exist.
#[tracing::instrument(name = "Delete event and its registrations", skip(pool))]
async fn delete_event_with_registrations(
    pool: &PgPool,
    event_id: i64,
) -> Result<bool, anyhow::Error> {
    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;

    let registrations = sqlx::query("DELETE FROM register WHERE event_id = $1")
        .bind(event_id)
        .execute(&mut *transaction)
        .await
        .context("Failed to delete the registrations of an event")?;
    let event = sqlx::query("DELETE FROM event WHERE id = $1")
        .bind(event_id)
        .execute(&mut *transaction)
        .await
        .context("Failed to delete an event")?;

    if event.rows_affected() == 0 {
        return Ok(false);
    }
    transaction
        .commit()
        .await
        .context("Failed to commit the event deletion")?;
    tracing::info!(
        registrations_deleted = registrations.rows_affected(),
        "Deleted event"
    );
    Ok(true)
}
