use actix_web::{HttpResponse, web};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ApiError;
use crate::domain::{EmailAddress, FieldErrors, SubscriberDraft, SubscriberPayload};

const ALREADY_SUBSCRIBED: &str = "This email is already subscribed.";

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub opted_out: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Subscriber> for SubscriberPayload {
    fn from(subscriber: Subscriber) -> Self {
        Self {
            name: Some(subscriber.name.into()),
            email: Some(subscriber.email.into()),
            opted_out: Some(subscriber.opted_out.into()),
        }
    }
}

fn already_subscribed() -> ApiError {
    ApiError::ValidationError(FieldErrors::single("email", ALREADY_SUBSCRIBED))
}

/// The partial unique index on active emails backs the duplicate check under concurrency.
fn map_write_error(e: sqlx::Error, context: &'static str) -> ApiError {
    if let sqlx::Error::Database(db_error) = &e {
        if db_error.is_unique_violation() {
            return already_subscribed();
        }
    }
    ApiError::UnexpectedError(anyhow::Error::new(e).context(context))
}

#[tracing::instrument(name = "List active subscribers", skip(pool))]
pub async fn list_subscribers(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let subscribers = sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT id, name, email, opted_out, created_at, updated_at
        FROM subscriber
        WHERE NOT opted_out
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .context("Failed to fetch subscribers")?;
    Ok(HttpResponse::Ok().json(subscribers))
}

#[tracing::instrument(name = "Retrieve a subscriber", skip(pool))]
pub async fn retrieve_subscriber(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let subscriber = get_active_subscriber(&pool, path.into_inner())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(subscriber))
}

#[tracing::instrument(
    name = "Add a new subscriber",
    skip(payload, pool),
    fields(subscriber_email = tracing::field::Empty, subscriber_id = tracing::field::Empty)
)]
pub async fn create_subscriber(
    payload: web::Json<SubscriberPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let draft = payload.into_inner().into_new()?;
    tracing::Span::current().record("subscriber_email", tracing::field::display(&draft.email));

    if is_actively_subscribed(&pool, &draft.email).await? {
        return Err(already_subscribed());
    }
    let subscriber = insert_subscriber(&pool, &draft).await?;
    tracing::Span::current().record("subscriber_id", tracing::field::display(subscriber.id));
    Ok(HttpResponse::Created().json(subscriber))
}

#[tracing::instrument(name = "Update a subscriber", skip(payload, pool))]
pub async fn update_subscriber(
    path: web::Path<i64>,
    payload: web::Json<SubscriberPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    apply_update(&pool, path.into_inner(), payload.into_inner(), false).await
}

#[tracing::instrument(name = "Partially update a subscriber", skip(payload, pool))]
pub async fn partial_update_subscriber(
    path: web::Path<i64>,
    payload: web::Json<SubscriberPayload>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    apply_update(&pool, path.into_inner(), payload.into_inner(), true).await
}

async fn apply_update(
    pool: &PgPool,
    subscriber_id: i64,
    payload: SubscriberPayload,
    partial: bool,
) -> Result<HttpResponse, ApiError> {
    let current = get_active_subscriber(pool, subscriber_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let draft = payload.into_update(current.into(), partial)?;
    let subscriber = store_subscriber(pool, subscriber_id, &draft)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(subscriber))
}

/// DELETE never removes the row: the subscriber is opted out instead.
#[tracing::instrument(name = "Opt out a subscriber", skip(pool))]
pub async fn delete_subscriber(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    if deactivate_subscriber(&pool, path.into_inner()).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::NotFound)
    }
}

/// Sets `opted_out`; returns `false` when no active subscriber has this id.
#[tracing::instrument(name = "Deactivate subscriber", skip(pool))]
pub async fn deactivate_subscriber(
    pool: &PgPool,
    subscriber_id: i64,
) -> Result<bool, anyhow::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subscriber
        SET opted_out = TRUE, updated_at = now()
        WHERE id = $1 AND NOT opted_out
        "#,
    )
    .bind(subscriber_id)
    .execute(pool)
    .await
    .context("Failed to opt out a subscriber")?;
    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(name = "Get an active subscriber from the database", skip(pool))]
async fn get_active_subscriber(
    pool: &PgPool,
    subscriber_id: i64,
) -> Result<Option<Subscriber>, anyhow::Error> {
    sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT id, name, email, opted_out, created_at, updated_at
        FROM subscriber
        WHERE id = $1 AND NOT opted_out
        "#,
    )
    .bind(subscriber_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch a subscriber")
}

#[tracing::instrument(name = "Check for an active subscription", skip(pool))]
async fn is_actively_subscribed(
    pool: &PgPool,
    email: &EmailAddress,
) -> Result<bool, anyhow::Error> {
    let (exists,) = sqlx::query_as::<_, (bool,)>(
        "SELECT EXISTS(SELECT 1 FROM subscriber WHERE email = $1 AND NOT opted_out)",
    )
    .bind(email.as_ref())
    .fetch_one(pool)
    .await
    .context("Failed to look up existing subscriptions")?;
    Ok(exists)
}

#[tracing::instrument(name = "Save new subscriber to database", skip(pool, draft))]
async fn insert_subscriber(pool: &PgPool, draft: &SubscriberDraft) -> Result<Subscriber, ApiError> {
    sqlx::query_as::<_, Subscriber>(
        r#"
        INSERT INTO subscriber (name, email, opted_out)
        VALUES ($1, $2, $3)
        RETURNING id, name, email, opted_out, created_at, updated_at
        "#,
    )
    .bind(draft.name.as_ref())
    .bind(draft.email.as_ref())
    .bind(draft.opted_out)
    .fetch_one(pool)
    .await
    .map_err(|e| map_write_error(e, "Failed to insert a new subscriber"))
}

#[tracing::instrument(name = "Save subscriber changes to database", skip(pool, draft))]
async fn store_subscriber(
    pool: &PgPool,
    subscriber_id: i64,
    draft: &SubscriberDraft,
) -> Result<Option<Subscriber>, ApiError> {
    sqlx::query_as::<_, Subscriber>(
        r#"
        UPDATE subscriber
        SET name = $2, email = $3, opted_out = $4, updated_at = now()
        WHERE id = $1 AND NOT opted_out
        RETURNING id, name, email, opted_out, created_at, updated_at
        "#,
    )
    .bind(subscriber_id)
    .bind(draft.name.as_ref())
    .bind(draft.email.as_ref())
    .bind(draft.opted_out)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_write_error(e, "Failed to update a subscriber"))
}
