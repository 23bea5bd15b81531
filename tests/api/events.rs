use crate::helpers::spawn_app;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

#[actix_web::test]
async fn create_event_returns_201_with_an_id_and_no_registrations() {
    let app = spawn_app().await;

    let event = app.create_event("Test Event").await;

    assert!(event["id"].as_i64().is_some());
    assert_eq!(event["title"], "Test Event");
    assert_eq!(event["price"], "99.99");
    assert_eq!(event["cancelled"], false);
    assert_eq!(event["registrations_count"], 0);
    assert_eq!(app.count_rows("event").await, 1);
}

#[actix_web::test]
async fn create_event_defaults_optional_fields() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/events/",
            &json!({
                "title": "Bare Event",
                "eventdatetime": (Utc::now() + Duration::days(1)).to_rfc3339(),
                "price": 10
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 201);
    let event: Value = response.json().await.unwrap();
    assert_eq!(event["description"], "");
    assert_eq!(event["address"], "");
    assert_eq!(event["price"], "10.00");
}

#[actix_web::test]
async fn create_event_without_required_fields_returns_400() {
    let app = spawn_app().await;

    let response = app
        .post("/events/", &json!({"description": "nothing else"}))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    for field in ["title", "eventdatetime", "price"] {
        assert_eq!(body[field][0], "This field is required.", "field {field}");
    }
    assert_eq!(app.count_rows("event").await, 0);
}

#[actix_web::test]
async fn list_events_is_ordered_by_date() {
    let app = spawn_app().await;
    for (title, days) in [("Later", 14), ("Sooner", 2)] {
        let response = app
            .post(
                "/events/",
                &json!({
                    "title": title,
                    "eventdatetime": (Utc::now() + Duration::days(days)).to_rfc3339(),
                    "price": "5.00"
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
    }

    let events: Vec<Value> = app.get("/events/").await.json().await.unwrap();

    let titles: Vec<_> = events
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Sooner", "Later"]);
}

#[actix_web::test]
async fn retrieve_event_returns_it() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;

    let response = app.get(&format!("/events/{}/", event["id"])).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Test Event");
}

#[actix_web::test]
async fn retrieve_unknown_event_returns_404() {
    let app = spawn_app().await;

    let response = app.get("/events/4242/").await;

    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn full_update_replaces_the_fields() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;

    let response = app
        .put(
            &format!("/events/{}/", event["id"]),
            &json!({
                "title": "Updated Event",
                "description": event["description"],
                "eventdatetime": event["eventdatetime"],
                "address": event["address"],
                "price": event["price"]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Updated Event");
    assert_eq!(body["price"], "99.99");
}

#[actix_web::test]
async fn full_update_without_required_fields_returns_400() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;

    let response = app
        .put(&format!("/events/{}/", event["id"]), &json!({"title": "Only title"}))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn partial_update_changes_only_the_given_fields() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;

    let response = app
        .patch(
            &format!("/events/{}/", event["id"]),
            &json!({"cancelled": true, "price": "120.50"}),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Test Event");
    assert_eq!(body["cancelled"], true);
    assert_eq!(body["price"], "120.50");
}

#[actix_web::test]
async fn update_refreshes_updated_at() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;

    let body: Value = app
        .patch(&format!("/events/{}/", event["id"]), &json!({"address": "Elsewhere"}))
        .await
        .json()
        .await
        .unwrap();

    let timestamp = |value: &Value| {
        let updated_at = value["updated_at"].as_str().unwrap();
        chrono::DateTime::parse_from_rfc3339(updated_at).unwrap()
    };
    let before = timestamp(&event);
    let after = timestamp(&body);
    assert!(after > before);
    assert_eq!(body["created_at"], event["created_at"]);
}

#[actix_web::test]
async fn delete_event_returns_204_and_removes_its_registrations() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;
    let other = app.create_event("Other Event").await;
    let event_id = event["id"].as_i64().unwrap();
    app
        .create_registration("a@example.com", Some(event_id))
        .await;
    app
        .create_registration("b@example.com", Some(event_id))
        .await;
    app
        .create_registration("c@example.com", other["id"].as_i64())
        .await;

    let response = app.delete(&format!("/events/{event_id}/")).await;

    assert_eq!(response.status().as_u16(), 204);
    assert_eq!(app.count_rows("event").await, 1);
    let orphans: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM register WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(orphans, 0);
    assert_eq!(app.count_rows("register").await, 1);
}

#[actix_web::test]
async fn delete_unknown_event_returns_404() {
    let app = spawn_app().await;

    let response = app.delete("/events/4242/").await;

    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn registrations_count_only_includes_active_registrations() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;
    let event_id = event["id"].as_i64().unwrap();
    let first = app
        .create_registration("a@example.com", Some(event_id))
        .await;
    app
        .create_registration("b@example.com", Some(event_id))
        .await;

    let body: Value = app
        .get(&format!("/events/{event_id}/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["registrations_count"], 2);

    app.patch(
        &format!("/registrations/{}/", first["id"]),
        &json!({"cancelled": true}),
    )
    .await;

    let body: Value = app
        .get(&format!("/events/{event_id}/"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["registrations_count"], 1);
    let listed: Vec<Value> = app.get("/events/").await.json().await.unwrap();
    assert_eq!(listed[0]["registrations_count"], 1);
}

#[actix_web::test]
async fn create_event_with_wrongly_typed_fields_reports_each_field() {
    let app = spawn_app().await;
    let test_cases = [
        ("price", json!("abc"), "A valid number is required."),
        ("eventdatetime", json!("tomorrow"), "Datetime has wrong format."),
        ("cancelled", json!("yes"), "Must be a valid boolean."),
        ("title", json!(["a", "list"]), "Not a valid string."),
    ];

    for (field, value, message) in test_cases {
        let mut body = json!({
            "title": "Typed Event",
            "eventdatetime": (Utc::now() + Duration::days(1)).to_rfc3339(),
            "price": "5.00"
        });
        body[field] = value.clone();

        let response = app.post("/events/", &body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when {field} was {value}."
        );
        let errors: Value = response.json().await.unwrap();
        let reported = errors[field][0].as_str().unwrap_or_default();
        assert!(
            reported.starts_with(message),
            "unexpected error for {field}: {errors}"
        );
        assert!(errors.get("non_field_errors").is_none());
    }
    assert_eq!(app.count_rows("event").await, 0);
}

#[actix_web::test]
async fn partial_update_with_a_non_numeric_price_returns_400() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;

    let response = app
        .patch(&format!("/events/{}/", event["id"]), &json!({"price": "abc"}))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let errors: Value = response.json().await.unwrap();
    assert_eq!(errors, json!({"price": ["A valid number is required."]}));
    let stored: Value = app
        .get(&format!("/events/{}/", event["id"]))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stored["price"], "99.99");
}

#[actix_web::test]
async fn read_only_event_fields_in_input_are_ignored() {
    let app = spawn_app().await;
    let read_only = json!({
        "id": 999,
        "registrations_count": 5,
        "created_at": "2000-01-01T00:00:00Z",
        "updated_at": "2000-01-01T00:00:00Z"
    });
    let mut body = json!({
        "title": "Test Event",
        "eventdatetime": (Utc::now() + Duration::days(1)).to_rfc3339(),
        "price": "5.00"
    });
    body.as_object_mut()
        .unwrap()
        .extend(read_only.as_object().unwrap().clone());

    let response = app.post("/events/", &body).await;

    assert_eq!(response.status().as_u16(), 201);
    let event: Value = response.json().await.unwrap();
    let event_id = event["id"].as_i64().unwrap();
    assert_ne!(event_id, 999);
    assert_eq!(event["registrations_count"], 0);
    for field in ["created_at", "updated_at"] {
        let assigned = event[field].as_str().unwrap();
        assert!(!assigned.starts_with("2000-"), "{field} was taken from input");
    }

    let mut update = read_only.clone();
    update["title"] = json!("Renamed");
    let response = app.patch(&format!("/events/{event_id}/"), &update).await;

    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["id"], event_id);
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["registrations_count"], 0);
    assert_eq!(updated["created_at"], event["created_at"]);
    let response = app.get("/events/999/").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn removing_an_event_row_also_removes_its_registrations() {
    let app = spawn_app().await;
    let event = app.create_event("Test Event").await;
    let event_id = event["id"].as_i64().unwrap();
    app
        .create_registration("a@example.com", Some(event_id))
        .await;

    sqlx::query("DELETE FROM event WHERE id = $1")
        .bind(event_id)
        .execute(&app.db_pool)
        .await
        .expect("Failed to delete the event row");

    assert_eq!(app.count_rows("register").await, 0);
}
