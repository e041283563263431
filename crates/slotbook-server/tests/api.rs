//! HTTP surface, driven through the router without a listener.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use insta::assert_json_snapshot;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use slotbook_core::ClockTime;
use slotbook_providers::{
    CalendarInfo, Credential, MemoryProvider, ProviderErrorCode, RawEvent, RawEventTime,
};
use slotbook_server::{
    AppState, Catalog, Database, FixedProviderFactory, NewService, SlotRegistry, SyncCursorStore,
    routes,
};

struct TestApp {
    _dir: TempDir,
    db: Database,
    app: Router,
}

fn build(provider: MemoryProvider, origins: &[&str]) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("api.db")).unwrap();
    let state = AppState::new(db.clone(), Arc::new(FixedProviderFactory::new(provider)));
    let origins: Vec<String> = origins.iter().map(|o| o.to_string()).collect();
    let app = routes::router(state, routes::cors_layer(&origins));
    TestApp { _dir: dir, db, app }
}

fn app_with(provider: MemoryProvider) -> TestApp {
    build(provider, &[])
}

fn app_with_origins(origins: &[&str]) -> TestApp {
    build(MemoryProvider::new(), origins)
}

fn app() -> TestApp {
    app_with(MemoryProvider::new())
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Sends a CORS preflight and returns the allowed origin, if any.
    async fn preflight(&self, origin: &str) -> Option<String> {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/slots")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|value| value.to_str().unwrap().to_string())
    }

    fn service(&self, name: &str, price: i64) -> i64 {
        Catalog::new(self.db.clone())
            .add(&NewService {
                name: name.to_string(),
                category: "Peluquería".to_string(),
                price: Decimal::from(price),
                duration_minutes: 30,
                description: None,
            })
            .unwrap()
            .id
    }

    fn open_slot(&self) {
        SlotRegistry::new(self.db.clone())
            .open(
                NaiveDate::from_ymd_opt(2025, 12, 23).unwrap(),
                ClockTime::new(10, 0).unwrap(),
            )
            .unwrap();
    }
}

fn booking(service_id: i64) -> Value {
    json!({
        "slotId": "2025-12-23-10:00",
        "date": "2025-12-23",
        "time": "10:00",
        "clientName": "Ana",
        "serviceId": service_id,
    })
}

#[tokio::test]
async fn health() {
    let (status, body) = app().get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn book_complete_and_bill() {
    let app = app();
    let cut = app.service("Corte", 25);
    let wash = app.service("Lavado", 15);
    app.open_slot();

    let (status, body) = app.json(Method::POST, "/api/appointments", booking(cut)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "appointment created");
    assert_eq!(body["appointment"]["status"], "confirmed");
    let id = body["appointment"]["id"].as_i64().unwrap();

    let (_, slots) = app.get("/api/slots").await;
    assert_eq!(slots, json!([]));

    let (status, body) = app
        .json(
            Method::PATCH,
            &format!("/api/appointments/{id}/complete"),
            json!({
                "serviciosRealizados": [cut, wash],
                "paymentMethod": "efectivo",
                "cashReceived": 50,
                "change": 10,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "completed");
    assert_eq!(body["appointment"]["totalPaid"], json!(40.0));
    assert_eq!(body["appointment"]["changeReturned"], json!(10.0));

    let (_, stats) = app.get("/api/billing/stats").await;
    assert_eq!(stats["count"], 1);

    let (_, billed) = app.get("/api/billing").await;
    assert_eq!(billed.as_array().unwrap().len(), 1);

    let (_, months) = app.get("/api/billing/months").await;
    assert_eq!(months.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_booking_of_a_slot_conflicts() {
    let app = app();
    let cut = app.service("Corte", 25);
    app.open_slot();

    let (status, _) = app.json(Method::POST, "/api/appointments", booking(cut)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.json(Method::POST, "/api/appointments", booking(cut)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("2025-12-23-10:00"));
}

#[tokio::test]
async fn validation_and_missing_resources() {
    let app = app();
    app.open_slot();

    let (status, body) = app
        .json(
            Method::POST,
            "/api/appointments",
            json!({"slotId": "2025-12-23-10:00", "date": "2025-12-23", "time": "10:00", "service": "Corte"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/appointments/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_snapshot!(body, @r#"
    {
      "error": "appointment 99 not found"
    }
    "#);

    let (status, _) = app
        .json(Method::POST, "/api/appointments", json!({"date": "not a date"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/appointments/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/billing?month=2025-13").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sync_without_credential_needs_auth() {
    let app = app();
    let request = Request::post("/api/calendar/sync").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["needsAuth"], true);
}

#[tokio::test]
async fn rejected_token_needs_auth() {
    let app = app_with(
        MemoryProvider::new().failing_list(ProviderErrorCode::AuthenticationFailed, "expired"),
    );
    let request = Request::post("/api/calendar/sync")
        .header(header::AUTHORIZATION, "Bearer stale")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["needsAuth"], true);
    let cursor = SyncCursorStore::new(app.db.clone()).load().unwrap();
    assert_eq!(cursor.credential, None);
}

#[tokio::test]
async fn sync_convert_and_discard() {
    let start = chrono::Utc::now() + chrono::Duration::days(1);
    let event = |id: &str, summary: &str| {
        RawEvent::new(
            id,
            RawEventTime::DateTime(start.fixed_offset()),
            RawEventTime::DateTime((start + chrono::Duration::hours(1)).fixed_offset()),
            "w",
        )
        .with_summary(summary)
    };
    let app = app_with(
        MemoryProvider::new()
            .with_calendar(
                CalendarInfo::new("w", "Trabajo"),
                vec![event("a", "Corte - Ana"), event("b", "Tinte - Eva")],
            )
            .with_calendar(CalendarInfo::new("h", "Casa"), vec![]),
    );

    let request = Request::post("/api/calendar/sync")
        .header(header::AUTHORIZATION, "Bearer fresh")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_json_snapshot!(body, @r#"
    {
      "message": "sync completed",
      "total": 2,
      "workEvents": 2,
      "regularEvents": 0
    }
    "#);
    let cursor = SyncCursorStore::new(app.db.clone()).load().unwrap();
    assert_eq!(cursor.credential, Some(Credential::new("fresh")));

    let (_, pending) = app.get("/api/calendar/work-events").await;
    let pending = pending.as_array().unwrap().clone();
    assert_eq!(pending.len(), 2);
    let ana = pending.iter().find(|e| e["externalId"] == "a").unwrap()["id"]
        .as_i64()
        .unwrap();
    let eva = pending.iter().find(|e| e["externalId"] == "b").unwrap()["id"]
        .as_i64()
        .unwrap();

    let (status, draft) = app.get(&format!("/api/calendar/events/{ana}/draft")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["clientName"], "Ana");

    let (status, body) = app
        .json(
            Method::PATCH,
            &format!("/api/calendar/events/{ana}/convert"),
            json!({"clientName": "Ana", "service": "Corte"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["clientName"], "Ana");

    let (status, _) = app
        .send(
            Request::delete(format!("/api/calendar/events/{eva}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, pending) = app.get("/api/calendar/work-events").await;
    assert_eq!(pending, json!([]));
    let (_, all) = app.get("/api/calendar/events").await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Request::delete(format!("/api/calendar/events/{ana}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn link_marks_event_converted() {
    let start = chrono::Utc::now() + chrono::Duration::days(2);
    let app = app_with(MemoryProvider::new().with_calendar(
        CalendarInfo::new("w", "Trabajo"),
        vec![RawEvent::new(
            "a",
            RawEventTime::DateTime(start.fixed_offset()),
            RawEventTime::DateTime((start + chrono::Duration::hours(1)).fixed_offset()),
            "w",
        )],
    ));
    let cut = app.service("Corte", 25);
    app.open_slot();
    let (_, created) = app.json(Method::POST, "/api/appointments", booking(cut)).await;
    let appointment_id = created["appointment"]["id"].as_i64().unwrap();

    let request = Request::post("/api/calendar/sync")
        .header(header::AUTHORIZATION, "Bearer t")
        .body(Body::empty())
        .unwrap();
    app.send(request).await;
    let (_, pending) = app.get("/api/calendar/work-events").await;
    let event_id = pending[0]["id"].as_i64().unwrap();

    let (status, body) = app
        .json(
            Method::PATCH,
            &format!("/api/calendar/events/{event_id}/convert"),
            json!({"appointmentId": appointment_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "event marked as converted");

    let (_, all) = app.get("/api/calendar/events").await;
    assert_eq!(all[0]["converted"], true);
    assert_eq!(all[0]["convertedAppointmentId"], appointment_id);
}

#[tokio::test]
async fn services_are_listed() {
    let app = app();
    app.service("Manicura", 20);
    let (status, body) = app.get("/api/services").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Manicura");
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let app = app();
    assert_eq!(app.preflight("http://example.com").await.as_deref(), Some("*"));
}

#[tokio::test]
async fn cors_restricts_to_configured_origins() {
    let app = app_with_origins(&["http://localhost:5173", "bad\norigin"]);
    assert_eq!(
        app.preflight("http://localhost:5173").await.as_deref(),
        Some("http://localhost:5173")
    );
    assert_eq!(app.preflight("http://example.com").await, None);
}

#[tokio::test]
async fn only_invalid_origins_fall_back_to_any() {
    let app = app_with_origins(&["bad\norigin"]);
    assert_eq!(app.preflight("http://example.com").await.as_deref(), Some("*"));
}
