use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use slit_planner::Workshop;
use slit_planner::api::{AppState, router};
use slit_planner::config::Config;
use slit_planner::store::Storage;
use tower::ServiceExt;

fn app() -> Router {
    let config = Config::default();
    let mut workshop = Workshop::open(Storage::in_memory(), config.planner(), config.executor());
    workshop.seed();
    router(AppState::new(workshop))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_up() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/up").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_plan_named_roll() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/plan", Some(json!({ "roll_id": "RM-001" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"]["roll_id"], "RM-001");

    let ids: Vec<&str> = body["plan"]["cuts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ORD-101", "ORD-102", "ORD-104", "ORD-105"]);
    assert_eq!(body["plan"]["blade_positions"].as_array().unwrap().len(), 3);
    assert!(body["preview"].as_str().unwrap().contains("BATCH-X99"));
}

#[tokio::test]
async fn test_execute_requires_confirmation() {
    let app = app();
    let (_, planned) = send(&app, Method::POST, "/plan", Some(json!({ "roll_id": "RM-001" }))).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/execute",
        Some(json!({ "plan": planned["plan"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNCONFIRMED");

    // Nothing changed.
    let (_, pending) = send(&app, Method::GET, "/orders", None).await;
    assert_eq!(pending.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_execute_then_conflict() {
    let app = app();
    let (_, planned) = send(&app, Method::POST, "/plan", Some(json!({ "roll_id": "RM-001" }))).await;
    let request = json!({ "plan": planned["plan"], "confirmed": true });

    let (status, body) = send(&app, Method::POST, "/execute", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["persisted"], true);
    assert_eq!(body["summary"]["consumed_roll_id"], "RM-001");
    assert_eq!(body["summary"]["fulfilled_order_ids"].as_array().unwrap().len(), 4);
    assert!(body["summary"]["remnant"].is_null());

    let (_, pending) = send(&app, Method::GET, "/orders", None).await;
    let pending: Vec<&str> = pending
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(pending, vec!["ORD-103"]);

    let (status, body) = send(&app, Method::POST, "/execute", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "EXECUTION_CONFLICT");
}

#[tokio::test]
async fn test_unknown_material_has_no_candidate() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/plan",
        Some(json!({ "material_type": "STEEL" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "NO_CANDIDATE_ROLL");
}

#[tokio::test]
async fn test_add_roll_validates_width() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/rolls",
        Some(json!({
            "batch_number": "B-1",
            "width": -5.0,
            "weight": 10.0,
            "material_type": "PVC-A"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let (status, body) = send(
        &app,
        Method::POST,
        "/rolls",
        Some(json!({
            "batch_number": "B-1",
            "width": 600.0,
            "weight": 90.0,
            "material_type": "PVC-A"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["value"]["batch_number"], "B-1");
    assert_eq!(body["value"]["is_remnant"], false);

    let (_, rolls) = send(&app, Method::GET, "/rolls", None).await;
    assert_eq!(rolls.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_roll_maintenance() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::PATCH,
        "/rolls/RM-002",
        Some(json!({ "width": 340.0, "weight": 44.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["width"], 340.0);

    let (status, _) = send(&app, Method::DELETE, "/rolls/RM-002", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::DELETE, "/rolls/RM-002", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ROLL_NOT_FOUND");
}

#[tokio::test]
async fn test_dashboard_and_theme() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/dashboard?today=2023-11-03", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roll_count"], 4);
    assert_eq!(body["remnant_count"], 1);
    assert_eq!(body["pending_orders"], 5);
    assert_eq!(body["overdue_orders"], 2);

    let (_, body) = send(&app, Method::GET, "/theme", None).await;
    assert_eq!(body["theme"], "light");

    let (status, body) = send(&app, Method::PUT, "/theme", Some(json!({ "theme": "dark" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "dark");

    let (_, body) = send(&app, Method::GET, "/theme", None).await;
    assert_eq!(body["theme"], "dark");
}

#[tokio::test]
async fn test_execute_rejects_stale_or_edited_plan() {
    let app = app();
    let (_, planned) = send(&app, Method::POST, "/plan", Some(json!({ "roll_id": "RM-001" }))).await;

    let mut edited = planned["plan"].clone();
    edited["waste_width"] = json!(5000.0);
    let (status, body) = send(
        &app,
        Method::POST,
        "/execute",
        Some(json!({ "plan": edited, "confirmed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INCONSISTENT_PLAN");

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/rolls/RM-001",
        Some(json!({ "width": 800.0, "weight": 300.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/execute",
        Some(json!({ "plan": planned["plan"], "confirmed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "EXECUTION_CONFLICT");

    let (_, rolls) = send(&app, Method::GET, "/rolls", None).await;
    assert_eq!(rolls.as_array().unwrap().len(), 4);
    let (_, pending) = send(&app, Method::GET, "/orders", None).await;
    assert_eq!(pending.as_array().unwrap().len(), 5);
}
