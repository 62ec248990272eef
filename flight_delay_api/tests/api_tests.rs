//! End-to-end tests for the HTTP surface, against the fixture bundle.
//!
//! Run with: cargo test -p flight_delay_api --test api_tests -- --nocapture

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use flight_delay_api::{config::Config, routes, ModelBundle};
use serde_json::{json, Value};
use tower::ServiceExt;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/flight_delays_model.json");

fn app() -> Router {
    let bundle = ModelBundle::load(FIXTURE).expect("fixture bundle should load");
    let config = Config::from_lookup(|_| None);
    routes::router(routes::AppState::new(bundle, &config))
}

fn scenario() -> Value {
    json!({
        "DIA": 13,
        "MES": 9,
        "DIANOM": "Miercoles",
        "TIPOVUELO": "N",
        "OPERA": "Grupo LATAM",
        "SIGLADES": "Arica",
        "TEMPORADAALTA": 1,
        "PERIODODIA": "noche"
    })
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.expect("router is infallible");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body should collect");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_predict(payload: &Value) -> (StatusCode, Value) {
    post_with(&app(), payload).await
}

async fn post_with(app: &Router, payload: &Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    send(app.clone(), req).await
}

fn delay_proba(body: &Value) -> f64 {
    body["delay_proba"].as_f64().expect("delay_proba should be a number")
}

#[tokio::test]
async fn test_home_reports_message_and_version() {
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Flight Delays API");
    assert_eq!(body["model_version"].as_f64(), Some(0.1));
}

#[tokio::test]
async fn test_home_version_falls_back_when_env_value_not_finite() {
    let mut raw: Value = serde_json::from_str(&std::fs::read_to_string(FIXTURE).unwrap()).unwrap();
    raw.as_object_mut().unwrap().remove("model_version");
    let bundle = ModelBundle::from_json(&raw.to_string()).expect("bundle without version should load");
    let config = Config::from_lookup(|key| (key == "MODEL_VERSION").then(|| "NaN".to_string()));
    let app = routes::router(routes::AppState::new(bundle, &config));

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_version"].as_f64(), Some(0.1));
}

#[tokio::test]
async fn test_predict_scenario() {
    let (status, body) = post_predict(&scenario()).await;
    assert_eq!(status, StatusCode::OK);

    let p = delay_proba(&body);
    println!("✓ scenario delay_proba={:.6}", p);
    assert!(p.is_finite());
    assert!((0.0..=1.0).contains(&p));
    // night flight, high season, LATAM in September on the 13th
    assert!((p - sigmoid(-1.0 - 0.05 + 0.1)).abs() < 1e-9);
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let (_, first) = post_predict(&scenario()).await;
    for _ in 0..5 {
        let (status, again) = post_predict(&scenario()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(delay_proba(&again), delay_proba(&first));
    }
}

#[tokio::test]
async fn test_probability_bounded_across_vocabulary() {
    let days = ["Domingo", "Lunes", "Sabado"];
    let airlines = ["Grupo LATAM", "Sky Airline", "JetSmart SPA", "Unknown Air"];
    let periods = ["mañana", "noche", "tarde", "madrugada"];
    let app = app();

    for dia in [1, 13, 31, 45] {
        for mes in [1, 6, 11] {
            for day in days {
                for airline in airlines {
                    for period in periods {
                        let mut payload = scenario();
                        payload["DIA"] = json!(dia);
                        payload["MES"] = json!(mes);
                        payload["DIANOM"] = json!(day);
                        payload["OPERA"] = json!(airline);
                        payload["PERIODODIA"] = json!(period);
                        let (status, body) = post_with(&app, &payload).await;
                        assert_eq!(status, StatusCode::OK);
                        let p = delay_proba(&body);
                        assert!((0.0..=1.0).contains(&p), "out of range for {payload}: {p}");
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn test_missing_field_is_rejected() {
    let mut payload = scenario();
    payload.as_object_mut().unwrap().remove("OPERA");

    let (status, body) = post_predict(&payload).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.get("delay_proba").is_none());
    assert_eq!(body["status"], 422);
    assert!(body["error"].as_str().unwrap().contains("OPERA"));
}

#[tokio::test]
async fn test_wrong_field_type_is_rejected() {
    let mut payload = scenario();
    payload["MES"] = json!("septiembre");

    let (status, body) = post_predict(&payload).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.get("delay_proba").is_none());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"DIA\": 13,"))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_missing_content_type_is_rejected() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .body(Body::from(scenario().to_string()))
        .unwrap();
    let (status, _) = send(app(), req).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_unknown_category_is_scored() {
    let mut payload = scenario();
    payload["OPERA"] = json!("Aerolinea Fantasma");

    let (status, body) = post_predict(&payload).await;
    assert_eq!(status, StatusCode::OK);
    let p = delay_proba(&body);
    assert!((0.0..=1.0).contains(&p));
    println!("✓ unknown airline scored: {:.6}", p);
}

#[tokio::test]
async fn test_unknown_categories_share_one_representation() {
    let mut a = scenario();
    a["PERIODODIA"] = json!("madrugada");
    let mut b = scenario();
    b["PERIODODIA"] = json!("NOCHE");

    let (_, pa) = post_predict(&a).await;
    let (_, pb) = post_predict(&b).await;
    assert_eq!(delay_proba(&pa), delay_proba(&pb));
    // missing period of day takes the non-night branch
    assert!((delay_proba(&pa) - sigmoid(-1.6 - 0.05 + 0.1)).abs() < 1e-9);
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let mut payload = scenario();
    payload["AEROLINEA"] = json!("ignored");

    let (status, body) = post_predict(&payload).await;
    let (_, plain) = post_predict(&scenario()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delay_proba(&body), delay_proba(&plain));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let req = Request::builder().uri("/predictions").body(Body::empty()).unwrap();
    let (status, _) = send(app(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
