//! HTTP surface of the leave ledger, served from the in-memory store.

use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, http::StatusCode, test};
use chrono::NaiveDate;
use serde_json::{Value, json};

use leave_ledger::auth::jwt::generate_access_token;
use leave_ledger::config::Config;
use leave_ledger::ledger::policy::{AllowReviewers, ReportingLines};
use leave_ledger::ledger::{FixedClock, LeaveLedger};
use leave_ledger::routes;
use leave_ledger::store::InMemoryLeaveStore;

const SECRET: &str = "test-secret";

fn config() -> Config {
    Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        rate_protected_per_min: 10_000,
        api_prefix: "/api".to_string(),
        default_sick_days: 15,
        default_casual_days: 5,
        default_vacation_days: 10,
        ledger_max_retries: 3,
    }
}

fn token(employee_id: u64, role: &str) -> String {
    let jwt = generate_access_token(
        employee_id,
        format!("user{employee_id}"),
        role,
        Some(employee_id),
        SECRET,
        3600,
    )
    .unwrap();
    format!("Bearer {jwt}")
}

macro_rules! app {
    () => {
        app!(AllowReviewers)
    };
    ($policy:expr) => {{
        let config = config();
        let store = InMemoryLeaveStore::new(config.allocation_policy());
        let today = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let ledger = LeaveLedger::new(Arc::new(store), config.allocation_policy())
            .with_clock(Arc::new(FixedClock(today)))
            .with_access_policy(Arc::new($policy));
        let routes_config = config.clone();
        test::init_service(
            App::new()
                .wrap(NormalizePath::trim())
                .app_data(Data::new(ledger))
                .app_data(Data::new(config))
                .configure(move |cfg| routes::configure(cfg, routes_config.clone())),
        )
        .await
    }};
}

fn request(method: &str, uri: &str, auth: &str) -> test::TestRequest {
    let req = match method {
        "POST" => test::TestRequest::post(),
        "PUT" => test::TestRequest::put(),
        _ => test::TestRequest::get(),
    };
    req.uri(uri)
        .peer_addr("127.0.0.1:50000".parse().unwrap())
        .insert_header(("Authorization", auth.to_string()))
}

fn apply_body(start: &str, end: &str, leave_type: &str) -> Value {
    json!({
        "start_date": start,
        "end_date": end,
        "type": leave_type,
        "reason": "family trip"
    })
}

#[actix_web::test]
async fn apply_then_approve_keeps_balance_debited() {
    let app = app!();
    let employee = token(1, "employee");
    let manager = token(10, "Manager");

    let resp = test::call_service(
        &app,
        request("POST", "/api/leave", &employee)
            .set_json(apply_body("2030-01-07", "2030-01-11", "Casual"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["leave_type"], "casual");
    let id = body["data"]["id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        request("POST", "/api/leave", &employee)
            .set_json(apply_body("2030-01-08", "2030-01-08", "casual"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "insufficient balance");
    assert_eq!(body["remaining"], 0);
    assert_eq!(body["requested"], 1);
    assert_eq!(body["leave_type"], "casual");

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/approve"), &manager).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "approved");
    assert_eq!(body["data"]["approved_by"], 10);

    let resp = test::call_service(&app, request("GET", "/api/leave/balance", &employee).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let casual = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["type"] == "casual")
        .unwrap()
        .clone();
    assert_eq!(casual, json!({"type": "casual", "total": 5, "used": 5, "remaining": 0}));
}

#[actix_web::test]
async fn manager_self_approval_is_forbidden_but_hr_may_approve() {
    let app = app!();
    let manager = token(10, "manager");
    let hr = token(20, "HR");

    let resp = test::call_service(
        &app,
        request("POST", "/api/leave", &manager)
            .set_json(apply_body("2030-01-07", "2030-01-07", "sick"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/approve"), &manager).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/approve"), &hr).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/approve"), &hr).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn withdraw_restores_and_only_once() {
    let app = app!();
    let employee = token(1, "Employee");

    let resp = test::call_service(
        &app,
        request("POST", "/api/leave", &employee)
            .set_json(apply_body("2030-01-07", "2030-01-09", "vacation"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/withdraw"), &token(2, "employee")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/withdraw"), &employee).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        request("PUT", &format!("/api/leave/{id}/withdraw"), &employee).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "only pending leaves can be withdrawn");

    let resp = test::call_service(&app, request("GET", "/api/leave/balance", &employee).to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    let vacation = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["type"] == "vacation")
        .unwrap()
        .clone();
    assert_eq!(vacation["used"], 0);
    assert_eq!(vacation["remaining"], 10);
}

#[actix_web::test]
async fn validation_errors_are_bad_requests() {
    let app = app!();
    let employee = token(1, "employee");

    for (start, end, message) in [
        ("2030-01-03", "2030-01-08", "cannot request leave in the past"),
        ("2030-01-09", "2030-01-08", "end date cannot be before start date"),
        ("2030-01-12", "2030-01-13", "no working days in selected range"),
    ] {
        let resp = test::call_service(
            &app,
            request("POST", "/api/leave", &employee)
                .set_json(apply_body(start, end, "sick"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], message);
    }

    let resp = test::call_service(
        &app,
        request("POST", "/api/leave", &employee)
            .set_json(json!({"start_date": "07/01/2030", "end_date": "2030-01-08", "type": "sick"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn listing_is_scoped_by_role() {
    let app = app!();
    let employee = token(1, "employee");
    let hr = token(20, "admin");

    for start in ["2030-01-07", "2030-01-08"] {
        test::call_service(
            &app,
            request("POST", "/api/leave", &employee)
                .set_json(apply_body(start, start, "sick"))
                .to_request(),
        )
        .await;
    }

    let resp = test::call_service(&app, request("GET", "/api/leave/my", &employee).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["start_date"], "2030-01-08");

    let resp = test::call_service(&app, request("GET", "/api/leave", &employee).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        request("GET", "/api/leave?status=pending&per_page=1", &hr).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["per_page"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = test::call_service(
        &app,
        request("GET", "/api/leave?status=cancelled", &hr).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, request("GET", "/api/leave/1", &employee).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, request("GET", "/api/leave/1", &token(2, "employee")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = test::call_service(&app, request("GET", "/api/leave/99", &hr).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn managers_only_read_their_team() {
    let app = app!(ReportingLines::default().with_report(10, 1));
    let manager = token(10, "manager");

    for employee_id in [1, 2] {
        test::call_service(
            &app,
            request("POST", "/api/leave", &token(employee_id, "employee"))
                .set_json(apply_body("2030-01-07", "2030-01-07", "sick"))
                .to_request(),
        )
        .await;
    }

    let resp = test::call_service(&app, request("GET", "/api/leave", &manager).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["employee_id"], 1);

    let resp = test::call_service(&app, request("GET", "/api/leave/1", &manager).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = test::call_service(&app, request("GET", "/api/leave/2", &manager).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn requests_without_valid_tokens_are_rejected() {
    let app = app!();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/leave/my")
            .peer_addr("127.0.0.1:50000".parse().unwrap())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, request("GET", "/api/leave/my", "Bearer not-a-jwt").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, request("GET", "/api/leave/my", &token(1, "contractor")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
