#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use campus_billing::domain::{GatewayCorrelation, PaymentInstruction};
use campus_billing::gateway::{ChargeRequest, GatewayError, NotificationVerifier, PaymentGateway};
use campus_billing::{create_app, AppState, Repositories};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const SERVER_KEY: &str = "SB-Mid-server-test";

/// Gateway double that answers every charge the same way.
pub struct FakeGateway {
    pub fail: bool,
    pub transaction_status: &'static str,
    pub calls: AtomicUsize,
}

impl FakeGateway {
    pub fn pending() -> Self {
        Self {
            fail: false,
            transaction_status: "pending",
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::pending()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCorrelation, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GatewayError::Timeout(15));
        }
        Ok(GatewayCorrelation {
            order_id: request.order_id.clone(),
            transaction_id: Some(format!("trx-{}", request.order_id)),
            transaction_status: Some(self.transaction_status.to_string()),
            fraud_status: None,
            payment_type: Some("bank_transfer".to_string()),
            instruction: Some(PaymentInstruction::VirtualAccount {
                bank: request.bank.clone().unwrap_or_else(|| "bca".to_string()),
                number: "8800112233".to_string(),
            }),
            actions: Vec::new(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new(gateway: FakeGateway) -> Self {
        let gateway = Arc::new(gateway);
        let state = AppState::new(
            Repositories::in_memory(),
            gateway.clone(),
            NotificationVerifier::new(SERVER_KEY),
            ADMIN_KEY,
        );
        Self {
            router: create_app(state),
            gateway,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (u16, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        into_json(self.send(request).await).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (u16, Value) {
        self.json("POST", uri, body, false).await
    }

    pub async fn post_as_admin(&self, uri: &str, body: Value) -> (u16, Value) {
        self.json("POST", uri, body, true).await
    }

    pub async fn patch(&self, uri: &str, body: Value, admin: bool) -> (u16, Value) {
        self.json("PATCH", uri, body, admin).await
    }

    pub async fn delete(&self, uri: &str, admin: bool) -> (u16, Value) {
        let mut builder = Request::builder().method("DELETE").uri(uri);
        if admin {
            builder = builder.header("authorization", format!("Bearer {}", ADMIN_KEY));
        }
        into_json(self.send(builder.body(Body::empty()).unwrap()).await).await
    }

    async fn json(&self, method: &str, uri: &str, body: Value, admin: bool) -> (u16, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if admin {
            builder = builder.header("authorization", format!("Bearer {}", ADMIN_KEY));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        into_json(self.send(request).await).await
    }

    /// Registers a student and returns its id.
    pub async fn student(&self, number: &str, major: &str, semester: i32) -> String {
        let (status, body) = self
            .post(
                "/students",
                serde_json::json!({
                    "studentNumber": number,
                    "name": "Dewi Lestari",
                    "majorId": major,
                    "semester": semester,
                }),
            )
            .await;
        assert_eq!(status, 201, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn fee_schedule(&self, major: &str, semester: i32, components: [&str; 5]) -> Value {
        let (status, body) = self
            .post_as_admin(
                "/biaya",
                serde_json::json!({
                    "majorId": major,
                    "semester": semester,
                    "basicFee": components[0],
                    "majorSurcharge": components[1],
                    "labFee": components[2],
                    "examFee": components[3],
                    "activityFee": components[4],
                }),
            )
            .await;
        assert_eq!(status, 201, "{}", body);
        body
    }
}

pub async fn into_json(response: Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
