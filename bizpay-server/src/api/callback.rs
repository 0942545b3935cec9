//! Callback verification handlers.
//!
//! The gateway delivers callbacks either as a query string or as a form
//! body; both are verified the same way. Verdicts map to status codes:
//! accepted is `200`, rejected is `400`, and a failed order lookup is `503`
//! so the gateway retries.

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use bizpay_core::{VerificationOutcome, VerifyError};
use bizpay_sdk::objects::{CallbackPayload, PaymentGateRedirect};
use serde::Serialize;

use crate::state::AppState;

/// Build the callback router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/callback", get(verify_query).post(verify_form))
        .route("/callback/payment-gate", get(verify_payment_gate))
}

/// Body of every callback response.
#[derive(Debug, Serialize)]
struct VerdictResponse {
    success: bool,
    message: String,
    reason: Option<&'static str>,
}

fn verdict(outcome: VerificationOutcome) -> (StatusCode, Json<VerdictResponse>) {
    let status = if outcome.is_accepted() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let body = VerdictResponse {
        success: outcome.is_accepted(),
        reason: outcome.reason().map(|r| r.code()),
        message: outcome.message().to_owned(),
    };
    (status, Json(body))
}

/// `GET /callback`: verify a callback delivered as a query string.
async fn verify_query(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CallbackApiError> {
    verify_params(&state, params).await
}

/// `POST /callback`: verify a callback delivered as a form body.
async fn verify_form(
    State(state): State<AppState>,
    Form(params): Form<Vec<(String, String)>>,
) -> Result<impl IntoResponse, CallbackApiError> {
    verify_params(&state, params).await
}

async fn verify_params(
    state: &AppState,
    params: Vec<(String, String)>,
) -> Result<(StatusCode, Json<VerdictResponse>), CallbackApiError> {
    let payload = CallbackPayload::from_params(params);
    let outcome = state.verifier.verify(&payload).await?;
    Ok(verdict(outcome))
}

/// `GET /callback/payment-gate`: verify the redirect issued after the
/// customer picks a payment gate.
async fn verify_payment_gate(
    State(state): State<AppState>,
    Query(redirect): Query<PaymentGateRedirect>,
) -> impl IntoResponse {
    verdict(state.verifier.verify_payment_gate_link(&redirect))
}

/// Errors that can occur in callback handlers.
#[derive(Debug)]
enum CallbackApiError {
    /// No verdict could be reached.
    Verify(VerifyError),
}

impl From<VerifyError> for CallbackApiError {
    fn from(err: VerifyError) -> Self {
        CallbackApiError::Verify(err)
    }
}

impl IntoResponse for CallbackApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            CallbackApiError::Verify(e) => {
                tracing::error!(error = %e, "Callback verification could not complete");
                let body = VerdictResponse {
                    success: false,
                    message: "order lookup unavailable, retry later".to_owned(),
                    reason: Some("lookup_failed"),
                };
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::{
        body::Body,
        extract::Json as JsonBody,
        http::{HeaderMap, Request, header},
        routing::post,
    };
    use bizpay_core::testing::{
        CallbackBuilder, FakeLookup, FakeResponse, PROJECT_TOKEN, authoritative_order, signer,
    };
    use bizpay_core::verifier::Locale;
    use bizpay_core::{CallbackVerifier, OrderLookup};
    use bizpay_sdk::client::GatewayClient;
    use bizpay_sdk::config::{Environment, GatewayConfig, ProjectToken};
    use bizpay_sdk::objects::{OrderInfoResponse, ResponseCode};
    use bizpay_sdk::signature::api_auth;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    fn app_with(lookup: Arc<dyn OrderLookup>) -> Router {
        let verifier = CallbackVerifier::new(signer(), lookup).with_locale(Locale::En);
        build_router(AppState::new(verifier))
    }

    fn app(lookup: FakeLookup) -> Router {
        app_with(Arc::new(lookup))
    }

    fn encode(params: &[(String, String)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: String) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(
            app(FakeLookup::new(FakeResponse::Hang)),
            get_request("/health".to_owned()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_query_callback_accepted() {
        let order = authoritative_order();
        let params = CallbackBuilder::matching(&order).params(&signer());

        let (status, body) = send(
            app(FakeLookup::completed(order)),
            get_request(format!("/callback?{}", encode(&params))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "Payment information accepted.",
                "reason": null,
            })
        );
    }

    #[tokio::test]
    async fn test_form_callback_accepted() {
        let order = authoritative_order();
        let params = CallbackBuilder::matching(&order).params(&signer());
        let request = Request::post("/callback")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encode(&params)))
            .unwrap();

        let (status, body) = send(app(FakeLookup::completed(order)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_tampered_callback_rejected() {
        let order = authoritative_order();
        let params = CallbackBuilder::matching(&order)
            .set("total_payment", "1000")
            .params(&signer());

        let (status, body) = send(
            app(FakeLookup::completed(order)),
            get_request(format!("/callback?{}", encode(&params))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "consistency_mismatch");
        assert_eq!(body["message"], "Warning! Information has changed abnormally");
    }

    #[tokio::test]
    async fn test_lookup_failure_is_service_unavailable() {
        let order = authoritative_order();
        let params = CallbackBuilder::matching(&order).params(&signer());

        let (status, body) = send(
            app(FakeLookup::new(FakeResponse::Fail("gateway down".to_owned()))),
            get_request(format!("/callback?{}", encode(&params))),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["reason"], "lookup_failed");
    }

    #[tokio::test]
    async fn test_payment_gate_link() {
        let link = "https://pay.todo.vn/gate/vnpay?o=1";
        let query = |hash_key: &str| {
            encode(&[
                ("RspCode".to_owned(), "0".to_owned()),
                ("hashKey".to_owned(), hash_key.to_owned()),
                ("link".to_owned(), link.to_owned()),
            ])
        };

        let (status, body) = send(
            app(FakeLookup::new(FakeResponse::Hang)),
            get_request(format!(
                "/callback/payment-gate?{}",
                query("8bcd4554a6829f28580aeaa5ea9d42a4")
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Payment gateway link retrieved successfully!");

        let (status, body) = send(
            app(FakeLookup::new(FakeResponse::Hang)),
            get_request(format!("/callback/payment-gate?{}", query("deadbeef"))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["reason"], "payment_gate_link_mismatch");
    }

    #[derive(Default)]
    struct Captured {
        auth: Option<String>,
        time: Option<String>,
        body: Option<Value>,
    }

    /// Serve `response` on `POST {path}` and record what the client sent.
    async fn spawn_gateway_stub(
        path: &'static str,
        response: Value,
        captured: Arc<Mutex<Captured>>,
    ) -> String {
        let stub = Router::new().route(
            path,
            post(move |headers: HeaderMap, JsonBody(body): JsonBody<Value>| {
                let response = response.clone();
                let captured = Arc::clone(&captured);
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_owned)
                    };
                    let mut captured = captured.lock().unwrap();
                    captured.auth = header("Auth");
                    captured.time = header("Time");
                    captured.body = Some(body);
                    Json(response)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, stub).await;
        });
        format!("http://{addr}/")
    }

    fn stub_client(token: &ProjectToken, base_url: &str) -> GatewayClient {
        let config = GatewayConfig::new(token.clone(), Environment::Sandbox)
            .with_base_url(base_url)
            .unwrap();
        GatewayClient::new(&config)
    }

    #[tokio::test]
    async fn test_end_to_end_against_gateway_stub() {
        let order = authoritative_order();
        let captured = Arc::new(Mutex::new(Captured::default()));
        let response = OrderInfoResponse {
            rsp_code: ResponseCode::Completed,
            order_info: Some(order.clone()),
            message: None,
        };
        let base_url = spawn_gateway_stub(
            "/api/order/info",
            serde_json::to_value(response).unwrap(),
            Arc::clone(&captured),
        )
        .await;

        let token = ProjectToken::new(PROJECT_TOKEN).unwrap();
        let app = app_with(Arc::new(stub_client(&token, &base_url)));

        let params = CallbackBuilder::matching(&order).params(&signer());
        let (status, body) = send(app, get_request(format!("/callback?{}", encode(&params)))).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let captured = captured.lock().unwrap();
        assert_eq!(
            captured.body,
            Some(json!({"order_client_id": "Event-1578367492-2703"}))
        );
        let time: i64 = captured.time.as_deref().unwrap().parse().unwrap();
        assert_eq!(
            captured.auth.as_deref(),
            Some(api_auth("Event-1578367492-2703", time, &token).as_str())
        );
    }

    #[tokio::test]
    async fn test_check_order_against_gateway_stub() {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let document = json!({"RspCode": 0, "status": 3, "order_id_client": "Event-1578367492-2703"});
        let base_url =
            spawn_gateway_stub("/api/order/check", document.clone(), Arc::clone(&captured)).await;

        let token = ProjectToken::new(PROJECT_TOKEN).unwrap();
        let result = stub_client(&token, &base_url)
            .check_order("Event-1578367492-2703")
            .await
            .unwrap();
        assert_eq!(result, document);

        let captured = captured.lock().unwrap();
        assert_eq!(
            captured.body,
            Some(json!({"order_id_client": "Event-1578367492-2703"}))
        );
        let time: i64 = captured.time.as_deref().unwrap().parse().unwrap();
        assert_eq!(
            captured.auth.as_deref(),
            Some(api_auth("Event-1578367492-2703", time, &token).as_str())
        );
    }
}
