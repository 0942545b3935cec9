//! Gateway API client (merchant backend → BizPay gateway).
//!
//! Every request carries an `Auth` header of
//! `md5(subject + unix_time + project_token)` and the matching `Time` header.

use reqwest::Client;
use serde::Serialize;
use url::Url;

use super::ClientError;
use crate::config::{GatewayConfig, ProjectToken};
use crate::objects::OrderInfoResponse;
use crate::signature::{AUTH_HEADER, TIME_HEADER, api_auth};

/// Typed HTTP client for the read-only order endpoints of the gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    project_token: ProjectToken,
}

#[derive(Serialize)]
struct OrderInfoRequest<'a> {
    order_client_id: &'a str,
}

#[derive(Serialize)]
struct CheckOrderRequest<'a> {
    order_id_client: &'a str,
}

impl GatewayClient {
    /// Create a new `GatewayClient` from a validated configuration.
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.clone(),
            project_token: config.project_token.clone(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST api/order/info` – fetch the stored record of an order.
    pub async fn get_order_info(
        &self,
        order_id_client: &str,
    ) -> Result<OrderInfoResponse, ClientError> {
        let body = OrderInfoRequest {
            order_client_id: order_id_client,
        };
        let resp = self.post("api/order/info", order_id_client, &body).await?;
        parse_response(resp).await
    }

    /// `POST api/order/check` – ask the gateway to re-check an order.
    ///
    /// The document shape is not fixed, so it is returned as raw JSON.
    pub async fn check_order(
        &self,
        order_id_client: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let body = CheckOrderRequest { order_id_client };
        let resp = self.post("api/order/check", order_id_client, &body).await?;
        parse_response(resp).await
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        subject: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.base_url.join(path)?;
        let time = time::OffsetDateTime::now_utc().unix_timestamp();
        let auth = api_auth(subject, time, &self.project_token);

        tracing::debug!(%url, subject, "Calling gateway API");

        let resp = self
            .http
            .post(url)
            .header(AUTH_HEADER, auth)
            .header(TIME_HEADER, time.to_string())
            .json(body)
            .send()
            .await?;
        Ok(resp)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
