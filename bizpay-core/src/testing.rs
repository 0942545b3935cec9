//! Builders for signed callbacks and a scripted order lookup.
//!
//! Compiled for this crate's tests and for dependents enabling the
//! `testing` feature.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bizpay_sdk::Signer;
use bizpay_sdk::config::ProjectToken;
use bizpay_sdk::objects::{
    AuthoritativeOrder, CallbackPayload, ExtraData, FieldValue, OrderFields, OrderInfoResponse,
    ResponseCode, keys,
};
use bizpay_sdk::signature::SignatureDomain;
use serde_json::json;

use crate::lookup::{LookupError, OrderLookup};

pub const PROJECT_TOKEN: &str = "ypBrkdtM407veJuj1BVGKVmo7x8WsEL5";

pub fn signer() -> Signer {
    Signer::new(ProjectToken::new(PROJECT_TOKEN).unwrap())
}

/// A completed, non-recharge order as the gateway stores it.
pub fn authoritative_order() -> AuthoritativeOrder {
    AuthoritativeOrder {
        paygate: FieldValue::from("atm"),
        total_payment: FieldValue::from(80000),
        status: FieldValue::from(3),
        order_id: FieldValue::from(13132),
        order_id_client: FieldValue::from("Event-1578367492-2703"),
        vid: FieldValue::from("phuong"),
        recharge: FieldValue::from(0),
        created_order_date: FieldValue::from("2020-01-07 10:25:00"),
        extra_data: Some(ExtraData {
            coupons_discount: json!([{"code": "SALE/10", "amount": 10000}]),
            mybizfly_discount: json!({"point": 0, "amount": 0}),
            payment_gate_discount: FieldValue::from("0"),
            payment_gate_fees: FieldValue::from("1500"),
            secure_hash_extra: None,
        }),
    }
}

/// Callback fields that agree with `order`, as text the way a query string
/// delivers them.
pub fn callback_fields(order: &AuthoritativeOrder) -> OrderFields {
    bizpay_sdk::objects::OrderField::ALL
        .into_iter()
        .map(|field| {
            (
                field.callback_key().to_owned(),
                FieldValue::from(order.field(field).canonical().into_owned()),
            )
        })
        .collect()
}

/// Builds a callback whose every signature is valid for its own contents.
#[derive(Debug, Clone)]
pub struct CallbackBuilder {
    fields: OrderFields,
    extra: Option<ExtraData>,
    special: Option<OrderFields>,
}

impl CallbackBuilder {
    pub fn matching(order: &AuthoritativeOrder) -> Self {
        Self {
            fields: callback_fields(order),
            extra: order.extra_data.clone(),
            special: Some(
                OrderFields::new()
                    .with("bank_code", "VCB")
                    .with(keys::ORDER_ID_CLIENT, order.order_id_client.clone())
                    .with("paid_at", "2020-01-07 10:25:27"),
            ),
        }
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key, value);
        self
    }

    pub fn extra(mut self, extra: ExtraData) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn without_extra(mut self) -> Self {
        self.extra = None;
        self
    }

    pub fn without_special(mut self) -> Self {
        self.special = None;
        self
    }

    /// Signed `key=value` parameters as they arrive on the wire.
    pub fn params(self, signer: &Signer) -> Vec<(String, String)> {
        let fields = self.fields;
        let mut params: Vec<(String, String)> = fields
            .iter()
            .map(|(key, value)| (key.to_owned(), value.canonical().into_owned()))
            .collect();

        let secure_hash = signer
            .sign_fields(SignatureDomain::Primary, &fields, &fields)
            .unwrap();
        params.push((keys::SECURE_HASH.to_owned(), secure_hash));

        if let Some(mut extra) = self.extra {
            extra.secure_hash_extra = Some(
                signer
                    .sign_fields(SignatureDomain::ExtraData, &extra.to_fields(), &fields)
                    .unwrap(),
            );
            params.push((
                keys::EXTRA_DATA.to_owned(),
                serde_json::to_string(&extra).unwrap(),
            ));
        }

        if let Some(special) = self.special {
            let hash = signer
                .sign_fields(SignatureDomain::SpecialData, &special, &special)
                .unwrap();
            let special = special.with(keys::SECURE_HASH_SPECIAL, hash);
            params.push((
                keys::SPECIAL_DATA.to_owned(),
                serde_json::to_string(&special).unwrap(),
            ));
        }

        params
    }

    pub fn build(self, signer: &Signer) -> CallbackPayload {
        CallbackPayload::from_params(self.params(signer))
    }
}

/// Scripted lookup behavior.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Respond(OrderInfoResponse),
    Fail(String),
    /// Never answers.
    Hang,
}

/// In-memory [`OrderLookup`] that counts how often it is asked.
#[derive(Debug)]
pub struct FakeLookup {
    response: FakeResponse,
    calls: AtomicUsize,
}

impl FakeLookup {
    pub fn new(response: FakeResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answers with `order` and a completed response code.
    pub fn completed(order: AuthoritativeOrder) -> Self {
        Self::responding(ResponseCode::Completed, Some(order))
    }

    pub fn responding(rsp_code: ResponseCode, order_info: Option<AuthoritativeOrder>) -> Self {
        Self::new(FakeResponse::Respond(OrderInfoResponse {
            rsp_code,
            order_info,
            message: None,
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderLookup for FakeLookup {
    async fn fetch_order(&self, _order_id_client: &str) -> Result<OrderInfoResponse, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            FakeResponse::Respond(response) => Ok(response.clone()),
            FakeResponse::Fail(reason) => Err(LookupError::Unavailable(reason.clone())),
            FakeResponse::Hang => std::future::pending().await,
        }
    }
}
