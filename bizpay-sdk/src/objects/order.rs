//! Order records served by the gateway API and outbound order requests.

use serde::{Deserialize, Serialize};

use super::{ExtraData, FieldValue, OrderFields, keys};

/// Gateway response code (`RspCode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ResponseCode {
    Completed,
    NotCompleted,
    DuplicateOrder,
    OrderNotFound,
    NullPaygate,
    InvalidToken,
    NullToken,
    NullTransactionId,
    Other(i64),
}

impl ResponseCode {
    pub fn is_completed(self) -> bool {
        self == ResponseCode::Completed
    }
}

impl From<i64> for ResponseCode {
    fn from(value: i64) -> Self {
        match value {
            0 => ResponseCode::Completed,
            99 => ResponseCode::NotCompleted,
            8 => ResponseCode::DuplicateOrder,
            7 => ResponseCode::OrderNotFound,
            6 => ResponseCode::NullPaygate,
            4 => ResponseCode::InvalidToken,
            9 => ResponseCode::NullToken,
            10 => ResponseCode::NullTransactionId,
            other => ResponseCode::Other(other),
        }
    }
}

impl From<ResponseCode> for i64 {
    fn from(value: ResponseCode) -> Self {
        match value {
            ResponseCode::Completed => 0,
            ResponseCode::NotCompleted => 99,
            ResponseCode::DuplicateOrder => 8,
            ResponseCode::OrderNotFound => 7,
            ResponseCode::NullPaygate => 6,
            ResponseCode::InvalidToken => 4,
            ResponseCode::NullToken => 9,
            ResponseCode::NullTransactionId => 10,
            ResponseCode::Other(code) => code,
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseCode::Completed => "completed",
            ResponseCode::NotCompleted => "not_completed",
            ResponseCode::DuplicateOrder => "duplicate_order",
            ResponseCode::OrderNotFound => "order_not_found",
            ResponseCode::NullPaygate => "null_paygate",
            ResponseCode::InvalidToken => "invalid_token",
            ResponseCode::NullToken => "null_token",
            ResponseCode::NullTransactionId => "null_transaction_id",
            ResponseCode::Other(_) => "other",
        };
        write!(f, "{} ({name})", i64::from(*self))
    }
}

/// Response body of `POST api/order/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfoResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: ResponseCode,
    #[serde(default)]
    pub order_info: Option<AuthoritativeOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The merchant-side stored view of an order, as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeOrder {
    #[serde(default)]
    pub paygate: FieldValue,
    #[serde(default)]
    pub total_payment: FieldValue,
    #[serde(default)]
    pub status: FieldValue,
    #[serde(default)]
    pub order_id: FieldValue,
    #[serde(default)]
    pub order_id_client: FieldValue,
    /// Account the order belongs to (or is recharging).
    #[serde(default)]
    pub vid: FieldValue,
    #[serde(default)]
    pub recharge: FieldValue,
    #[serde(default)]
    pub created_order_date: FieldValue,
    #[serde(default, rename = "extraData")]
    pub extra_data: Option<ExtraData>,
}

impl AuthoritativeOrder {
    pub fn field(&self, field: OrderField) -> &FieldValue {
        match field {
            OrderField::Paygate => &self.paygate,
            OrderField::TotalPayment => &self.total_payment,
            OrderField::Status => &self.status,
            OrderField::OrderId => &self.order_id,
            OrderField::OrderIdClient => &self.order_id_client,
            OrderField::AccountId => &self.vid,
            OrderField::Recharge => &self.recharge,
            OrderField::CreatedOrderDate => &self.created_order_date,
        }
    }
}

/// Order fields cross-checked between a callback and the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderField {
    Paygate,
    TotalPayment,
    Status,
    OrderId,
    OrderIdClient,
    AccountId,
    Recharge,
    CreatedOrderDate,
}

impl OrderField {
    pub const ALL: [OrderField; 8] = [
        OrderField::Paygate,
        OrderField::TotalPayment,
        OrderField::Status,
        OrderField::OrderId,
        OrderField::OrderIdClient,
        OrderField::AccountId,
        OrderField::Recharge,
        OrderField::CreatedOrderDate,
    ];

    /// Key in the stored order record.
    pub const fn record_key(self) -> &'static str {
        match self {
            OrderField::Paygate => keys::PAYGATE,
            OrderField::TotalPayment => keys::TOTAL_PAYMENT,
            OrderField::Status => keys::STATUS,
            OrderField::OrderId => keys::ORDER_ID,
            OrderField::OrderIdClient => keys::ORDER_ID_CLIENT,
            OrderField::AccountId => keys::ACCOUNT_ID,
            OrderField::Recharge => keys::RECHARGE,
            OrderField::CreatedOrderDate => keys::CREATED_ORDER_DATE,
        }
    }

    /// Key in the callback parameters. Only the paygate differs.
    pub const fn callback_key(self) -> &'static str {
        match self {
            OrderField::Paygate => keys::GATE,
            other => other.record_key(),
        }
    }
}

impl std::fmt::Display for OrderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.record_key())
    }
}

/// An order the merchant submits to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub order_id: String,
    pub order_value: String,
    #[serde(default)]
    pub recharge: bool,
}

impl OrderRequest {
    pub fn new(order_id: impl Into<String>, order_value: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            order_value: order_value.into(),
            recharge: false,
        }
    }

    pub fn with_recharge(mut self, recharge: bool) -> Self {
        self.recharge = recharge;
        self
    }

    /// The signed fields, without the project token (the signer adds it).
    pub fn to_fields(&self) -> OrderFields {
        OrderFields::new()
            .with(keys::ORDER_ID, self.order_id.as_str())
            .with(keys::ORDER_VALUE, self.order_value.as_str())
            .with(keys::RECHARGE, if self.recharge { "1" } else { "0" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_info_response_decoding() {
        let response: OrderInfoResponse = serde_json::from_value(json!({
            "RspCode": 0,
            "order_info": {
                "paygate": 1,
                "total_payment": 80000,
                "status": 13,
                "order_id": 13132,
                "order_id_client": "Event-1578367492-2703",
                "vid": "phuong",
                "recharge": 0,
                "created_order_date": "2020-01-07 10:25:00",
                "extraData": {
                    "coupons_discount": [],
                    "mybizfly_discount": null,
                    "payment_gate_discount": 0,
                    "payment_gate_fees": 0
                }
            }
        }))
        .unwrap();

        assert!(response.rsp_code.is_completed());
        let order = response.order_info.unwrap();
        assert_eq!(order.field(OrderField::TotalPayment).canonical(), "80000");
        assert_eq!(order.field(OrderField::AccountId).canonical(), "phuong");
        assert!(order.extra_data.is_some());
    }

    #[test]
    fn test_unknown_response_code_is_kept() {
        let response: OrderInfoResponse =
            serde_json::from_value(json!({"RspCode": 42, "message": "nope"})).unwrap();
        assert_eq!(response.rsp_code, ResponseCode::Other(42));
        assert!(response.order_info.is_none());
        assert_eq!(i64::from(ResponseCode::NotCompleted), 99);
        assert_eq!(ResponseCode::from(7i64), ResponseCode::OrderNotFound);
    }

    #[test]
    fn test_callback_keys() {
        assert_eq!(OrderField::Paygate.callback_key(), "gate");
        assert_eq!(OrderField::Paygate.record_key(), "paygate");
        assert_eq!(OrderField::AccountId.callback_key(), "vid");
    }

    #[test]
    fn test_order_request_fields() {
        let fields = OrderRequest::new("A-1", "50000").with_recharge(true).to_fields();
        assert_eq!(fields.text_or_empty("recharge"), "1");
        assert!(fields.get("project_token").is_none());
    }
}
