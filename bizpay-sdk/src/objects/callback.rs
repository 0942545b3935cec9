//! Inbound callback payloads sent by the gateway.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FieldValue, OrderFields, keys};

/// A nested JSON block carried as a string field of the callback.
///
/// Decoded once at the payload boundary; a block that fails to decode is
/// kept as [`Block::Malformed`] so the verifier can reject it with the right
/// message instead of treating it as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<T> {
    Missing,
    Malformed(String),
    Present(T),
}

impl<T: DeserializeOwned> Block<T> {
    /// Decode a raw field. Absent, empty and `"0"` values count as missing.
    pub fn decode(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("0") => Block::Missing,
            Some(json) => match serde_json::from_str(json) {
                Ok(value) => Block::Present(value),
                Err(e) => Block::Malformed(e.to_string()),
            },
        }
    }
}

impl<T> Block<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Block::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Block::Missing)
    }
}

/// An order callback, decoded from its flat query/form parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    /// Every flat parameter except the nested blocks and the error pair.
    pub fields: OrderFields,
    /// Set when the gateway reports an error instead of an order outcome.
    pub error: Option<String>,
    pub message: Option<String>,
    pub extra_data: Block<ExtraData>,
    pub special_data: Block<SpecialData>,
}

impl CallbackPayload {
    /// Build a payload from decoded `key=value` parameters.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = OrderFields::new();
        let mut error = None;
        let mut message = None;
        let mut extra_raw = None;
        let mut special_raw = None;

        for (key, value) in params {
            let (key, value) = (key.into(), value.into());
            match key.as_str() {
                keys::EXTRA_DATA => extra_raw = Some(value),
                keys::SPECIAL_DATA => special_raw = Some(value),
                keys::ERROR => error = Some(value),
                keys::MESSAGE => message = Some(value),
                _ => fields.insert(key, value),
            }
        }

        Self {
            fields,
            error,
            message,
            extra_data: Block::decode(extra_raw.as_deref()),
            special_data: Block::decode(special_raw.as_deref()),
        }
    }

    /// The primary `secure_hash` claimed by the callback.
    pub fn secure_hash(&self) -> Option<Cow<'_, str>> {
        self.fields
            .get(keys::SECURE_HASH)
            .filter(|v| !v.is_null())
            .map(FieldValue::canonical)
    }

    pub fn order_id_client(&self) -> Option<Cow<'_, str>> {
        self.fields
            .get(keys::ORDER_ID_CLIENT)
            .filter(|v| !v.is_null())
            .map(FieldValue::canonical)
    }

    pub fn account_id(&self) -> Cow<'_, str> {
        self.fields.text_or_empty(keys::ACCOUNT_ID)
    }

    /// Whether the callback credits an account balance instead of paying an order.
    pub fn is_recharge(&self) -> bool {
        self.fields
            .get(keys::RECHARGE)
            .is_some_and(FieldValue::is_truthy)
    }
}

/// The four extra-data fields compared against the stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtraField {
    CouponsDiscount,
    LoyaltyDiscount,
    PaymentGateDiscount,
    PaymentGateFees,
}

impl ExtraField {
    pub const ALL: [ExtraField; 4] = [
        ExtraField::CouponsDiscount,
        ExtraField::LoyaltyDiscount,
        ExtraField::PaymentGateDiscount,
        ExtraField::PaymentGateFees,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            ExtraField::CouponsDiscount => keys::COUPONS_DISCOUNT,
            ExtraField::LoyaltyDiscount => keys::LOYALTY_DISCOUNT,
            ExtraField::PaymentGateDiscount => keys::PAYMENT_GATE_DISCOUNT,
            ExtraField::PaymentGateFees => keys::PAYMENT_GATE_FEES,
        }
    }
}

impl std::fmt::Display for ExtraField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Discount and fee breakdown of an order.
///
/// Appears both in callbacks (with `secure_hash_extra`) and in the stored
/// order record (without it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraData {
    #[serde(default)]
    pub coupons_discount: Value,
    /// Loyalty-program discount.
    #[serde(default)]
    pub mybizfly_discount: Value,
    #[serde(default)]
    pub payment_gate_discount: FieldValue,
    #[serde(default)]
    pub payment_gate_fees: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_hash_extra: Option<String>,
}

impl ExtraData {
    /// The signed fields, keyed by their wire names.
    pub fn to_fields(&self) -> OrderFields {
        OrderFields::new()
            .with(keys::COUPONS_DISCOUNT, self.coupons_discount.clone())
            .with(keys::LOYALTY_DISCOUNT, self.mybizfly_discount.clone())
            .with(keys::PAYMENT_GATE_DISCOUNT, self.payment_gate_discount.clone())
            .with(keys::PAYMENT_GATE_FEES, self.payment_gate_fees.clone())
    }

    /// Whether `self` and `other` carry the same value for `field`.
    ///
    /// Structured discounts compare as JSON values, so object key order is
    /// irrelevant. Fees compare by their canonical text.
    pub fn agrees_with(&self, other: &ExtraData, field: ExtraField) -> bool {
        match field {
            ExtraField::CouponsDiscount => self.coupons_discount == other.coupons_discount,
            ExtraField::LoyaltyDiscount => self.mybizfly_discount == other.mybizfly_discount,
            ExtraField::PaymentGateDiscount => {
                self.payment_gate_discount.canonical() == other.payment_gate_discount.canonical()
            }
            ExtraField::PaymentGateFees => {
                self.payment_gate_fees.canonical() == other.payment_gate_fees.canonical()
            }
        }
    }
}

/// Free-form block signed with the sorted-pair layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialData(pub OrderFields);

impl SpecialData {
    pub fn fields(&self) -> &OrderFields {
        &self.0
    }

    pub fn secure_hash_special(&self) -> Option<&str> {
        self.0
            .get(keys::SECURE_HASH_SPECIAL)
            .and_then(FieldValue::as_text)
    }
}

/// Redirect sent back after the customer picked a payment gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentGateRedirect {
    #[serde(rename = "RspCode", default)]
    pub rsp_code: Option<String>,
    #[serde(rename = "hashKey", default)]
    pub hash_key: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_params_splits_blocks_from_fields() {
        let payload = CallbackPayload::from_params([
            ("order_id", "13132"),
            ("recharge", "1"),
            ("vid", "phuong"),
            (
                "extraData",
                r#"{"coupons_discount":[],"mybizfly_discount":null,"payment_gate_discount":0,"payment_gate_fees":"1500","secure_hash_extra":"abc"}"#,
            ),
            ("specialData", r#"{"bank_code":"VCB","secure_hash_special":"def"}"#),
        ]);

        assert_eq!(payload.fields.len(), 3);
        assert!(payload.is_recharge());
        assert_eq!(payload.account_id(), "phuong");
        assert!(payload.error.is_none());

        let extra = payload.extra_data.present().unwrap();
        assert_eq!(extra.coupons_discount, json!([]));
        assert_eq!(extra.payment_gate_discount, FieldValue::from(0));
        assert_eq!(extra.payment_gate_fees, FieldValue::from("1500"));
        assert_eq!(extra.secure_hash_extra.as_deref(), Some("abc"));

        let special = payload.special_data.present().unwrap();
        assert_eq!(special.secure_hash_special(), Some("def"));
        assert_eq!(
            special.fields().get("bank_code"),
            Some(&FieldValue::from("VCB"))
        );
    }

    #[test]
    fn test_empty_and_broken_blocks() {
        let payload = CallbackPayload::from_params([("extraData", ""), ("specialData", "{not json")]);
        assert!(payload.extra_data.is_missing());
        assert!(matches!(payload.special_data, Block::Malformed(_)));

        let payload = CallbackPayload::from_params([("specialData", "[1,2]")]);
        assert!(matches!(payload.special_data, Block::Malformed(_)));
        assert!(payload.extra_data.is_missing());
    }

    #[test]
    fn test_error_pair_is_not_a_field() {
        let payload = CallbackPayload::from_params([("error", "1"), ("message", "Huỷ giao dịch")]);
        assert_eq!(payload.error.as_deref(), Some("1"));
        assert_eq!(payload.message.as_deref(), Some("Huỷ giao dịch"));
        assert!(payload.fields.is_empty());
    }

    #[test]
    fn test_recharge_flag_truthiness() {
        for (raw, expected) in [("1", true), ("0", false), ("", false), ("true", true)] {
            let payload = CallbackPayload::from_params([("recharge", raw)]);
            assert_eq!(payload.is_recharge(), expected, "{raw:?}");
        }
        assert!(!CallbackPayload::from_params(Vec::<(String, String)>::new()).is_recharge());
    }

    #[test]
    fn test_extra_agreement_ignores_key_order() {
        let stored = ExtraData {
            coupons_discount: json!([{"amount": 10000, "code": "SALE/10"}]),
            mybizfly_discount: Value::Null,
            payment_gate_discount: FieldValue::from(0),
            payment_gate_fees: FieldValue::from("1500"),
            secure_hash_extra: None,
        };
        let claimed = ExtraData {
            coupons_discount: serde_json::from_str(r#"[{"code":"SALE/10","amount":10000}]"#)
                .unwrap(),
            payment_gate_discount: FieldValue::from("0"),
            ..stored.clone()
        };
        for field in ExtraField::ALL {
            assert!(stored.agrees_with(&claimed, field), "{field}");
        }

        let claimed = ExtraData {
            coupons_discount: json!([{"code": "SALE/10", "amount": 20000}]),
            payment_gate_fees: FieldValue::from(0),
            ..stored.clone()
        };
        assert!(!stored.agrees_with(&claimed, ExtraField::CouponsDiscount));
        assert!(!stored.agrees_with(&claimed, ExtraField::PaymentGateFees));
        assert!(stored.agrees_with(&claimed, ExtraField::LoyaltyDiscount));
    }
}
