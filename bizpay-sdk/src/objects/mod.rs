//! Wire objects exchanged with the BizPay gateway.
//!
//! Every field that takes part in a signature is carried as a [`FieldValue`],
//! which knows how the counterpart renders it as text. The rendering rules
//! are part of the signature contract, so they live next to the types.

pub mod callback;
pub mod order;

pub use callback::{Block, CallbackPayload, ExtraData, ExtraField, PaymentGateRedirect, SpecialData};
pub use order::{AuthoritativeOrder, OrderField, OrderInfoResponse, OrderRequest, ResponseCode};

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::signature::{MissingField, canonical_json};

/// Field names used on the wire.
pub mod keys {
    pub const ORDER_ID: &str = "order_id";
    pub const CREATED_ORDER_DATE: &str = "created_order_date";
    pub const TOTAL_PAYMENT: &str = "total_payment";
    pub const ORDER_ID_CLIENT: &str = "order_id_client";
    pub const ACCOUNT_ID: &str = "vid";
    pub const RECHARGE: &str = "recharge";
    pub const GATE: &str = "gate";
    pub const PAYGATE: &str = "paygate";
    pub const STATUS: &str = "status";
    pub const SECURE_HASH: &str = "secure_hash";

    pub const EXTRA_DATA: &str = "extraData";
    pub const SPECIAL_DATA: &str = "specialData";
    pub const ERROR: &str = "error";
    pub const MESSAGE: &str = "message";

    pub const COUPONS_DISCOUNT: &str = "coupons_discount";
    pub const LOYALTY_DISCOUNT: &str = "mybizfly_discount";
    pub const PAYMENT_GATE_DISCOUNT: &str = "payment_gate_discount";
    pub const PAYMENT_GATE_FEES: &str = "payment_gate_fees";
    pub const SECURE_HASH_EXTRA: &str = "secure_hash_extra";
    pub const SECURE_HASH_SPECIAL: &str = "secure_hash_special";

    pub const RSP_CODE: &str = "RspCode";
    pub const HASH_KEY: &str = "hashKey";
    pub const LINK: &str = "link";

    pub const ORDER_VALUE: &str = "order_value";
    pub const PROJECT_TOKEN: &str = "project_token";
}

/// A single field value as it appears in a callback or an order record.
///
/// Callbacks decoded from a query string only ever produce [`FieldValue::Text`];
/// records decoded from the gateway API keep their JSON types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Structured(Value),
}

impl FieldValue {
    /// Text form used when the value is concatenated into a canonical string.
    ///
    /// `true` renders as `"1"`, `false` and null as `""`, numbers in their
    /// decimal form and structured values as canonical JSON. A float with no
    /// fractional part loses its `.0`, so `80000.0` renders as `"80000"`.
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Null => Cow::Borrowed(""),
            FieldValue::Bool(true) => Cow::Borrowed("1"),
            FieldValue::Bool(false) => Cow::Borrowed(""),
            FieldValue::Number(n) => Cow::Owned(number_text(n)),
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::Structured(v) => Cow::Owned(canonical_json(v)),
        }
    }

    /// Loose truthiness: `""`, `"0"`, `0`, `false`, null and empty arrays
    /// are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            FieldValue::Text(s) => !(s.is_empty() || s == "0"),
            FieldValue::Structured(Value::Array(items)) => !items.is_empty(),
            FieldValue::Structured(Value::Object(map)) => !map.is_empty(),
            FieldValue::Structured(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert back into a JSON value (used for JSON-encoded signature fields).
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Structured(v) => v.clone(),
        }
    }
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Structured(other),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Number(value.into())
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64);

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A named set of order fields.
///
/// Keys are kept sorted, which is what the sorted-pair signature layout needs
/// and keeps debug output stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderFields(BTreeMap<String, FieldValue>);

impl OrderFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Look up a field that must be present and non-null.
    pub fn require(&self, name: &'static str) -> Result<&FieldValue, MissingField> {
        match self.0.get(name) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(MissingField(name)),
        }
    }

    /// Canonical text of a field, with absent fields rendered as `""`.
    pub fn text_or_empty(&self, name: &str) -> Cow<'_, str> {
        self.0
            .get(name)
            .map(FieldValue::canonical)
            .unwrap_or(Cow::Borrowed(""))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for OrderFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
