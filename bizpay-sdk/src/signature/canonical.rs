//! Canonical strings: the exact bytes each signature domain hashes.

use std::io;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;

use super::domain::{Encoding, FieldLayout, SignatureDomain};
use super::MissingField;
use crate::objects::OrderFields;

/// Produce the canonical string of `fields` for `domain`.
///
/// Fails with [`MissingField`] when a required field of the domain is absent
/// (or null where a scalar is required).
pub fn canonicalize(domain: SignatureDomain, fields: &OrderFields) -> Result<String, MissingField> {
    match domain.layout() {
        FieldLayout::Concat(specs) => {
            let mut out = String::new();
            for spec in specs {
                match (spec.encoding, fields.get(spec.name)) {
                    (Encoding::Json, Some(value)) => out.push_str(&canonical_json(&value.to_json())),
                    (Encoding::Text, Some(value)) if !value.is_null() => {
                        out.push_str(&value.canonical())
                    }
                    _ => match spec.fallback {
                        Some(fallback) => out.push_str(fallback),
                        None => return Err(MissingField(spec.name)),
                    },
                }
            }
            Ok(out)
        }
        FieldLayout::SortedPairs { exclude } => Ok(fields
            .iter()
            .filter(|(key, _)| *key != exclude)
            .map(|(key, value)| format!("{key}={}", value.canonical()))
            .collect::<Vec<_>>()
            .join("&")),
    }
}

/// Serialize a JSON value the way the counterpart's encoder does.
///
/// Object keys keep the order they were decoded in, there is no whitespace,
/// `/` is escaped as `\/` and every non-ASCII character is written as a
/// lowercase `\uXXXX` escape.
pub fn canonical_json(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, EscapingFormatter);
    // Writing a `Value` into memory cannot fail and the output is pure ASCII.
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(out).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Compact formatter that adds the counterpart's extra string escapes.
struct EscapingFormatter;

impl Formatter for EscapingFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() && c != '/' {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            if c == '/' {
                writer.write_all(b"\\/")?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::FieldValue;
    use serde_json::json;

    fn primary_fields() -> OrderFields {
        OrderFields::new()
            .with("order_id", "13132")
            .with("created_order_date", "2020-01-07 10:25:00")
            .with("total_payment", "80000")
            .with("order_id_client", "Event-1578367492-2703")
            .with("vid", "phuong")
            .with("recharge", "0")
    }

    #[test]
    fn test_primary_concatenates_in_contract_order() {
        let canonical = canonicalize(SignatureDomain::Primary, &primary_fields()).unwrap();
        assert_eq!(
            canonical,
            "131322020-01-07 10:25:0080000Event-1578367492-2703phuong0"
        );
    }

    #[test]
    fn test_primary_ignores_unrelated_fields() {
        let fields = primary_fields().with("gate", "2").with("status", "13");
        assert_eq!(
            canonicalize(SignatureDomain::Primary, &fields).unwrap(),
            canonicalize(SignatureDomain::Primary, &primary_fields()).unwrap()
        );
    }

    #[test]
    fn test_primary_missing_or_null_field() {
        let mut fields = primary_fields();
        fields.remove("vid");
        assert_eq!(
            canonicalize(SignatureDomain::Primary, &fields),
            Err(MissingField("vid"))
        );

        let fields = primary_fields().with("recharge", FieldValue::Null);
        assert_eq!(
            canonicalize(SignatureDomain::Primary, &fields),
            Err(MissingField("recharge"))
        );
    }

    #[test]
    fn test_extra_data_serializes_structured_values() {
        let fields = OrderFields::new()
            .with("coupons_discount", json!([{"code": "SALE/10", "amount": 10000}]))
            .with("mybizfly_discount", json!({"point": 0, "amount": 0}))
            .with("payment_gate_discount", "0")
            .with("payment_gate_fees", 1500);
        assert_eq!(
            canonicalize(SignatureDomain::ExtraData, &fields).unwrap(),
            r#"[{"code":"SALE\/10","amount":10000}]{"point":0,"amount":0}01500"#
        );
    }

    #[test]
    fn test_extra_data_null_discount_encodes_as_null() {
        let fields = OrderFields::new()
            .with("coupons_discount", FieldValue::Null)
            .with("mybizfly_discount", FieldValue::Null)
            .with("payment_gate_discount", 0)
            .with("payment_gate_fees", 0);
        assert_eq!(
            canonicalize(SignatureDomain::ExtraData, &fields).unwrap(),
            "nullnull00"
        );
    }

    #[test]
    fn test_special_data_sorted_join() {
        let fields = OrderFields::new()
            .with("paid_at", "2020-01-07 10:25:27")
            .with("secure_hash_special", "ignored")
            .with("bank_code", "VCB")
            .with("order_id_client", "Event-1578367492-2703");
        assert_eq!(
            canonicalize(SignatureDomain::SpecialData, &fields).unwrap(),
            "bank_code=VCB&order_id_client=Event-1578367492-2703&paid_at=2020-01-07 10:25:27"
        );
    }

    #[test]
    fn test_special_data_is_independent_of_input_order() {
        let forward: OrderFields = [("a", "1"), ("b", "2")].into_iter().collect();
        let backward: OrderFields = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(
            canonicalize(SignatureDomain::SpecialData, &forward).unwrap(),
            canonicalize(SignatureDomain::SpecialData, &backward).unwrap()
        );
        assert_eq!(
            canonicalize(SignatureDomain::SpecialData, &forward).unwrap(),
            "a=1&b=2"
        );
    }

    #[test]
    fn test_special_data_single_and_empty() {
        let single = OrderFields::new()
            .with("a", "1")
            .with("secure_hash_special", "x");
        assert_eq!(
            canonicalize(SignatureDomain::SpecialData, &single).unwrap(),
            "a=1"
        );

        let only_hash = OrderFields::new().with("secure_hash_special", "x");
        assert_eq!(
            canonicalize(SignatureDomain::SpecialData, &only_hash).unwrap(),
            ""
        );
    }

    #[test]
    fn test_order_request_defaults_recharge() {
        let fields = OrderFields::new()
            .with("order_id", "25151-24125415")
            .with("order_value", "50000")
            .with("project_token", "tok");
        assert_eq!(
            canonicalize(SignatureDomain::OrderRequest, &fields).unwrap(),
            "25151-2412541550000tok0"
        );
    }

    #[test]
    fn test_canonical_json_escapes() {
        assert_eq!(
            canonical_json(&json!({"name": "phương"})),
            r#"{"name":"ph\u01b0\u01a1ng"}"#
        );
        assert_eq!(
            canonical_json(&json!(["a\"b", "c\\d", "line\n", 1.5, true, null])),
            r#"["a\"b","c\\d","line\n",1.5,true,null]"#
        );
        assert_eq!(canonical_json(&json!("\u{1}")), r#""\u0001""#);
    }

    #[test]
    fn test_canonical_json_keeps_decoded_key_order() {
        let decoded: Value =
            serde_json::from_str(r#"{"point":0,"amount":0,"nested":{"z":1,"a":[]}}"#).unwrap();
        assert_eq!(
            canonical_json(&decoded),
            r#"{"point":0,"amount":0,"nested":{"z":1,"a":[]}}"#
        );
    }

    #[test]
    fn test_canonical_json_escapes_astral_chars_as_surrogate_pairs() {
        assert_eq!(canonical_json(&json!("a/😀")), r#""a\/\ud83d\ude00""#);
    }
}
