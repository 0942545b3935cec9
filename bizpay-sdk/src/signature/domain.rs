//! Signature domains and the per-domain contract carried as data.

use crate::objects::keys;

/// One of the independent signature contracts of the BizPay protocol.
///
/// Each variant fixes the fields it signs (and their order), how its secret
/// is derived and which hash scheme produces the final string. The field
/// order is part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureDomain {
    /// `secure_hash` on order callbacks.
    Primary,
    /// `secure_hash_extra` inside the `extraData` block.
    ExtraData,
    /// `secure_hash_special` inside the `specialData` block.
    SpecialData,
    /// `hashKey` on gateway-selection redirects.
    PaymentGateLink,
    /// `secret_key` on outbound order requests.
    OrderRequest,
}

/// How a single field is rendered into the canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Canonical text of the value; the field must be present and non-null.
    Text,
    /// Canonical JSON of the value; null is allowed and renders as `null`.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub encoding: Encoding,
    /// Rendered when the field is absent instead of failing.
    pub fallback: Option<&'static str>,
}

impl FieldSpec {
    const fn text(name: &'static str) -> Self {
        Self {
            name,
            encoding: Encoding::Text,
            fallback: None,
        }
    }

    const fn json(name: &'static str) -> Self {
        Self {
            name,
            encoding: Encoding::Json,
            fallback: None,
        }
    }

    const fn or(self, fallback: &'static str) -> Self {
        Self {
            fallback: Some(fallback),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLayout {
    /// Values of the listed fields concatenated without separators.
    Concat(&'static [FieldSpec]),
    /// All fields except `exclude`, sorted by key, joined as `k=v&k=v`.
    SortedPairs { exclude: &'static str },
}

/// Input the secret is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMaterial {
    ProjectToken,
    /// The callback's top-level `total_payment`.
    TotalPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRule {
    Raw(KeyMaterial),
    /// `hex(md5(material + salt))`
    Md5Salted {
        material: KeyMaterial,
        salt: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    /// `hex(HMAC-SHA256(key = secret, msg = hex(md5(canonical))))`
    HmacSha256OverMd5,
    /// `hex(md5(canonical + secret))`
    Md5WithSecretSuffix,
}

const PRIMARY_FIELDS: &[FieldSpec] = &[
    FieldSpec::text(keys::ORDER_ID),
    FieldSpec::text(keys::CREATED_ORDER_DATE),
    FieldSpec::text(keys::TOTAL_PAYMENT),
    FieldSpec::text(keys::ORDER_ID_CLIENT),
    FieldSpec::text(keys::ACCOUNT_ID),
    FieldSpec::text(keys::RECHARGE),
];

const EXTRA_DATA_FIELDS: &[FieldSpec] = &[
    FieldSpec::json(keys::COUPONS_DISCOUNT),
    FieldSpec::json(keys::LOYALTY_DISCOUNT),
    FieldSpec::text(keys::PAYMENT_GATE_DISCOUNT),
    FieldSpec::text(keys::PAYMENT_GATE_FEES),
];

const PAYMENT_GATE_LINK_FIELDS: &[FieldSpec] = &[FieldSpec::text(keys::LINK)];

const ORDER_REQUEST_FIELDS: &[FieldSpec] = &[
    FieldSpec::text(keys::ORDER_ID),
    FieldSpec::text(keys::ORDER_VALUE),
    FieldSpec::text(keys::PROJECT_TOKEN),
    FieldSpec::text(keys::RECHARGE).or("0"),
];

const PRIMARY_SALT: &str = "@paybizfly";
const EXTRA_DATA_SALT: &str = "@#!$o9iEC29LjDvB1WI";
const ORDER_REQUEST_SALT: &str = "@vcpay";

impl SignatureDomain {
    pub const ALL: [SignatureDomain; 5] = [
        SignatureDomain::Primary,
        SignatureDomain::ExtraData,
        SignatureDomain::SpecialData,
        SignatureDomain::PaymentGateLink,
        SignatureDomain::OrderRequest,
    ];

    pub const fn layout(self) -> FieldLayout {
        match self {
            SignatureDomain::Primary => FieldLayout::Concat(PRIMARY_FIELDS),
            SignatureDomain::ExtraData => FieldLayout::Concat(EXTRA_DATA_FIELDS),
            SignatureDomain::SpecialData => FieldLayout::SortedPairs {
                exclude: keys::SECURE_HASH_SPECIAL,
            },
            SignatureDomain::PaymentGateLink => FieldLayout::Concat(PAYMENT_GATE_LINK_FIELDS),
            SignatureDomain::OrderRequest => FieldLayout::Concat(ORDER_REQUEST_FIELDS),
        }
    }

    pub const fn secret_rule(self) -> SecretRule {
        match self {
            SignatureDomain::Primary => SecretRule::Md5Salted {
                material: KeyMaterial::TotalPayment,
                salt: PRIMARY_SALT,
            },
            SignatureDomain::ExtraData => SecretRule::Md5Salted {
                material: KeyMaterial::TotalPayment,
                salt: EXTRA_DATA_SALT,
            },
            SignatureDomain::SpecialData | SignatureDomain::PaymentGateLink => {
                SecretRule::Raw(KeyMaterial::ProjectToken)
            }
            SignatureDomain::OrderRequest => SecretRule::Md5Salted {
                material: KeyMaterial::ProjectToken,
                salt: ORDER_REQUEST_SALT,
            },
        }
    }

    pub const fn hash_scheme(self) -> HashScheme {
        match self {
            SignatureDomain::PaymentGateLink => HashScheme::Md5WithSecretSuffix,
            _ => HashScheme::HmacSha256OverMd5,
        }
    }

    /// Name of the field that carries this domain's signature on the wire.
    pub const fn signature_field(self) -> &'static str {
        match self {
            SignatureDomain::Primary => keys::SECURE_HASH,
            SignatureDomain::ExtraData => keys::SECURE_HASH_EXTRA,
            SignatureDomain::SpecialData => keys::SECURE_HASH_SPECIAL,
            SignatureDomain::PaymentGateLink => keys::HASH_KEY,
            SignatureDomain::OrderRequest => "secret_key",
        }
    }
}

impl std::fmt::Display for SignatureDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureDomain::Primary => write!(f, "primary"),
            SignatureDomain::ExtraData => write!(f, "extra_data"),
            SignatureDomain::SpecialData => write!(f, "special_data"),
            SignatureDomain::PaymentGateLink => write!(f, "payment_gate_link"),
            SignatureDomain::OrderRequest => write!(f, "order_request"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_field_order_is_fixed() {
        let FieldLayout::Concat(fields) = SignatureDomain::Primary.layout() else {
            panic!("primary domain must concatenate");
        };
        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            [
                "order_id",
                "created_order_date",
                "total_payment",
                "order_id_client",
                "vid",
                "recharge"
            ]
        );
    }

    #[test]
    fn test_every_domain_has_distinct_signature_field() {
        let mut seen = std::collections::HashSet::new();
        for domain in SignatureDomain::ALL {
            assert!(seen.insert(domain.signature_field()), "{domain}");
        }
    }
}
