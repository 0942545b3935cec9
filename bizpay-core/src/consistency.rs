//! Field-by-field comparison of a callback against the stored order.
//!
//! Values compare by their canonical text, so `80000` and `"80000"` agree
//! and an absent callback field compares as the empty string.

use std::collections::BTreeSet;

use bizpay_sdk::objects::{AuthoritativeOrder, ExtraData, ExtraField, OrderField, OrderFields};

/// Order fields whose callback value differs from the stored record.
pub fn check(authoritative: &AuthoritativeOrder, claimed: &OrderFields) -> BTreeSet<OrderField> {
    OrderField::ALL
        .into_iter()
        .filter(|field| {
            authoritative.field(*field).canonical() != claimed.text_or_empty(field.callback_key())
        })
        .collect()
}

/// Extra-data fields whose callback value differs from the stored record.
///
/// A stored order without an extra-data block disagrees on every field.
pub fn check_extra_data(
    authoritative: Option<&ExtraData>,
    claimed: &ExtraData,
) -> BTreeSet<ExtraField> {
    let Some(authoritative) = authoritative else {
        return ExtraField::ALL.into_iter().collect();
    };
    ExtraField::ALL
        .into_iter()
        .filter(|field| !authoritative.agrees_with(claimed, *field))
        .collect()
}
