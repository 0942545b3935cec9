//! Verification outcomes and their localized messages.

use std::collections::BTreeSet;

use bizpay_sdk::objects::{ExtraField, OrderField, ResponseCode};
use serde::{Deserialize, Serialize};

/// Language of the human-readable verdict messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Vietnamese, the gateway's own language.
    #[default]
    Vi,
    En,
}

/// Why a callback was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// A plain order payment.
    Payment,
    /// An account top-up credited to `account_id`.
    Recharge { account_id: String },
    /// A payment-gate redirect link was confirmed.
    PaymentGateLink,
}

/// What was wrong with an untrustworthy extra-data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraDataFault {
    Malformed,
    MissingField(&'static str),
    SignatureMismatch,
    ValueMismatch(BTreeSet<ExtraField>),
}

/// What was wrong with an untrustworthy special-data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialDataFault {
    Malformed,
    MissingHash,
    SignatureMismatch,
}

/// Why a callback was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The gateway itself reported an error.
    GatewayError { message: Option<String> },
    /// A required field is absent.
    MalformedPayload { field: &'static str },
    /// The primary `secure_hash` does not match.
    SignatureMismatch,
    /// The stored order is not completed.
    PaymentNotCompleted { code: ResponseCode },
    /// Callback fields disagree with the stored order.
    ConsistencyMismatch { fields: BTreeSet<OrderField> },
    MissingExtraData,
    UntrustedExtraData(ExtraDataFault),
    MissingSpecialData,
    UntrustedSpecialData(SpecialDataFault),
    PaymentGateLinkMismatch,
}

impl RejectReason {
    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::GatewayError { .. } => "gateway_error",
            RejectReason::MalformedPayload { .. } => "malformed_payload",
            RejectReason::SignatureMismatch => "signature_mismatch",
            RejectReason::PaymentNotCompleted { .. } => "payment_not_completed",
            RejectReason::ConsistencyMismatch { .. } => "consistency_mismatch",
            RejectReason::MissingExtraData => "missing_extra_data",
            RejectReason::UntrustedExtraData(_) => "untrusted_extra_data",
            RejectReason::MissingSpecialData => "missing_special_data",
            RejectReason::UntrustedSpecialData(_) => "untrusted_special_data",
            RejectReason::PaymentGateLinkMismatch => "payment_gate_link_mismatch",
        }
    }

    pub fn message(&self, locale: Locale) -> String {
        use Locale::{En, Vi};

        let text = match (self, locale) {
            (RejectReason::GatewayError { message: Some(message) }, _) => {
                return message.clone();
            }
            (RejectReason::GatewayError { message: None }, Vi)
            | (RejectReason::MalformedPayload { .. }, Vi) => "Thông tin đơn hàng trả về không hợp lệ",
            (RejectReason::GatewayError { message: None }, En)
            | (RejectReason::MalformedPayload { .. }, En) => "Invalid order information returned",
            (RejectReason::SignatureMismatch, Vi) => "Thông tin đơn hàng lỗi",
            (RejectReason::SignatureMismatch, En) => "Order information is incorrect",
            (RejectReason::PaymentNotCompleted { .. }, Vi) => "Đơn hàng thanh toán thất bại",
            (RejectReason::PaymentNotCompleted { .. }, En) => "Order payment failed",
            (RejectReason::ConsistencyMismatch { .. }, Vi) => {
                "Cảnh báo! Thông tin có sự thay đổi bất thường"
            }
            (RejectReason::ConsistencyMismatch { .. }, En) => {
                "Warning! Information has changed abnormally"
            }
            (RejectReason::MissingExtraData, Vi) => "Thiếu thông tin extra data để thực hiện verify",
            (RejectReason::MissingExtraData, En) => "Missing extra data for verification",
            (RejectReason::UntrustedExtraData(_), Vi) => "Dữ liệu extra data không đáng tin cậy",
            (RejectReason::UntrustedExtraData(_), En) => "Extra data is not trustworthy",
            (RejectReason::MissingSpecialData, Vi) => {
                "Thiếu thông tin special data để thực hiện verify"
            }
            (RejectReason::MissingSpecialData, En) => "Missing special data for verification",
            (RejectReason::UntrustedSpecialData(_), Vi) => {
                "Thông tin special data không đáng tin cậy"
            }
            (RejectReason::UntrustedSpecialData(_), En) => "Special data is not trustworthy",
            (RejectReason::PaymentGateLinkMismatch, Vi) => "Lấy link cổng thanh toán thất bại",
            (RejectReason::PaymentGateLinkMismatch, En) => "Failed to retrieve payment gateway link",
        };
        text.to_owned()
    }
}

impl Acceptance {
    pub fn message(&self, locale: Locale) -> String {
        match (self, locale) {
            (Acceptance::Payment, Locale::Vi) => "Thông tin thanh toán được chấp nhận.".to_owned(),
            (Acceptance::Payment, Locale::En) => "Payment information accepted.".to_owned(),
            (Acceptance::Recharge { account_id }, Locale::Vi) => {
                format!("Tài khoản VietID: {account_id} đã được cộng tiền.")
            }
            (Acceptance::Recharge { account_id }, Locale::En) => {
                format!("VietID account {account_id} has been credited.")
            }
            (Acceptance::PaymentGateLink, Locale::Vi) => {
                "Lấy link cổng thanh toán thành công!".to_owned()
            }
            (Acceptance::PaymentGateLink, Locale::En) => {
                "Payment gateway link retrieved successfully!".to_owned()
            }
        }
    }
}

/// Final verdict on a callback, always paired with its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Accepted {
        acceptance: Acceptance,
        message: String,
    },
    Rejected {
        reason: RejectReason,
        message: String,
    },
}

impl VerificationOutcome {
    pub fn accepted(acceptance: Acceptance, locale: Locale) -> Self {
        let message = acceptance.message(locale);
        VerificationOutcome::Accepted {
            acceptance,
            message,
        }
    }

    pub fn rejected(reason: RejectReason, locale: Locale) -> Self {
        let message = reason.message(locale);
        VerificationOutcome::Rejected { reason, message }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, VerificationOutcome::Accepted { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            VerificationOutcome::Accepted { message, .. }
            | VerificationOutcome::Rejected { message, .. } => message,
        }
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            VerificationOutcome::Accepted { .. } => None,
            VerificationOutcome::Rejected { reason, .. } => Some(reason),
        }
    }
}
