//! Callback verification.
//!
//! A callback is accepted only after every check passes, in this order:
//!
//! 1. the gateway did not report an error and the signed fields are present
//! 2. the primary `secure_hash` matches
//! 3. the stored order is fetched and its response code is completed
//! 4. the callback agrees with the stored order field by field
//! 5. the `extraData` block is present, signed, and agrees with the stored copy
//! 6. the `specialData` block is present and signed
//!
//! The first failing check decides the rejection reason. A lookup that fails
//! or times out is an error, not a rejection, so the caller can retry.

mod outcome;
mod payment_gate;

pub use outcome::{
    Acceptance, ExtraDataFault, Locale, RejectReason, SpecialDataFault, VerificationOutcome,
};

use std::time::Duration;

use bizpay_sdk::Signer;
use bizpay_sdk::objects::{AuthoritativeOrder, Block, CallbackPayload, keys};
use bizpay_sdk::signature::{MissingField, SignatureDomain};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consistency;
use crate::lookup::{LookupError, OrderLookup};

/// Default deadline for the authoritative order lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Verification could not reach a verdict.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("authoritative order lookup failed: {0}")]
    LookupFailed(#[from] LookupError),
}

/// Why the pipeline stopped early.
enum Halt {
    Reject(RejectReason),
    Lookup(LookupError),
}

impl From<RejectReason> for Halt {
    fn from(reason: RejectReason) -> Self {
        Halt::Reject(reason)
    }
}

impl From<LookupError> for Halt {
    fn from(err: LookupError) -> Self {
        Halt::Lookup(err)
    }
}

/// Verifies gateway callbacks against the project's signing secrets and the
/// gateway's stored order records.
#[derive(Debug, Clone)]
pub struct CallbackVerifier<L> {
    signer: Signer,
    lookup: L,
    lookup_timeout: Duration,
    locale: Locale,
}

impl<L> CallbackVerifier<L> {
    pub fn new(signer: Signer, lookup: L) -> Self {
        Self {
            signer,
            lookup,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            locale: Locale::default(),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Check only the gateway error flag and the primary signature.
    ///
    /// Performs no lookup, so it proves the callback came from someone
    /// holding the signing secret but not that the order was paid.
    pub fn verify_signature_only(&self, payload: &CallbackPayload) -> VerificationOutcome {
        let verdict = check_presence(payload)
            .and_then(|()| self.check_primary_signature(payload))
            .map(|()| acceptance_for(payload));
        self.conclude(payload, verdict)
    }

    fn check_primary_signature(&self, payload: &CallbackPayload) -> Result<(), RejectReason> {
        let claimed = payload
            .secure_hash()
            .ok_or(RejectReason::MalformedPayload {
                field: keys::SECURE_HASH,
            })?;
        let valid = self
            .signer
            .verify_fields(
                SignatureDomain::Primary,
                &payload.fields,
                &payload.fields,
                &claimed,
            )
            .map_err(|MissingField(field)| RejectReason::MalformedPayload { field })?;

        if !valid {
            warn!(
                order_id_client = ?payload.order_id_client(),
                "Primary signature mismatch"
            );
            return Err(RejectReason::SignatureMismatch);
        }
        Ok(())
    }

    fn check_extra_data(
        &self,
        order: &AuthoritativeOrder,
        payload: &CallbackPayload,
    ) -> Result<(), RejectReason> {
        let extra = match &payload.extra_data {
            Block::Missing => return Err(RejectReason::MissingExtraData),
            Block::Malformed(err) => {
                debug!(error = %err, "extraData is not valid JSON");
                return Err(RejectReason::UntrustedExtraData(ExtraDataFault::Malformed));
            }
            Block::Present(extra) => extra,
        };

        let claimed = extra.secure_hash_extra.as_deref().ok_or(
            RejectReason::UntrustedExtraData(ExtraDataFault::MissingField(keys::SECURE_HASH_EXTRA)),
        )?;
        let valid = self
            .signer
            .verify_fields(
                SignatureDomain::ExtraData,
                &extra.to_fields(),
                &payload.fields,
                claimed,
            )
            .map_err(|MissingField(field)| {
                RejectReason::UntrustedExtraData(ExtraDataFault::MissingField(field))
            })?;
        if !valid {
            warn!(
                order_id_client = ?payload.order_id_client(),
                "extraData signature mismatch"
            );
            return Err(RejectReason::UntrustedExtraData(
                ExtraDataFault::SignatureMismatch,
            ));
        }

        let mismatched = consistency::check_extra_data(order.extra_data.as_ref(), extra);
        if !mismatched.is_empty() {
            warn!(
                order_id_client = ?payload.order_id_client(),
                fields = ?mismatched,
                "extraData disagrees with the stored order"
            );
            return Err(RejectReason::UntrustedExtraData(
                ExtraDataFault::ValueMismatch(mismatched),
            ));
        }
        Ok(())
    }

    fn check_special_data(&self, payload: &CallbackPayload) -> Result<(), RejectReason> {
        let special = match &payload.special_data {
            Block::Missing => return Err(RejectReason::MissingSpecialData),
            Block::Malformed(err) => {
                debug!(error = %err, "specialData is not valid JSON");
                return Err(RejectReason::UntrustedSpecialData(
                    SpecialDataFault::Malformed,
                ));
            }
            Block::Present(special) => special,
        };

        let claimed = special
            .secure_hash_special()
            .ok_or(RejectReason::UntrustedSpecialData(
                SpecialDataFault::MissingHash,
            ))?;
        let valid = self
            .signer
            .verify_fields(
                SignatureDomain::SpecialData,
                special.fields(),
                special.fields(),
                claimed,
            )
            .map_err(|_| RejectReason::UntrustedSpecialData(SpecialDataFault::MissingHash))?;
        if !valid {
            warn!(
                order_id_client = ?payload.order_id_client(),
                "specialData signature mismatch"
            );
            return Err(RejectReason::UntrustedSpecialData(
                SpecialDataFault::SignatureMismatch,
            ));
        }
        Ok(())
    }

    fn conclude(
        &self,
        payload: &CallbackPayload,
        verdict: Result<Acceptance, RejectReason>,
    ) -> VerificationOutcome {
        match verdict {
            Ok(acceptance) => {
                info!(
                    order_id_client = ?payload.order_id_client(),
                    acceptance = ?acceptance,
                    "Callback accepted"
                );
                VerificationOutcome::accepted(acceptance, self.locale)
            }
            Err(reason) => {
                info!(
                    order_id_client = ?payload.order_id_client(),
                    reason = reason.code(),
                    "Callback rejected"
                );
                VerificationOutcome::rejected(reason, self.locale)
            }
        }
    }
}

impl<L: OrderLookup> CallbackVerifier<L> {
    /// Run the full verification pipeline on a callback.
    ///
    /// Returns `Err` only when the stored order could not be fetched.
    pub async fn verify(&self, payload: &CallbackPayload) -> Result<VerificationOutcome, VerifyError> {
        match self.run(payload).await {
            Ok(acceptance) => Ok(self.conclude(payload, Ok(acceptance))),
            Err(Halt::Reject(reason)) => Ok(self.conclude(payload, Err(reason))),
            Err(Halt::Lookup(err)) => {
                warn!(
                    order_id_client = ?payload.order_id_client(),
                    error = %err,
                    "Order lookup failed; no verdict"
                );
                Err(err.into())
            }
        }
    }

    async fn run(&self, payload: &CallbackPayload) -> Result<Acceptance, Halt> {
        check_presence(payload)?;
        self.check_primary_signature(payload)?;
        debug!("Primary signature valid");

        let order = self.fetch_authoritative(payload).await?;
        debug!("Stored order completed");

        let mismatched = consistency::check(&order, &payload.fields);
        if !mismatched.is_empty() {
            warn!(
                order_id_client = ?payload.order_id_client(),
                fields = ?mismatched,
                "Callback disagrees with the stored order"
            );
            return Err(RejectReason::ConsistencyMismatch { fields: mismatched }.into());
        }

        self.check_extra_data(&order, payload)?;
        self.check_special_data(payload)?;
        Ok(acceptance_for(payload))
    }

    async fn fetch_authoritative(
        &self,
        payload: &CallbackPayload,
    ) -> Result<AuthoritativeOrder, Halt> {
        let order_id_client = payload
            .order_id_client()
            .ok_or(RejectReason::MalformedPayload {
                field: keys::ORDER_ID_CLIENT,
            })?;

        let response = tokio::time::timeout(
            self.lookup_timeout,
            self.lookup.fetch_order(&order_id_client),
        )
        .await
        .map_err(|_| LookupError::Timeout(self.lookup_timeout))??;

        if !response.rsp_code.is_completed() {
            debug!(
                %order_id_client,
                rsp_code = %response.rsp_code,
                "Stored order is not completed"
            );
            return Err(RejectReason::PaymentNotCompleted {
                code: response.rsp_code,
            }
            .into());
        }

        Ok(response.order_info.ok_or(LookupError::MissingOrderInfo)?)
    }
}

fn check_presence(payload: &CallbackPayload) -> Result<(), RejectReason> {
    if payload.error.is_some() {
        return Err(RejectReason::GatewayError {
            message: payload.message.clone().filter(|m| !m.is_empty()),
        });
    }
    for field in [keys::ORDER_ID, keys::CREATED_ORDER_DATE, keys::SECURE_HASH] {
        if !payload.fields.contains(field) {
            return Err(RejectReason::MalformedPayload { field });
        }
    }
    Ok(())
}

fn acceptance_for(payload: &CallbackPayload) -> Acceptance {
    if payload.is_recharge() {
        Acceptance::Recharge {
            account_id: payload.account_id().into_owned(),
        }
    } else {
        Acceptance::Payment
    }
}
