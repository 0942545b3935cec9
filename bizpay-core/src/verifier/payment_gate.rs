use bizpay_sdk::objects::{OrderFields, PaymentGateRedirect, keys};
use bizpay_sdk::signature::{MissingField, SignatureDomain};
use tracing::{debug, warn};

use super::{Acceptance, CallbackVerifier, RejectReason, VerificationOutcome};

impl<L> CallbackVerifier<L> {
    /// Check the redirect the gateway issues after the customer picks a
    /// payment gate.
    ///
    /// `hashKey` must equal `md5(link + project_token)`.
    pub fn verify_payment_gate_link(&self, redirect: &PaymentGateRedirect) -> VerificationOutcome {
        match self.check_payment_gate_link(redirect) {
            Ok(acceptance) => {
                debug!(link = ?redirect.link, "Payment gate link verified");
                VerificationOutcome::accepted(acceptance, self.locale)
            }
            Err(reason) => {
                debug!(reason = reason.code(), "Payment gate link rejected");
                VerificationOutcome::rejected(reason, self.locale)
            }
        }
    }

    fn check_payment_gate_link(
        &self,
        redirect: &PaymentGateRedirect,
    ) -> Result<Acceptance, RejectReason> {
        let missing = |field: &'static str| RejectReason::MalformedPayload { field };
        redirect.rsp_code.as_ref().ok_or(missing(keys::RSP_CODE))?;
        let hash_key = redirect.hash_key.as_deref().ok_or(missing(keys::HASH_KEY))?;
        let link = redirect.link.as_deref().ok_or(missing(keys::LINK))?;

        let fields = OrderFields::new().with(keys::LINK, link);
        let valid = self
            .signer
            .verify_fields(SignatureDomain::PaymentGateLink, &fields, &fields, hash_key)
            .map_err(|MissingField(field)| missing(field))?;
        if !valid {
            warn!(link, "Payment gate link hash mismatch");
            return Err(RejectReason::PaymentGateLinkMismatch);
        }
        Ok(Acceptance::PaymentGateLink)
    }
}
