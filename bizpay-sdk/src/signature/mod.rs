//! Signature derivation for the BizPay protocol.
//!
//! Every signature is computed as
//!
//! ```text
//! hex(HMAC-SHA256(key = domain_secret, msg = hex(md5(canonical_string))))
//! ```
//!
//! except the payment-gate link hash, which is a plain
//! `hex(md5(link + project_token))`. The canonical string and the secret are
//! both domain specific, see [`SignatureDomain`].

mod canonical;
mod domain;

pub use canonical::{canonical_json, canonicalize};
pub use domain::{
    Encoding, FieldLayout, FieldSpec, HashScheme, KeyMaterial, SecretRule, SignatureDomain,
};

use ring::hmac;
use subtle::ConstantTimeEq;

use crate::config::ProjectToken;
use crate::objects::{OrderFields, OrderRequest, keys};

/// Header carrying the request authenticator on gateway API calls.
pub const AUTH_HEADER: &str = "Auth";

/// Header carrying the unix timestamp the authenticator was computed for.
pub const TIME_HEADER: &str = "Time";

/// A field required by a signature domain was absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("missing required field `{0}`")]
pub struct MissingField(pub &'static str);

/// Secret bytes for one domain, derived per call from the project token
/// and/or the order being signed.
#[derive(Clone, PartialEq, Eq)]
pub struct DomainSecret(Box<[u8]>);

impl DomainSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for DomainSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DomainSecret(..)")
    }
}

/// Lowercase hex MD5 of the concatenation of `parts`.
pub fn md5_hex<I, T>(parts: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut context = md5::Context::new();
    for part in parts {
        context.consume(part);
    }
    hex::encode(context.compute().0)
}

/// Authenticator for gateway API requests: `hex(md5(subject + time + token))`.
pub fn api_auth(subject: &str, timestamp: i64, token: &ProjectToken) -> String {
    md5_hex([
        subject.as_bytes(),
        timestamp.to_string().as_bytes(),
        token.expose().as_bytes(),
    ])
}

/// Computes and checks signatures for every [`SignatureDomain`].
///
/// Holds nothing but the project token, so it is cheap to clone and safe to
/// share across tasks.
#[derive(Debug, Clone)]
pub struct Signer {
    project_token: ProjectToken,
}

impl Signer {
    pub fn new(project_token: ProjectToken) -> Self {
        Self { project_token }
    }

    pub fn project_token(&self) -> &ProjectToken {
        &self.project_token
    }

    /// Derive the secret of `domain`.
    ///
    /// `key_fields` supplies order-derived key material (`total_payment`);
    /// for the extra-data domain this is the enclosing callback, not the
    /// extra-data block itself.
    pub fn secret(
        &self,
        domain: SignatureDomain,
        key_fields: &OrderFields,
    ) -> Result<DomainSecret, MissingField> {
        let material = |material: KeyMaterial| -> Result<String, MissingField> {
            match material {
                KeyMaterial::ProjectToken => Ok(self.project_token.expose().to_owned()),
                KeyMaterial::TotalPayment => key_fields
                    .require(keys::TOTAL_PAYMENT)
                    .map(|v| v.canonical().into_owned()),
            }
        };
        let bytes = match domain.secret_rule() {
            SecretRule::Raw(source) => material(source)?.into_bytes(),
            SecretRule::Md5Salted {
                material: source,
                salt,
            } => md5_hex([material(source)?.as_str(), salt]).into_bytes(),
        };
        Ok(DomainSecret(bytes.into_boxed_slice()))
    }

    /// Sign an already canonicalized string.
    pub fn sign(&self, domain: SignatureDomain, canonical: &str, secret: &DomainSecret) -> String {
        match domain.hash_scheme() {
            HashScheme::HmacSha256OverMd5 => {
                let digest = md5_hex([canonical]);
                let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
                hex::encode(hmac::sign(&key, digest.as_bytes()).as_ref())
            }
            HashScheme::Md5WithSecretSuffix => {
                md5_hex([canonical.as_bytes(), secret.as_bytes()])
            }
        }
    }

    /// Check `claimed` against the signature of `canonical` in constant time.
    ///
    /// `claimed` must be lowercase hex, as the counterpart emits it. A
    /// mismatch is a negative result, not an error.
    pub fn verify(
        &self,
        domain: SignatureDomain,
        canonical: &str,
        secret: &DomainSecret,
        claimed: &str,
    ) -> bool {
        if claimed.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        let Ok(claimed) = hex::decode(claimed) else {
            return false;
        };
        match domain.hash_scheme() {
            HashScheme::HmacSha256OverMd5 => {
                let digest = md5_hex([canonical]);
                let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
                hmac::verify(&key, digest.as_bytes(), &claimed).is_ok()
            }
            HashScheme::Md5WithSecretSuffix => {
                let mut context = md5::Context::new();
                context.consume(canonical);
                context.consume(secret.as_bytes());
                let expected = context.compute();
                expected.0[..].ct_eq(&claimed[..]).into()
            }
        }
    }

    /// Canonicalize `fields`, derive the secret from `key_fields` and sign.
    pub fn sign_fields(
        &self,
        domain: SignatureDomain,
        fields: &OrderFields,
        key_fields: &OrderFields,
    ) -> Result<String, MissingField> {
        let canonical = canonicalize(domain, fields)?;
        let secret = self.secret(domain, key_fields)?;
        Ok(self.sign(domain, &canonical, &secret))
    }

    /// Field-level counterpart of [`verify`](Self::verify).
    pub fn verify_fields(
        &self,
        domain: SignatureDomain,
        fields: &OrderFields,
        key_fields: &OrderFields,
        claimed: &str,
    ) -> Result<bool, MissingField> {
        let canonical = canonicalize(domain, fields)?;
        let secret = self.secret(domain, key_fields)?;
        Ok(self.verify(domain, &canonical, &secret, claimed))
    }

    /// `secret_key` for an outbound order request.
    pub fn sign_order_request(&self, request: &OrderRequest) -> Result<String, MissingField> {
        let fields = request
            .to_fields()
            .with(keys::PROJECT_TOKEN, self.project_token.expose());
        self.sign_fields(SignatureDomain::OrderRequest, &fields, &fields)
    }
}
