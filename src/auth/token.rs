use anyhow::Context;
use base64ct::{Base64, Encoding};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

/// Session token payload. Carries no expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    #[serde(rename = "iat")]
    pub issued_at_millis: i64,
}

impl SessionClaims {
    pub fn new(email: &str, issued_at: OffsetDateTime) -> Self {
        Self {
            email: email.to_string(),
            issued_at_millis: (issued_at.unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }
}

/// Turns [`SessionClaims`] into the string handed to the client and back.
///
/// `Opaque` is base64 over the JSON payload with no signature: anyone can mint a token for
/// any email, and a token that decodes is all `decode` checks. `Signed` wraps the same payload
/// in an HS256 JWT so that forged tokens fail to decode.
#[derive(Clone)]
pub enum TokenCodec {
    Opaque,
    Signed {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
}

impl TokenCodec {
    pub fn from_secret(secret: Option<&str>) -> Self {
        match secret {
            Some(secret) => TokenCodec::Signed {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            },
            None => TokenCodec::Opaque,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, TokenCodec::Signed { .. })
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation
    }

    pub fn issue(&self, email: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        self.encode(&SessionClaims::new(email, now))
    }

    pub fn encode(&self, claims: &SessionClaims) -> anyhow::Result<String> {
        let token = match self {
            TokenCodec::Opaque => {
                let json = serde_json::to_vec(claims).context("encode session claims")?;
                Base64::encode_string(&json)
            }
            TokenCodec::Signed { encoding, .. } => {
                encode(&Header::new(Algorithm::HS256), claims, encoding)
                    .context("sign session token")?
            }
        };
        debug!(email = %claims.email, signed = self.is_signed(), "session token issued");
        Ok(token)
    }

    pub fn decode(&self, token: &str) -> anyhow::Result<SessionClaims> {
        match self {
            TokenCodec::Opaque => {
                let json = Base64::decode_vec(token)
                    .map_err(|e| anyhow::anyhow!("session token is not base64: {e}"))?;
                serde_json::from_slice(&json).context("session token payload")
            }
            TokenCodec::Signed { decoding, .. } => {
                let data = decode::<SessionClaims>(token, decoding, &Self::validation())
                    .context("verify session token")?;
                Ok(data.claims)
            }
        }
    }
}
