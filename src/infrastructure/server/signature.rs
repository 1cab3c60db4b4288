//! Slack request signing (`X-Slack-Signature`)

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Requests older or newer than this are rejected, to stop replays
pub const MAX_SKEW_SECS: i64 = 5 * 60;

const VERSION: &str = "v0";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature headers")]
    Missing,

    #[error("timestamp outside the allowed window")]
    Stale,

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("signature mismatch")]
    Mismatch,
}

/// Checks that a request body was signed with the app's signing secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;
        mac.update(format!("{}:{}:", VERSION, timestamp).as_bytes());
        mac.update(body);
        Ok(mac)
    }

    /// Signature header value for a body, as Slack would send it
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let code = self.mac(timestamp, body)?.finalize().into_bytes();
        Ok(format!("{}={}", VERSION, hex::encode(code)))
    }

    /// Verify headers against the raw body; `now` is unix seconds
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(SignatureError::Missing);
        };

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::Malformed(format!("bad timestamp {}", timestamp)))?;
        if (now - sent_at).abs() > MAX_SKEW_SECS {
            return Err(SignatureError::Stale);
        }

        let digest = signature
            .strip_prefix("v0=")
            .ok_or_else(|| SignatureError::Malformed("unknown version".to_string()))?;
        let expected = hex::decode(digest).map_err(|e| SignatureError::Malformed(e.to_string()))?;

        self.mac(timestamp.trim(), body)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example from Slack's request verification documentation
    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const TIMESTAMP: &str = "1531420618";
    const BODY: &str = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
    const SIGNATURE: &str = "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

    #[test]
    fn test_known_signature() {
        let verifier = SignatureVerifier::new(SECRET);
        assert_eq!(verifier.sign(TIMESTAMP, BODY.as_bytes()).unwrap(), SIGNATURE);
        assert!(verifier
            .verify(Some(TIMESTAMP), Some(SIGNATURE), BODY.as_bytes(), 1531420618)
            .is_ok());
    }

    #[test]
    fn test_rejections() {
        let verifier = SignatureVerifier::new(SECRET);
        let body = BODY.as_bytes();

        assert_eq!(verifier.verify(None, Some(SIGNATURE), body, 0), Err(SignatureError::Missing));
        assert_eq!(
            verifier.verify(Some(TIMESTAMP), Some(SIGNATURE), body, 1531420618 + MAX_SKEW_SECS + 1),
            Err(SignatureError::Stale)
        );
        assert_eq!(
            verifier.verify(Some(TIMESTAMP), Some(SIGNATURE), b"tampered", 1531420618),
            Err(SignatureError::Mismatch)
        );
        assert!(matches!(
            verifier.verify(Some(TIMESTAMP), Some("v1=abcd"), body, 1531420618),
            Err(SignatureError::Malformed(_))
        ));
        assert!(matches!(
            verifier.verify(Some("yesterday"), Some(SIGNATURE), body, 1531420618),
            Err(SignatureError::Malformed(_))
        ));
    }
}
