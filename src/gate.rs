use crate::{
    processor::WalletError,
    signature::{Message, verify},
};

/// Rejects requests whose signature does not match before any wallet logic runs.
#[derive(Debug, Clone)]
pub struct SignatureGate {
    secret: String,
    allow_bypass: bool,
}

impl SignatureGate {
    pub fn new(secret: impl Into<String>, allow_bypass: bool) -> Self {
        Self {
            secret: secret.into(),
            allow_bypass,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// `skip` is honoured only when the gate was built with `allow_bypass`.
    pub fn admit(&self, body: &Message, skip: bool) -> Result<(), WalletError> {
        if skip && self.allow_bypass {
            tracing::debug!("signature check skipped on request");
            return Ok(());
        }
        if verify(body, &self.secret) {
            Ok(())
        } else {
            tracing::warn!("rejecting request with mismatched signature");
            Err(WalletError::SignatureMismatch)
        }
    }
}

/// Reads the `skipSig` query flag: any non-empty value counts as set,
/// `skipSig=false` included.
pub fn skip_requested(flag: Option<&str>) -> bool {
    flag.is_some_and(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::signature::sign;

    use super::*;

    fn body() -> Message {
        let serde_json::Value::Object(map) = json!({"session_token": "abc123"}) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn admits_signed_requests() {
        let gate = SignatureGate::new("test_token", true);
        let mut body = body();
        sign(&mut body, "test_token");
        assert_eq!(gate.admit(&body, false), Ok(()));
    }

    #[test]
    fn rejects_unsigned_and_mismatched() {
        let gate = SignatureGate::new("test_token", true);
        assert_eq!(
            gate.admit(&body(), false),
            Err(WalletError::SignatureMismatch)
        );
        let mut body = body();
        sign(&mut body, "another_token");
        assert_eq!(gate.admit(&body, false), Err(WalletError::SignatureMismatch));
    }

    #[test]
    fn bypass_only_when_allowed() {
        let open = SignatureGate::new("test_token", true);
        assert_eq!(open.admit(&body(), true), Ok(()));

        let locked = SignatureGate::new("test_token", false);
        assert_eq!(
            locked.admit(&body(), true),
            Err(WalletError::SignatureMismatch)
        );
    }

    #[test]
    fn skip_flag_truthiness() {
        assert!(!skip_requested(None));
        assert!(!skip_requested(Some("")));
        assert!(skip_requested(Some("1")));
        assert!(skip_requested(Some("true")));
        assert!(skip_requested(Some("false")));
    }
}
