use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Access keys for one account, scoped to the call that requested them.
///
/// Values are handed to scanners by reference and never written to process-wide
/// state. Secret material is wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    #[zeroize(skip)]
    expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Temporary credentials issued by the token service.
    pub fn temporary(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: Some(session_token.into()),
            expires_at: Some(expires_at),
        }
    }

    /// The caller's own long-lived identity.
    pub fn long_lived(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
            expires_at: None,
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::temporary("ASIAEXAMPLE", "s3cr3t-value", "tok3n-value", Utc::now());
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("ASIAEXAMPLE"));
        assert!(!rendered.contains("s3cr3t-value"));
        assert!(!rendered.contains("tok3n-value"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let creds = Credentials::temporary("a", "b", "c", now + Duration::hours(1));
        assert!(!creds.is_expired_at(now));
        assert!(creds.is_expired_at(now + Duration::hours(2)));
        assert!(!Credentials::long_lived("a", "b").is_expired_at(now));
    }
}
