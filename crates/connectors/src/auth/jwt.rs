use crate::{
    auth::{
        error::AuthError,
        keypair::{decode_private_key, pkcs1_der, public_key_fingerprint},
    },
    profile::ConnectionProfile,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

/// Header value telling the endpoint which kind of bearer token we send.
pub const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
pub const TOKEN_TYPE_KEYPAIR_JWT: &str = "KEYPAIR_JWT";

const TOKEN_LIFETIME_MINUTES: i64 = 59;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Signs short-lived key-pair JWTs and caches them until shortly before
/// they expire.
pub struct KeyPairAuth {
    qualified_user: String,
    fingerprint: String,
    encoding_key: EncodingKey,
    cache: Mutex<Option<CachedToken>>,
}

impl KeyPairAuth {
    pub fn new(account: &str, user: &str, private_key_pem: &str) -> Result<Self, AuthError> {
        if account.trim().is_empty() {
            return Err(AuthError::MissingCredential("account"));
        }
        if user.trim().is_empty() {
            return Err(AuthError::MissingCredential("user"));
        }

        let key = decode_private_key(private_key_pem)?;
        let fingerprint = public_key_fingerprint(&key)?;
        let encoding_key = EncodingKey::from_rsa_der(&pkcs1_der(&key)?);

        Ok(Self {
            qualified_user: format!(
                "{}.{}",
                normalize_account(account),
                user.trim().to_uppercase()
            ),
            fingerprint,
            encoding_key,
            cache: Mutex::new(None),
        })
    }

    pub fn from_profile(profile: &ConnectionProfile) -> Result<Self, AuthError> {
        Self::new(&profile.account, &profile.user, profile.private_key.expose())
    }

    /// `ACCOUNT.USER`, the JWT subject.
    pub fn qualified_user(&self) -> &str {
        &self.qualified_user
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `ACCOUNT.USER.SHA256:<fp>`, the JWT issuer.
    pub fn issuer(&self) -> String {
        format!("{}.{}", self.qualified_user, self.fingerprint)
    }

    /// Returns a cached token or signs a fresh one.
    pub fn token(&self) -> Result<String, AuthError> {
        let now = Utc::now();
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(cached) = cache.as_ref() {
            if cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(cached.token.clone());
            }
        }

        let (token, expires_at) = self.sign(now)?;
        debug!(subject = %self.qualified_user, %expires_at, "Signed new key-pair JWT");
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    pub fn claims_at(&self, now: DateTime<Utc>) -> Claims {
        Claims {
            iss: self.issuer(),
            sub: self.qualified_user.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(TOKEN_LIFETIME_MINUTES)).timestamp(),
        }
    }

    fn sign(&self, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), AuthError> {
        let claims = self.claims_at(now);
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        Ok((token, now + Duration::minutes(TOKEN_LIFETIME_MINUTES)))
    }
}

/// Account locators go into the JWT upper-cased and without any region or
/// cloud suffix (`xy12345.us-east-1` becomes `XY12345`).
pub fn normalize_account(account: &str) -> String {
    let account = account.trim();
    account
        .split('.')
        .next()
        .unwrap_or(account)
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/rsa_key.p8");
    const TEST_PUBLIC_KEY: &str = include_str!("../../tests/fixtures/rsa_key.pub");

    #[test]
    fn normalizes_account_locator() {
        assert_eq!(normalize_account("xy12345.us-east-1"), "XY12345");
        assert_eq!(normalize_account(" myorg-acct "), "MYORG-ACCT");
    }

    #[test]
    fn issuer_and_subject_follow_key_pair_convention() {
        let auth = KeyPairAuth::new("xy12345.eu-west-1", "ingest_user", TEST_KEY).unwrap();
        assert_eq!(auth.qualified_user(), "XY12345.INGEST_USER");
        assert_eq!(
            auth.issuer(),
            "XY12345.INGEST_USER.SHA256:tyW0xIwfLvuyNK5ox2/WQl/pWIiZn45hELsTkEBrR3c="
        );
    }

    #[test]
    fn token_verifies_against_public_key() {
        let auth = KeyPairAuth::new("xy12345", "ingest_user", TEST_KEY).unwrap();
        let token = auth.token().unwrap();

        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[auth.issuer()]);
        let decoded = decode::<Claims>(&token, &key, &validation).unwrap();

        assert_eq!(decoded.claims.sub, "XY12345.INGEST_USER");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 59 * 60);
    }

    #[test]
    fn token_is_cached() {
        let auth = KeyPairAuth::new("xy12345", "ingest_user", TEST_KEY).unwrap();
        assert_eq!(auth.token().unwrap(), auth.token().unwrap());
    }

    #[test]
    fn missing_user_is_rejected() {
        assert!(matches!(
            KeyPairAuth::new("xy12345", " ", TEST_KEY),
            Err(AuthError::MissingCredential("user"))
        ));
    }
}
