use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Basic-auth credentials for an upstream API.
///
/// The warehouse authenticates with the API key as username and an empty
/// password; the order-management system uses a key/secret pair.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Credentials with an empty secret (`key:`).
    #[must_use]
    pub fn key_only(key: impl Into<String>) -> Self {
        Self::new(key, String::new())
    }

    /// The `Authorization` header value: `Basic base64(key:secret)`.
    #[must_use]
    pub fn basic_header(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.key, self.secret));
        format!("Basic {encoded}")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"[redacted]")
            .field("secret", &"[redacted]")
            .finish()
    }
}
