use std::fmt;

/// Opaque bearer credential issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Extracts the credential from an `Authorization: Bearer ...` header value.
    pub fn from_authorization(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") {
            Self::new(token)
        } else {
            None
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Identity/session collaborator supplying the credential attached to
/// generator requests. Session lifecycle lives outside this crate.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<BearerToken>;
}

/// Fixed credential, e.g. the project's anon key or a forwarded user token.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<BearerToken>);

impl StaticCredential {
    pub fn new(token: Option<BearerToken>) -> Self {
        Self(token)
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredential {
    fn bearer_token(&self) -> Option<BearerToken> {
        self.0.clone()
    }
}
