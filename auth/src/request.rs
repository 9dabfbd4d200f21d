//! Framework-neutral request shape and credential extraction.
//!
//! A request is three optional string maps: query parameters, body fields
//! and headers. Hosts build one from whatever their web framework provides.
//!
//! # Extraction precedence
//! - Credentials: the username/password pair is taken from the query if the
//!   query carries a `username`, otherwise from the body. The body never
//!   overrides the query, and the two sources are never mixed.
//! - Token: the `authorization` header (optional `Bearer ` prefix), then the
//!   query `token`, then the body `token`. Blank values count as absent.

use std::collections::HashMap;

const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "password";
const TOKEN_FIELD: &str = "token";
const AUTHORIZATION_HEADER: &str = "authorization";

/// Request-like input for `authenticate` and `authorize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequest {
    pub query: Option<HashMap<String, String>>,
    pub body: Option<HashMap<String, String>>,
    pub headers: Option<HashMap<String, String>>,
}

/// Username and password submitted with a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthRequest {
    #[must_use]
    pub fn with_query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Extract the submitted username/password pair, if any.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let source = [self.query.as_ref(), self.body.as_ref()]
            .into_iter()
            .flatten()
            .find(|fields| fields.contains_key(USERNAME_FIELD))?;

        Some(Credentials {
            username: source.get(USERNAME_FIELD)?.clone(),
            password: source.get(PASSWORD_FIELD)?.clone(),
        })
    }

    /// Extract the presented token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.header_token()
            .or_else(|| field(self.query.as_ref(), TOKEN_FIELD))
            .or_else(|| field(self.body.as_ref(), TOKEN_FIELD))
    }

    fn header_token(&self) -> Option<&str> {
        let value = self
            .headers
            .as_ref()?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION_HEADER))
            .map(|(_, value)| value.trim_start())?;
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .unwrap_or(value)
            .trim();
        if token.is_empty() { None } else { Some(token) }
    }
}

fn field<'a>(fields: Option<&'a HashMap<String, String>>, name: &str) -> Option<&'a str> {
    fields?
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}
