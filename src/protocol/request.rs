use super::{GRANT_SCOPE_CAN_REGISTER, GRANT_SCOPE_UNPAIRED};

/// The four calls a client can make against a RadioTAG service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Tag,
    RequestToken,
    Register,
    SubmitRegistration,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Tag => "/tag",
            Endpoint::RequestToken => "/token",
            Endpoint::Register => "/registration_key",
            Endpoint::SubmitRegistration => "/register",
        }
    }
}

/// A fully built protocol request: target endpoint, ordered body fields and
/// an optional auth token header value. Immutable once built; the transport
/// only reads it.
#[derive(Debug, Clone)]
pub struct ProtocolRequest {
    endpoint: Endpoint,
    fields: Vec<(&'static str, String)>,
    auth_token: Option<String>,
}

impl ProtocolRequest {
    pub fn tag(station: &str, time: u64) -> Self {
        Self {
            endpoint: Endpoint::Tag,
            fields: vec![
                ("station", station.to_string()),
                ("time", time.to_string()),
            ],
            auth_token: None,
        }
    }

    pub fn request_token(grant_token: &str) -> Self {
        Self {
            endpoint: Endpoint::RequestToken,
            fields: vec![
                ("grant_scope", GRANT_SCOPE_UNPAIRED.to_string()),
                ("grant_token", grant_token.to_string()),
            ],
            auth_token: None,
        }
    }

    pub fn register(grant_token: &str) -> Self {
        Self {
            endpoint: Endpoint::Register,
            fields: vec![
                ("grant_scope", GRANT_SCOPE_CAN_REGISTER.to_string()),
                ("grant_token", grant_token.to_string()),
            ],
            auth_token: None,
        }
    }

    pub fn submit_registration(registration_key: &str, pin: &str, auth_token: &str) -> Self {
        Self {
            endpoint: Endpoint::SubmitRegistration,
            fields: vec![
                ("registration_key", registration_key.to_string()),
                ("pin", pin.to_string()),
            ],
            auth_token: Some(auth_token.to_string()),
        }
    }

    /// Attaches the auth token header to a tag request from an already
    /// authorized client.
    pub fn with_auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Renders the body as `application/x-www-form-urlencoded` bytes, fields
    /// in insertion order.
    pub fn encoded_body(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
