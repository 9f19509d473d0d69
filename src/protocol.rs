//! Wire-level types and interpretation rules for the RadioTAG token
//! exchange. The protocol layers authorization on top of plain form-encoded
//! POSTs through custom response headers; everything the client reads off the
//! wire is named here.

pub mod error;
pub mod event;
pub mod interpreter;
pub mod request;
pub mod response;

pub use error::ProtocolError;
pub use event::ProtocolEvent;
pub use interpreter::{FollowUp, interpret};
pub use request::{Endpoint, ProtocolRequest};
pub use response::ProtocolResponse;

/// Request and response header carrying the long-lived auth token.
pub const AUTH_TOKEN_HEADER: &str = "X-RadioTAG-Auth-Token";
/// Response header carrying a short-lived grant token. The prototype server
/// sends this one with different capitalisation than the other headers;
/// lookups are case-insensitive so it makes no difference on the wire.
pub const GRANT_TOKEN_HEADER: &str = "X-Radiotag-Grant-Token";
pub const GRANT_SCOPE_HEADER: &str = "X-RadioTAG-Grant-Scope";
pub const ACCOUNT_NAME_HEADER: &str = "X-RadioTAG-Account-Name";
pub const REGISTRATION_KEY_HEADER: &str = "X-RadioTAG-Registration-Key";
pub const REGISTRATION_URL_HEADER: &str = "X-RadioTAG-Registration-Url";

/// Grant scope of a client that holds no account pairing yet.
pub const GRANT_SCOPE_UNPAIRED: &str = "unpaired";
/// Grant scope signalling that the server will accept a registration request.
pub const GRANT_SCOPE_CAN_REGISTER: &str = "can_register";
