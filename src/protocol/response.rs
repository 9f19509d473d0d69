/// An HTTP response reduced to the pieces the protocol reads: status code,
/// header pairs in arrival order, and the raw body.
#[derive(Debug, Clone)]
pub struct ProtocolResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl ProtocolResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// First value for `name`, compared case-insensitively. The protocol
    /// never reads more than the first occurrence of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}
