//! Request/response values handed to the validator.

use std::collections::BTreeMap;
use url::Url;

/// Name to ordered values
pub type Multimap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    url: Url,
    method: String,
    /// Keys are lowercase header names
    headers: Multimap,
    cookies: Multimap,
    body: Option<String>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(method, Url::parse(url)?))
    }

    pub fn from_url(method: &str, url: Url) -> Self {
        Self {
            url,
            method: method.to_ascii_uppercase(),
            headers: Multimap::new(),
            cookies: Multimap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &Multimap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn cookies(&self) -> &Multimap {
        &self.cookies
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Full URL with query string and fragment removed
    pub fn url_without_query(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }

    pub fn query_parameters(&self) -> Multimap {
        self.url.query().map(parse_query).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Keys are lowercase header names
    headers: Multimap,
    pub body: String,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Multimap::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn headers(&self) -> &Multimap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }
}

/// Split a raw query string on `&`, then each pair on the first `=`.
///
/// Values are kept verbatim (no percent decoding); a key without `=` gets
/// an empty value and repeated keys accumulate in encounter order.
pub fn parse_query(raw: &str) -> Multimap {
    let mut parameters = Multimap::new();
    for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        parameters
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    parameters
}

/// Parse a `Cookie` header value (`a=1; b=2`) into name/value pairs
pub fn parse_cookie_header(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (name.trim().to_string(), value.trim().to_string())
        })
        .collect()
}
