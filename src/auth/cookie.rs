// Session Cookie Handling
// Reads the session cookie, relays upstream Set-Cookie directives, clears on logout

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, header};
use tracing::warn;

/// Attributes that clear a cookie in every browser: zero max-age plus an epoch expiry.
const EXPIRED: &str = "Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

/// One attribute of a `Set-Cookie` directive, e.g. `HttpOnly` or `Path=/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttribute {
    key: String,
    value: Option<String>,
    raw: String,
}

impl CookieAttribute {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// A `Set-Cookie` directive issued by the identity service.
///
/// Parsed once into name, value and attributes, while keeping the exact text of
/// every segment so that serializing it reproduces the upstream header byte for
/// byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    pair_raw: String,
    attributes: Vec<CookieAttribute>,
}

impl SetCookie {
    /// Parse a `Set-Cookie` header value. Returns `None` when there is no
    /// `name=value` pair or the name is empty.
    pub fn parse(header: &str) -> Option<Self> {
        let mut segments = header.split(';');
        let pair_raw = segments.next()?;
        let (name, value) = pair_raw.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let attributes = segments
            .map(|raw| {
                let trimmed = raw.trim();
                let (key, value) = match trimmed.split_once('=') {
                    Some((k, v)) => (k.trim().to_string(), Some(v.trim().to_string())),
                    None => (trimmed.to_string(), None),
                };
                CookieAttribute {
                    key,
                    value,
                    raw: raw.to_string(),
                }
            })
            .collect();

        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            pair_raw: pair_raw.to_string(),
            attributes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attributes(&self) -> &[CookieAttribute] {
        &self.attributes
    }

    /// Case-insensitive attribute lookup. Flag attributes yield `Some(None)`.
    pub fn attribute(&self, key: &str) -> Option<Option<&str>> {
        self.attributes
            .iter()
            .find(|a| a.key.eq_ignore_ascii_case(key))
            .map(|a| a.value())
    }

    pub fn http_only(&self) -> bool {
        self.attribute("HttpOnly").is_some()
    }

    pub fn secure(&self) -> bool {
        self.attribute("Secure").is_some()
    }

    pub fn path(&self) -> Option<&str> {
        self.attribute("Path").flatten()
    }

    pub fn same_site(&self) -> Option<&str> {
        self.attribute("SameSite").flatten()
    }

    pub fn expires(&self) -> Option<&str> {
        self.attribute("Expires").flatten()
    }

    pub fn max_age(&self) -> Option<&str> {
        self.attribute("Max-Age").flatten()
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_string()).ok()
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pair_raw)?;
        for attribute in &self.attributes {
            write!(f, ";{}", attribute.raw)?;
        }
        Ok(())
    }
}

/// Collect every `Set-Cookie` directive from an upstream response.
pub fn from_upstream(headers: &HeaderMap) -> Vec<SetCookie> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| {
            let parsed = value.to_str().ok().and_then(SetCookie::parse);
            if parsed.is_none() {
                warn!("dropping unparseable Set-Cookie directive from identity service");
            }
            parsed
        })
        .collect()
}

/// Extract the session token from the request's `Cookie` header(s).
pub fn read(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            if name.trim() == cookie_name {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty())
}

/// Append the upstream directives to the outgoing response unchanged.
pub fn write(headers: &mut HeaderMap, cookies: &[SetCookie]) {
    for cookie in cookies {
        match cookie.to_header_value() {
            Some(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            None => warn!(cookie = cookie.name(), "cookie not representable as a header"),
        }
    }
}

/// Append a directive that makes the browser drop the session cookie.
pub fn clear(headers: &mut HeaderMap, cookie_name: &str) {
    let directive = format!("{cookie_name}=; Path=/; HttpOnly; {EXPIRED}");
    match HeaderValue::from_str(&directive) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(_) => warn!(cookie = cookie_name, "session cookie name not representable"),
    }
}
