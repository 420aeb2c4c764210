//! Cookie Parsing Middleware
//!
//! Decodes the `Cookie` header into a [`RequestCookies`] request extension.

use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

/// Percent-decoded cookie values keyed by name. A repeated name keeps a
/// single value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies(BTreeMap<String, String>);

impl RequestCookies {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let jar = CookieJar::from_headers(headers);
        let mut cookies = BTreeMap::new();
        for cookie in jar.iter() {
            cookies.insert(cookie.name().to_owned(), cookie.value().to_owned());
        }
        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Cookie parsing middleware.
pub async fn parse_cookies(mut request: Request, next: Next) -> Response {
    let cookies = RequestCookies::from_headers(request.headers());
    request.extensions_mut().insert(cookies);
    next.run(request).await
}

impl<S> FromRequestParts<S> for RequestCookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestCookies>()
            .cloned()
            .unwrap_or_else(|| RequestCookies::from_headers(&parts.headers)))
    }
}
