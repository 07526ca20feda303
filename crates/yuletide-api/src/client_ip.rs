//! Caller IP resolution for the wall's one-post-per-address rule.
//!
//! The first `X-Forwarded-For` entry wins when it looks like an address,
//! otherwise the socket peer is used. Both are spoofable; the rule is a
//! best-effort rate limit, not an identity.

use std::net::SocketAddr;

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, request::Parts},
};

use crate::error::ApiError;

const MAX_ADDRESS_LEN: usize = 64;

pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    if let Some(ip) = forwarded_for(&parts.headers) {
      return Ok(ClientIp(ip));
    }
    parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| ClientIp(addr.ip().to_string()))
      .ok_or_else(|| ApiError::Internal("client address unavailable".into()))
  }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
  let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
  let first = raw.split(',').next()?.trim();
  if first.is_empty() || first.len() > MAX_ADDRESS_LEN {
    return None;
  }
  first
    .bytes()
    .all(|b| b.is_ascii_hexdigit() || b == b'.' || b == b':')
    .then(|| first.to_owned())
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, Request};

  use super::*;

  async fn extract(req: Request<()>) -> Result<ClientIp, ApiError> {
    let (mut parts, _) = req.into_parts();
    ClientIp::from_request_parts(&mut parts, &()).await
  }

  #[tokio::test]
  async fn first_forwarded_entry_is_used() {
    let req = Request::builder()
      .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
      .body(())
      .unwrap();
    assert_eq!(extract(req).await.unwrap().0, "203.0.113.7");
  }

  #[tokio::test]
  async fn ipv6_forwarded_entry_is_accepted() {
    let req = Request::builder()
      .header("x-forwarded-for", "2001:db8::1")
      .body(())
      .unwrap();
    assert_eq!(extract(req).await.unwrap().0, "2001:db8::1");
  }

  #[tokio::test]
  async fn peer_address_is_the_fallback() {
    let mut req = Request::builder().body(()).unwrap();
    req
      .extensions_mut()
      .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 5555))));
    assert_eq!(extract(req).await.unwrap().0, "192.0.2.4");
  }

  #[tokio::test]
  async fn junk_header_falls_back_to_peer() {
    let mut req = Request::builder().body(()).unwrap();
    req
      .headers_mut()
      .insert("x-forwarded-for", HeaderValue::from_static("<script>"));
    req
      .extensions_mut()
      .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 5], 1))));
    assert_eq!(extract(req).await.unwrap().0, "192.0.2.5");
  }

  #[tokio::test]
  async fn no_address_at_all_is_an_error() {
    let req = Request::builder().body(()).unwrap();
    assert!(matches!(extract(req).await, Err(ApiError::Internal(_))));
  }
}
