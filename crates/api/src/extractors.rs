//! Request extractors.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, request::Parts},
};
use talentvote_common::AppError;
use talentvote_core::Voter;
use talentvote_db::entities::user;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// Reverse proxies whose forwarding headers are believed.
///
/// Installed as a request extension by the server. Without it no proxy is
/// trusted.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    /// Trust the given proxy addresses.
    pub fn new(proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        Self(proxies.into_iter().collect())
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

/// Client IP.
///
/// The peer address, unless the peer is a trusted proxy. Then the nearest
/// `X-Forwarded-For` hop that is not itself a trusted proxy, then `X-Real-IP`.
pub(crate) fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())?;

    let trusted = match extensions.get::<TrustedProxies>() {
        Some(trusted) if trusted.contains(&peer) => trusted,
        _ => return Some(peer),
    };

    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let hops: Vec<IpAddr> = forwarded
            .split(',')
            .filter_map(|hop| hop.trim().parse().ok())
            .collect();
        // Hops left of the first untrusted one are client-controlled
        if let Some(ip) = hops
            .iter()
            .rev()
            .find(|ip| !trusted.contains(ip))
            .or_else(|| hops.first())
        {
            return Some(*ip);
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .or(Some(peer))
}

/// Client IP extractor. Requests without a determinable address are rejected.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        client_ip(&parts.headers, &parts.extensions)
            .map(ClientIp)
            .ok_or_else(|| AppError::BadRequest("Could not determine client address".to_string()))
    }
}

/// The voter behind a request: the signed-in user if any, else the client IP.
#[derive(Debug, Clone)]
pub struct RequestVoter(pub Voter);

impl<S> FromRequestParts<S> for RequestVoter
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = client_ip(&parts.headers, &parts.extensions).map(|ip| ip.to_string());
        let user = parts.extensions.get::<user::Model>();

        let voter = match (user, ip) {
            (Some(user), ip) => Voter::User {
                id: user.id.clone(),
                ip,
            },
            (None, Some(ip)) => Voter::Anonymous { ip },
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Could not determine client address".to_string(),
                ));
            }
        };
        Ok(Self(voter))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn peer(a: u8, b: u8, c: u8, d: u8) -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([a, b, c, d], 5000)))
    }

    fn behind_proxy() -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(peer(10, 0, 0, 1));
        extensions.insert(TrustedProxies::new(["10.0.0.1".parse().unwrap()]));
        extensions
    }

    #[test]
    fn test_trusted_proxy_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        let ip = client_ip(&headers, &behind_proxy()).unwrap();

        assert_eq!(ip.to_string(), "203.0.113.9");
    }

    #[test]
    fn test_trusted_proxy_ignores_client_supplied_hops() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.1.1.1, 203.0.113.9"),
        );

        let ip = client_ip(&headers, &behind_proxy()).unwrap();

        assert_eq!(ip.to_string(), "203.0.113.9");
    }

    #[test]
    fn test_trusted_proxy_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));

        let ip = client_ip(&headers, &behind_proxy()).unwrap();

        assert_eq!(ip.to_string(), "203.0.113.9");
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut extensions = Extensions::new();
        extensions.insert(peer(198, 51, 100, 4));

        let ip = client_ip(&HeaderMap::new(), &extensions).unwrap();

        assert_eq!(ip.to_string(), "198.51.100.4");
    }

    #[test]
    fn test_no_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        assert!(client_ip(&headers, &Extensions::new()).is_none());
    }

    #[tokio::test]
    async fn test_forwarded_headers_from_untrusted_peer_do_not_change_voter() {
        let mut keys = Vec::new();
        for forwarded in ["1.1.1.1", "2.2.2.2"] {
            let (mut parts, ()) = Request::builder()
                .header("x-forwarded-for", forwarded)
                .header("x-real-ip", forwarded)
                .extension(peer(198, 51, 100, 4))
                .extension(TrustedProxies::new(["10.0.0.1".parse().unwrap()]))
                .body(())
                .unwrap()
                .into_parts();

            let RequestVoter(voter) = RequestVoter::from_request_parts(&mut parts, &())
                .await
                .unwrap();
            keys.push(voter.key());
        }

        assert_eq!(keys, ["ip:198.51.100.4", "ip:198.51.100.4"]);
    }

    #[tokio::test]
    async fn test_anonymous_voter_uses_ip() {
        let (mut parts, ()) = Request::builder()
            .extension(peer(203, 0, 113, 9))
            .body(())
            .unwrap()
            .into_parts();

        let RequestVoter(voter) = RequestVoter::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(voter.key(), "ip:203.0.113.9");
    }
}
