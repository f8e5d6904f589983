use std::{
    convert::Infallible,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{
        header::{HeaderMap, FORWARDED},
        request::Parts,
    },
};
use forwarded_header_value::ForwardedHeaderValue;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The address of the client making a request.
///
/// Proxy headers are honored first, with `Forwarded` taking precedence over
/// `X-Forwarded-For`. Without either, the peer address of the connection is
/// used.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = forwarded_ip(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(address)| address.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        Ok(Self(ip))
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_forwarded = headers
        .get(FORWARDED)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| ForwardedHeaderValue::from_forwarded(value).ok())
        .and_then(|value| value.remotest_forwarded_for_ip());

    from_forwarded.or_else(|| {
        headers
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| ForwardedHeaderValue::from_x_forwarded_for(value).ok())
            .and_then(|value| value.remotest_forwarded_for_ip())
    })
}

#[cfg(test)]
mod test {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED, HeaderValue::from_static("for=192.0.2.60"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("198.51.100.17"));

        assert_eq!(
            Some("192.0.2.60".parse().unwrap()),
            forwarded_ip(&headers)
        );
    }

    #[test]
    fn x_forwarded_for_uses_client_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.195, 70.41.3.18"),
        );

        assert_eq!(
            Some("203.0.113.195".parse().unwrap()),
            forwarded_ip(&headers)
        );
    }

    #[test]
    fn no_headers_yields_nothing() {
        assert_eq!(None, forwarded_ip(&HeaderMap::new()));
    }
}
