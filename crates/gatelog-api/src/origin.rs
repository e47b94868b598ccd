//! Where a request came from, for the audit trail.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, HeaderName, header, request::Parts},
};
use gatelog_core::store::EventStore;

use crate::AppState;

const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Remote address and user agent of the caller.
///
/// The address is the socket peer when the server was started with connect
/// info. The first `x-forwarded-for` hop replaces it only when
/// [`crate::ApiSettings::trust_forwarded_for`] is on, since any client can
/// send that header.
#[derive(Debug, Clone, Default)]
pub struct Origin {
  pub remote_addr: Option<String>,
  pub user_agent:  Option<String>,
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

impl<S> FromRequestParts<AppState<S>> for Origin
where
  S: EventStore + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let forwarded = state
      .settings
      .trust_forwarded_for
      .then(|| header_str(&parts.headers, &FORWARDED_FOR))
      .flatten()
      .and_then(|v| v.split(',').next().map(|hop| hop.trim().to_owned()))
      .filter(|hop| !hop.is_empty());
    let peer = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| addr.ip().to_string());

    Ok(Origin {
      remote_addr: forwarded.or(peer),
      user_agent:  header_str(&parts.headers, &header::USER_AGENT),
    })
  }
}
