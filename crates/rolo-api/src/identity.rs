//! Actor extraction from the headers set by the authenticating proxy.
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `x-rolo-actor` | identity, required |
//! | `x-rolo-role` | `admin` or `user`; defaults to `user` |
//! | `x-rolo-name` | display name; defaults to the identity |

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use rolo_core::actor::{Actor, Role};

use crate::error::ApiError;

pub const ACTOR_HEADER: &str = "x-rolo-actor";
pub const ROLE_HEADER: &str = "x-rolo-role";
pub const NAME_HEADER: &str = "x-rolo-name";

/// Present in a handler means the request named an actor.
pub struct Identified(pub Actor);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
  headers
    .get(name)
    .map(|v| {
      v.to_str()
        .map(str::trim)
        .map_err(|_| ApiError::Unauthenticated(format!("{name} is not valid text")))
    })
    .transpose()
    .map(|v| v.filter(|s| !s.is_empty()))
}

/// Read the actor from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let identity = header(headers, ACTOR_HEADER)?
    .ok_or_else(|| ApiError::Unauthenticated(format!("missing {ACTOR_HEADER} header")))?;

  let role = match header(headers, ROLE_HEADER)? {
    None => Role::default(),
    Some(r) => Role::parse(r)
      .ok_or_else(|| ApiError::Unauthenticated(format!("unknown role {r:?}")))?,
  };

  let mut actor = Actor::new(identity, role);
  if let Some(name) = header(headers, NAME_HEADER)? {
    actor.display_name = name.to_owned();
  }
  Ok(actor)
}

impl<St: Send + Sync> FromRequestParts<St> for Identified {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(Identified)
  }
}
