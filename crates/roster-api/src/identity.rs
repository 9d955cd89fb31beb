//! Member identity extractor.
//!
//! Authentication itself lives in an upstream collaborator (a gateway or
//! session middleware) that verifies credentials and attaches the member's
//! stable opaque id to the request. This layer only reads that id; it never
//! sees passwords and attaches no meaning to the uuid beyond equality.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Header the upstream identity layer sets on authenticated requests.
pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// Present in a handler signature means the request carried a member id.
pub struct MemberIdentity(pub Uuid);

impl<St> FromRequestParts<St> for MemberIdentity
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(MEMBER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::MissingIdentity(MEMBER_ID_HEADER))?;

    let member_id = Uuid::parse_str(raw)
      .map_err(|_| ApiError::MissingIdentity(MEMBER_ID_HEADER))?;

    Ok(MemberIdentity(member_id))
  }
}
