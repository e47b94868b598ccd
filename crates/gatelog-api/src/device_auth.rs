//! Device admission control for the ingestion endpoint.
//!
//! Devices authenticate with an opaque API key in the `x-api-key` header. The
//! server stores only the hex SHA-256 of each key.

use axum::http::HeaderMap;
use gatelog_core::{device::Device, store::EventStore};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Header carrying the device API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Hex SHA-256 of an API key, as stored in the devices table.
pub fn hash_api_key(key: &str) -> String { hex::encode(Sha256::digest(key.as_bytes())) }

/// A fresh random API key: 32 bytes from the OS RNG, hex encoded.
pub fn generate_api_key() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Resolve the credential in `headers` to an active device, and check that it
/// matches the device the batch `declared`.
///
/// Unknown or inactive keys are `401`; a valid key used for another device is
/// `403`. A batch that declares no device is left to validation.
pub async fn admit<S>(
  store: &S,
  headers: &HeaderMap,
  declared: Option<&str>,
) -> Result<Device, ApiError>
where
  S: EventStore,
{
  let key = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|k| !k.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("missing device API key".into()))?;

  let device = store
    .find_device_by_key_hash(hash_api_key(key))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .filter(|device| device.active)
    .ok_or_else(|| ApiError::Unauthorized("invalid or inactive device API key".into()))?;

  if let Some(declared) = declared
    && declared != device.device_id
  {
    return Err(ApiError::Forbidden(format!(
      "key belongs to device {}, batch declares {declared}",
      device.device_id
    )));
  }

  Ok(device)
}
