//! Cognito `SECRET_HASH` computation.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// `base64(HMAC-SHA256(client_secret, username + client_id))`.
///
/// Cognito requires this on user-facing calls when the app client has a secret.
#[must_use]
pub fn secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(client_secret.as_bytes()) else {
        unreachable!("HMAC-SHA256 accepts any key length");
    };
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    BASE64_STANDARD.encode(mac.finalize().into_bytes())
}
