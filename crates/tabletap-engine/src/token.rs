//! # QR Token Generation
//!
//! Opaque unit credentials. A token is the only thing a diner's phone
//! learns from the QR code, so it must be unguessable and collision-free;
//! we draw from the OS CSPRNG.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use tabletap_core::QR_TOKEN_LEN;

/// Generates a fresh unit credential.
///
/// 32 alphanumeric characters from the OS CSPRNG ≈ 190 bits of entropy:
/// collisions are negligible, and the UNIQUE index on `qr_token` is the
/// backstop if the negligible ever happens.
pub fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(QR_TOKEN_LEN)
        .map(char::from)
        .collect()
}
