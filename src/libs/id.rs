use rand::RngCore;
use rand::rngs::OsRng;

use crate::libs::error::{Error, Result};

/// Number of random bytes behind every row identifier.
pub const ID_BYTES: usize = 8;

/// Length of a generated identifier in hex characters.
pub const ID_LEN: usize = ID_BYTES * 2;

/// Generate a fresh row identifier: 16 lowercase hex characters.
///
/// The OS entropy source may block until it is seeded, so the read happens
/// on the blocking pool.
pub async fn generate_id() -> Result<String> {
    tokio::task::spawn_blocking(random_hex)
        .await
        .map_err(|e| Error::RandomnessUnavailable(e.to_string()))?
}

fn random_hex() -> Result<String> {
    let mut bytes = [0u8; ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::RandomnessUnavailable(e.to_string()))?;
    Ok(hex::encode(bytes))
}
