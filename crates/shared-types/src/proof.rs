//! # Fulfillment Proofs
//!
//! HMAC-SHA256 authenticity tag over `id || requester || random_value`,
//! keyed by the source adapter's proof key. The ledger treats the proof as
//! opaque bytes; consumers holding the key can check it.

use crate::entities::{Address, RequestId, U256};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a proof produced by `sign_fulfillment`.
pub const PROOF_LEN: usize = 32;

fn proof_input(id: RequestId, requester: &Address, random_value: U256) -> [u8; 84] {
    let mut buf = [0u8; 84];
    id.to_big_endian(&mut buf[..32]);
    buf[32..52].copy_from_slice(requester);
    random_value.to_big_endian(&mut buf[52..]);
    buf
}

/// Produce the proof for a fulfillment.
pub fn sign_fulfillment(
    key: &[u8],
    id: RequestId,
    requester: &Address,
    random_value: U256,
) -> Result<[u8; PROOF_LEN], InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(&proof_input(id, requester, random_value));
    let mut out = [0u8; PROOF_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Check a proof in constant time.
#[must_use]
pub fn verify_fulfillment(
    key: &[u8],
    id: RequestId,
    requester: &Address,
    random_value: U256,
    proof: &[u8],
) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(&proof_input(id, requester, random_value));
    mac.verify_slice(proof).is_ok()
}
