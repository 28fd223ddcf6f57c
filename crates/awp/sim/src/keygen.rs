//! Deterministic stand-in for the card's key generator

use sha2::{Digest, Sha256};

/// Expand `seed` into a `len` byte odd modulus with its top bit set
pub(crate) fn modulus(seed: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 32);
    let mut counter = 0u32;
    while out.len() < len {
        let block = Sha256::new()
            .chain_update(seed)
            .chain_update(counter.to_be_bytes())
            .finalize();
        out.extend_from_slice(&block);
        counter += 1;
    }
    out.truncate(len);

    if let Some(first) = out.first_mut() {
        *first |= 0x80;
    }
    if let Some(last) = out.last_mut() {
        *last |= 0x01;
    }
    out
}
