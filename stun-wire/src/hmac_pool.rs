// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pooled keyed HMAC contexts.
//!
//! Integrity computation runs on the hot path of every signed message, so keyed HMAC
//! contexts are recycled through per-algorithm free lists instead of being rebuilt from
//! scratch each time.  Acquiring rekeys the context, which re-derives the inner and
//! outer padded key blocks; a recycled context is observationally identical to a freshly
//! constructed one, so callers never see pool state.

use std::sync::{Mutex, PoisonError};

use hmac::digest::block_buffer::Eager;
use hmac::digest::core_api::{BufferKindUser, CoreProxy, FixedOutputCore, UpdateCore};
use hmac::digest::crypto_common::{BlockSizeUser, OutputSizeUser};
use hmac::digest::generic_array::typenum::{IsLess, Le, NonZero, U256};
use hmac::digest::HashMarker;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

pub(crate) type HmacSha1 = Hmac<Sha1>;
pub(crate) type HmacSha256 = Hmac<Sha256>;

pub(crate) const SHA1_SIZE: usize = 20;
pub(crate) const SHA256_SIZE: usize = 32;
const BLOCK_SIZE: usize = 64;

// Contexts held beyond this are dropped rather than pooled.
const POOL_LIMIT: usize = 64;

static SHA1_POOL: Mutex<Vec<HmacSha1>> = Mutex::new(Vec::new());
static SHA256_POOL: Mutex<Vec<HmacSha256>> = Mutex::new(Vec::new());

fn lock<T>(pool: &Mutex<Vec<T>>) -> std::sync::MutexGuard<'_, Vec<T>> {
    // a panic while holding the lock cannot corrupt a free list of contexts
    pool.lock().unwrap_or_else(PoisonError::into_inner)
}

fn keyed<D>(key: &[u8]) -> Hmac<D>
where
    Hmac<D>: Mac + hmac::digest::KeyInit,
    D: CoreProxy,
    D::Core: HashMarker + UpdateCore + FixedOutputCore + BufferKindUser<BufferKind = Eager> + Default + Clone,
    <D::Core as BlockSizeUser>::BlockSize: IsLess<U256>,
    Le<<D::Core as BlockSizeUser>::BlockSize, U256>: NonZero,
{
    // Hmac accepts keys of any length: long keys are hashed, short keys are padded
    <Hmac<D> as Mac>::new_from_slice(key).expect("hmac accepts keys of any length")
}

/// Take a SHA-1 HMAC context keyed with `key`, recycling a pooled one if available.
pub(crate) fn acquire_sha1(key: &[u8]) -> HmacSha1 {
    match lock(&SHA1_POOL).pop() {
        Some(mut mac) => {
            reset_to_sha1(&mut mac, key);
            mac
        }
        None => keyed(key),
    }
}

/// Return a SHA-1 HMAC context to the pool for reuse.
pub(crate) fn put_sha1(mac: HmacSha1) {
    assert_hmac_size::<Sha1>(SHA1_SIZE, BLOCK_SIZE);
    let mut pool = lock(&SHA1_POOL);
    if pool.len() < POOL_LIMIT {
        pool.push(mac);
    }
}

/// Take a SHA-256 HMAC context keyed with `key`, recycling a pooled one if available.
pub(crate) fn acquire_sha256(key: &[u8]) -> HmacSha256 {
    match lock(&SHA256_POOL).pop() {
        Some(mut mac) => {
            reset_to_sha256(&mut mac, key);
            mac
        }
        None => keyed(key),
    }
}

/// Return a SHA-256 HMAC context to the pool for reuse.
pub(crate) fn put_sha256(mac: HmacSha256) {
    assert_hmac_size::<Sha256>(SHA256_SIZE, BLOCK_SIZE);
    let mut pool = lock(&SHA256_POOL);
    if pool.len() < POOL_LIMIT {
        pool.push(mac);
    }
}

/// Rekey a recycled context, discarding whatever key and state it held.
fn reset_to_sha1(mac: &mut HmacSha1, key: &[u8]) {
    *mac = keyed(key);
}

fn reset_to_sha256(mac: &mut HmacSha256, key: &[u8]) {
    *mac = keyed(key);
}

/// Assert that a pooled context type produces the expected digest and block sizes.
/// A mismatch means a context landed in the wrong pool, which is a programmer error.
pub(crate) fn assert_hmac_size<M: OutputSizeUser + BlockSizeUser>(
    size: usize,
    block_size: usize,
) {
    assert_eq!(M::output_size(), size, "pooled hmac digest size mismatch");
    assert_eq!(
        M::block_size(),
        block_size,
        "pooled hmac block size mismatch"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_rekey_matches_fresh() {
        crate::tests::test_init_log();
        // dirty the pool with a differently keyed context
        let mut mac = acquire_sha1(b"first key");
        mac.update(b"data");
        let _ = mac.finalize_reset();
        put_sha1(mac);

        let mut mac = acquire_sha1(b"second key");
        mac.update(b"payload");
        let tag = mac.finalize_reset();
        put_sha1(mac);

        let mut fresh: HmacSha1 = keyed(b"second key");
        fresh.update(b"payload");
        assert_eq!(tag.into_bytes(), fresh.finalize().into_bytes());
    }

    #[test]
    fn pool_rekey_matches_fresh_sha256() {
        crate::tests::test_init_log();
        let mut mac = acquire_sha256(b"first key");
        mac.update(b"data");
        let _ = mac.finalize_reset();
        put_sha256(mac);

        let mut mac = acquire_sha256(b"second key");
        mac.update(b"payload");
        let tag = mac.finalize_reset();
        put_sha256(mac);

        let mut fresh: HmacSha256 = keyed(b"second key");
        fresh.update(b"payload");
        assert_eq!(tag.into_bytes(), fresh.finalize().into_bytes());
    }

    #[test]
    fn sum_is_repeatable_after_reset() {
        crate::tests::test_init_log();
        let mut mac = acquire_sha1(b"key");
        mac.update(b"input");
        let first = mac.finalize_reset();
        mac.update(b"input");
        let second = mac.finalize_reset();
        put_sha1(mac);
        assert_eq!(first.into_bytes(), second.into_bytes());
    }

    #[test]
    fn size_assertion_positive() {
        crate::tests::test_init_log();
        assert_hmac_size::<Sha1>(20, 64);
        assert_hmac_size::<Sha256>(32, 64);
    }

    #[test]
    #[should_panic(expected = "digest size mismatch")]
    fn size_assertion_negative() {
        crate::tests::test_init_log();
        assert_hmac_size::<Sha256>(20, 64);
    }
}
