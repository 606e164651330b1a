// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! AES Key Wrap (RFC 3394) over a cipher engine.
//!
//! This module implements the key wrap and unwrap algorithms from RFC 3394
//! against a [`CipherEngine`]: the KEK never leaves the engine, and every
//! 16-byte intermediate block is run through the engine's ECB primitive by
//! handle. This is the construction used to transport a content-encryption
//! key (CEK) protected under a key-encryption key (KEK).
//!
//! # Algorithm Overview
//!
//! The wrapped form of an `8n`-byte key is `8(n+1)` bytes: one 8-byte
//! integrity block followed by `n` 8-byte semiblocks. Wrapping runs 6
//! rounds of ECB encryption over (integrity register, semiblock) pairs;
//! unwrapping runs the rounds in reverse with ECB decryption and checks
//! that the integrity register lands back on the fixed initial value
//! `0xA6A6A6A6A6A6A6A6`. A mismatch means corruption, tampering, or the
//! wrong KEK, and no key material is returned.
//!
//! # Supported sizes
//!
//! Keys of 64 to 256 bits in 64-bit steps (1 to 4 semiblocks). The bound
//! is checked at entry; out-of-range sizes are rejected before any engine
//! call.
//!
//! # Standards
//!
//! - RFC 3394: Advanced Encryption Standard (AES) Key Wrap Algorithm
//! - NIST SP 800-38F: Recommendation for Block Cipher Modes of Operation:
//!   Methods for Key Wrapping

use super::*;

/// RFC 3394 key wrap/unwrap, executed through a cipher engine.
///
/// The algorithm object carries only the 8-byte integrity check value; all
/// per-operation state lives on the call stack, so one instance may be
/// shared freely and calls are reentrant. Engine calls are synchronous and
/// the operation runs to completion or fails on the first engine error.
pub struct KeyWrapAlgo {
    /// Integrity check value verified at the end of an unwrap.
    icv: [u8; Self::SEMIBLOCK_SIZE],
}

impl KeyWrapAlgo {
    /// Size of a semiblock in bytes (64 bits).
    const SEMIBLOCK_SIZE: usize = 8;

    /// AES block size in bytes.
    const BLOCK_SIZE: usize = 16;

    /// Default integrity check value from RFC 3394 section 2.2.3.1.
    const DEFAULT_ICV: [u8; Self::SEMIBLOCK_SIZE] = [0xA6; Self::SEMIBLOCK_SIZE];

    /// Largest supported semiblock count (256-bit keys).
    pub const MAX_SEMIBLOCKS: usize = 4;

    /// Creates a key wrap instance with the standard RFC 3394 ICV.
    pub fn with_default_icv() -> Self {
        Self {
            icv: Self::DEFAULT_ICV,
        }
    }

    /// Validates a key size and returns its semiblock count.
    ///
    /// The key size must be a nonzero multiple of 64 bits with at most
    /// [`Self::MAX_SEMIBLOCKS`] semiblocks.
    fn semiblock_count(key_bits: usize) -> Result<usize, TransportError> {
        if key_bits == 0 || !key_bits.is_multiple_of(u64::BITS as usize) {
            return Err(TransportError::InvalidInputLength);
        }
        let n = key_bits / u64::BITS as usize;
        if n > Self::MAX_SEMIBLOCKS {
            return Err(TransportError::InvalidInputLength);
        }
        Ok(n)
    }

    /// Wraps key material under a KEK held by the engine.
    ///
    /// Implements RFC 3394 section 2.2.1. The plaintext length determines
    /// the semiblock count; the wrapped output is 8 bytes longer.
    ///
    /// # Arguments
    ///
    /// * `engine` - The cipher engine holding the KEK
    /// * `kek` - Handle of the key-encryption key; must permit encryption
    /// * `alg` - Cipher algorithm for the engine calls ([`AlgId::EcbNoPadding`])
    /// * `plain` - Key material to wrap (8 to 32 bytes, multiple of 8)
    /// * `output` - Optional output buffer. If `None`, returns the required size.
    ///
    /// # Returns
    ///
    /// The number of bytes written, or the required buffer size if
    /// `output` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TransportError::InvalidInputLength` - Plaintext length is unsupported
    /// - `TransportError::BufferTooSmall` - Output buffer is too small
    /// - `TransportError::CipherEngineFailed` - An engine call failed or
    ///   produced an unexpected output length
    /// - Any policy error reported by the engine for the KEK handle
    pub fn wrap<E: CipherEngine + ?Sized>(
        &self,
        engine: &E,
        kek: KeyHandle,
        alg: AlgId,
        plain: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let n = Self::semiblock_count(plain.len() * 8)?;
        let expected_len = Self::SEMIBLOCK_SIZE * (n + 1);

        let Some(output) = output else {
            return Ok(expected_len);
        };
        if output.len() < expected_len {
            return Err(TransportError::BufferTooSmall);
        }

        // A = ICV, R[1]..R[n] = P[1]..P[n]
        let mut a = self.icv;
        let mut r = Self::load_semiblocks(plain, n);

        let mut block = [0u8; Self::BLOCK_SIZE];
        // The engine may need headroom of one extra block.
        let mut ct = [0u8; Self::BLOCK_SIZE * 2];

        for j in 0..6 {
            for i in 1..=n {
                // B = AES(K, A | R[i])
                block[..Self::SEMIBLOCK_SIZE].copy_from_slice(&a);
                block[Self::SEMIBLOCK_SIZE..].copy_from_slice(&r[i - 1]);
                let written = engine.cipher_encrypt(kek, alg, &block, Some(&mut ct))?;
                if written != Self::BLOCK_SIZE {
                    return Err(TransportError::CipherEngineFailed);
                }

                // A = MSB(64, B) ^ t where t = n*j + i
                let t = n * j + i;
                a.copy_from_slice(&ct[..Self::SEMIBLOCK_SIZE]);
                a[Self::SEMIBLOCK_SIZE - 1] ^= t as u8;

                // R[i] = LSB(64, B)
                r[i - 1].copy_from_slice(&ct[Self::SEMIBLOCK_SIZE..Self::BLOCK_SIZE]);
            }
        }

        // C[0] = A, C[1]..C[n] = R[1]..R[n]
        output[..Self::SEMIBLOCK_SIZE].copy_from_slice(&a);
        Self::store_semiblocks(&r, &mut output[Self::SEMIBLOCK_SIZE..expected_len]);

        Ok(expected_len)
    }

    /// Unwraps a wrapped key under a KEK held by the engine.
    ///
    /// Implements RFC 3394 section 2.2.2 (the index-based variant). The
    /// caller declares the expected key size; the wrapped input must be
    /// exactly `8 * (key_bits/64 + 1)` bytes. All validation happens
    /// before the first engine call.
    ///
    /// On an integrity mismatch nothing is written to the output buffer:
    /// a wrapped key is either recovered whole or not at all. An integrity
    /// failure is an expected outcome for bad input or a wrong KEK, not a
    /// fatal condition; callers may discard the input and continue.
    ///
    /// # Arguments
    ///
    /// * `engine` - The cipher engine holding the KEK
    /// * `kek` - Handle of the key-encryption key; must permit decryption
    /// * `alg` - Cipher algorithm for the engine calls ([`AlgId::EcbNoPadding`])
    /// * `wrapped` - Wrapped key, integrity block plus `n` semiblocks
    /// * `key_bits` - Expected unwrapped key size in bits (64..=256, multiple of 64)
    /// * `output` - Optional output buffer. If `None`, returns the required size.
    ///
    /// # Returns
    ///
    /// The number of bytes written (`key_bits / 8`), or the required
    /// buffer size if `output` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TransportError::InvalidInputLength` - `key_bits` is unsupported or
    ///   the wrapped length does not match it
    /// - `TransportError::BufferTooSmall` - Output buffer is too small
    /// - `TransportError::CipherEngineFailed` - An engine call failed or
    ///   produced an unexpected output length
    /// - `TransportError::IntegrityCheckFailed` - The integrity register did
    ///   not match the ICV after the final round
    /// - Any policy error reported by the engine for the KEK handle
    pub fn unwrap<E: CipherEngine + ?Sized>(
        &self,
        engine: &E,
        kek: KeyHandle,
        alg: AlgId,
        wrapped: &[u8],
        key_bits: usize,
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let n = Self::semiblock_count(key_bits)?;
        if wrapped.len() != Self::SEMIBLOCK_SIZE * (n + 1) {
            return Err(TransportError::InvalidInputLength);
        }
        let expected_len = Self::SEMIBLOCK_SIZE * n;

        let Some(output) = output else {
            return Ok(expected_len);
        };
        if output.len() < expected_len {
            return Err(TransportError::BufferTooSmall);
        }

        // A = C[0], R[1]..R[n] = C[1]..C[n]
        let mut a = [0u8; Self::SEMIBLOCK_SIZE];
        a.copy_from_slice(&wrapped[..Self::SEMIBLOCK_SIZE]);
        let mut r = Self::load_semiblocks(&wrapped[Self::SEMIBLOCK_SIZE..], n);

        let mut block = [0u8; Self::BLOCK_SIZE];
        // The engine may need headroom of one extra block.
        let mut pt = [0u8; Self::BLOCK_SIZE * 2];

        for j in (0..6).rev() {
            for i in (1..=n).rev() {
                // t = n*j + i; at most 24 for supported sizes, so only the
                // low-order byte of A participates in the XOR.
                let t = n * j + i;
                a[Self::SEMIBLOCK_SIZE - 1] ^= t as u8;

                // B = AES-1(K, (A ^ t) | R[i])
                block[..Self::SEMIBLOCK_SIZE].copy_from_slice(&a);
                block[Self::SEMIBLOCK_SIZE..].copy_from_slice(&r[i - 1]);
                let written = engine.cipher_decrypt(kek, alg, &block, Some(&mut pt))?;
                if written != Self::BLOCK_SIZE {
                    return Err(TransportError::CipherEngineFailed);
                }

                // A = MSB(64, B), R[i] = LSB(64, B)
                a.copy_from_slice(&pt[..Self::SEMIBLOCK_SIZE]);
                r[i - 1].copy_from_slice(&pt[Self::SEMIBLOCK_SIZE..Self::BLOCK_SIZE]);
            }
        }

        if a != self.icv {
            tracing::debug!("key unwrap integrity check failed");
            return Err(TransportError::IntegrityCheckFailed);
        }

        // P[1]..P[n] = R[1]..R[n]
        Self::store_semiblocks(&r, &mut output[..expected_len]);

        Ok(expected_len)
    }

    /// Wraps key material and returns the wrapped key as a vector.
    ///
    /// Convenience form of [`wrap`](Self::wrap) that allocates the output.
    pub fn wrap_vec<E: CipherEngine + ?Sized>(
        &self,
        engine: &E,
        kek: KeyHandle,
        alg: AlgId,
        plain: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        let required_size = self.wrap(engine, kek, alg, plain, None)?;
        let mut output = vec![0u8; required_size];
        let written_size = self.wrap(engine, kek, alg, plain, Some(&mut output))?;
        output.truncate(written_size);
        Ok(output)
    }

    /// Unwraps a wrapped key and returns the key material as a vector.
    ///
    /// Convenience form of [`unwrap`](Self::unwrap) that allocates the
    /// output.
    pub fn unwrap_vec<E: CipherEngine + ?Sized>(
        &self,
        engine: &E,
        kek: KeyHandle,
        alg: AlgId,
        wrapped: &[u8],
        key_bits: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let required_size = self.unwrap(engine, kek, alg, wrapped, key_bits, None)?;
        let mut output = vec![0u8; required_size];
        let written_size = self.unwrap(engine, kek, alg, wrapped, key_bits, Some(&mut output))?;
        output.truncate(written_size);
        Ok(output)
    }

    /// Splits `bytes` into `n` semiblocks.
    fn load_semiblocks(bytes: &[u8], n: usize) -> Vec<[u8; Self::SEMIBLOCK_SIZE]> {
        let mut r = Vec::with_capacity(n);
        for chunk in bytes.chunks_exact(Self::SEMIBLOCK_SIZE) {
            let mut semiblock = [0u8; Self::SEMIBLOCK_SIZE];
            semiblock.copy_from_slice(chunk);
            r.push(semiblock);
        }
        r
    }

    /// Concatenates semiblocks into `out`.
    fn store_semiblocks(r: &[[u8; Self::SEMIBLOCK_SIZE]], out: &mut [u8]) {
        for (chunk, semiblock) in out.chunks_exact_mut(Self::SEMIBLOCK_SIZE).zip(r) {
            chunk.copy_from_slice(semiblock);
        }
    }
}

#[cfg(test)]
mod tests;
