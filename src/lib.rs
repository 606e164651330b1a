// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Key-transport primitives over a pluggable cipher engine.
//!
//! This crate implements the AES Key Wrap algorithm (RFC 3394) on top of a
//! handle-based block-cipher engine, the way a platform crypto service
//! exposes one: key material is imported into the engine under a usage
//! policy and addressed through opaque handles, and the wrap/unwrap rounds
//! drive the engine's ECB primitive one 16-byte block at a time.
//!
//! # Components
//!
//! - [`CipherEngine`]: the engine capability: key import/destroy,
//!   unauthenticated cipher operations (AES-ECB), and AEAD (AES-GCM).
//! - [`SoftEngine`]: an in-process software engine backed by the platform
//!   crypto library, suitable for hosts without a hardware keystore.
//! - [`KeyWrapAlgo`]: RFC 3394 key wrap and unwrap, parameterized by an
//!   engine and a KEK handle.
//!
//! # Key lifetime
//!
//! The engine never owns a KEK across operations: callers import a key,
//! run wrap/unwrap against the returned handle, and destroy the handle when
//! done. Destroyed handles are never reused.

mod engine;
mod kw;

pub use engine::*;
pub use kw::*;
use thiserror::Error;

/// Error type for engine and key-transport operations.
///
/// All failures are reported as explicit result values; no operation
/// panics, aborts, or retries internally.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransportError {
    // Key wrap/unwrap errors
    /// Wrapped-key or plaintext-key length does not match the declared key
    /// size, the key size is not a multiple of 64 bits, or the semiblock
    /// count is outside the supported range.
    #[error("key wrap invalid input length")]
    InvalidInputLength,
    /// Final integrity value did not match the key-wrap ICV. The wrapped
    /// key was corrupted, tampered with, or unwrapped under the wrong KEK.
    #[error("key wrap integrity check failed")]
    IntegrityCheckFailed,

    // Engine key management errors
    /// Key material length is not a valid AES key size or does not match
    /// the declared size in bits.
    #[error("engine invalid key size")]
    InvalidKeySize,
    /// The key handle is unknown or was already destroyed.
    #[error("engine invalid key handle")]
    InvalidKeyHandle,
    /// The operation is not permitted by the key's usage flags.
    #[error("engine key usage not permitted")]
    KeyUsageNotPermitted,
    /// The operation's algorithm does not match the algorithm the key was
    /// imported for.
    #[error("engine key algorithm mismatch")]
    AlgorithmMismatch,

    // Engine operation errors
    /// The backend cipher operation failed, or reported an output length
    /// the caller cannot accept.
    #[error("cipher engine operation failed")]
    CipherEngineFailed,
    /// Output buffer is too small for the operation.
    #[error("output buffer too small")]
    BufferTooSmall,
    /// Cipher input length is not a multiple of the block size.
    #[error("cipher invalid input size")]
    InvalidCipherInputSize,

    // AEAD errors
    /// AEAD nonce length is invalid for the algorithm.
    #[error("AEAD invalid IV length")]
    AeadInvalidIvLength,
    /// AEAD ciphertext is too short to contain an authentication tag.
    #[error("AEAD invalid input length")]
    AeadInvalidInputLength,
    /// AEAD authentication failed; no plaintext is returned.
    #[error("AEAD authentication failed")]
    AeadAuthFailed,
}
