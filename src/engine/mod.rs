// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Handle-based cipher engine abstraction.
//!
//! This module defines the capability the key-transport algorithms consume:
//! an engine that holds imported key material behind opaque handles and
//! performs cipher operations against those handles. The shape follows
//! platform crypto services (PSA, PKCS#11): keys are imported under a
//! policy (type, size, permitted algorithm, usage flags) and every
//! operation is checked against that policy before it touches key bytes.
//!
//! # Backend
//!
//! One software backend is provided, built on the platform crypto library.
//! The engine trait is the seam for substituting a hardware-backed
//! implementation.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod soft_ossl;
        /// Default software engine for the current platform.
        pub type SoftEngine = soft_ossl::OsslSoftEngine;
    } else {
        compile_error!("Unsupported target OS for the software cipher engine");
    }
}

pub(crate) use super::*;

/// Opaque reference to a key held by an engine.
///
/// Handles are engine-scoped and monotonically assigned; a destroyed
/// handle is never reissued. A handle carries no key material and is
/// freely copyable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyHandle(u64);

impl KeyHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

/// Algorithm identifier attached to keys and operations.
///
/// A key is imported for exactly one algorithm; operations under any other
/// algorithm are rejected with [`TransportError::AlgorithmMismatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgId {
    /// AES-ECB without padding. Unauthenticated single-block primitive,
    /// used here only inside the key-wrap construction.
    EcbNoPadding,

    /// AES-GCM authenticated encryption with associated data.
    Gcm,
}

/// Type of key material held by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    /// AES key (128, 192, or 256 bits).
    Aes,
}

/// Usage flags restricting the operations a key may perform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyUsage {
    encrypt: bool,
    decrypt: bool,
}

impl KeyUsage {
    /// Key may only encrypt.
    pub const ENCRYPT: KeyUsage = KeyUsage {
        encrypt: true,
        decrypt: false,
    };

    /// Key may only decrypt.
    pub const DECRYPT: KeyUsage = KeyUsage {
        encrypt: false,
        decrypt: true,
    };

    /// Key may encrypt and decrypt.
    pub const ENCRYPT_DECRYPT: KeyUsage = KeyUsage {
        encrypt: true,
        decrypt: true,
    };

    /// Returns whether encryption is permitted.
    pub fn allows_encrypt(&self) -> bool {
        self.encrypt
    }

    /// Returns whether decryption is permitted.
    pub fn allows_decrypt(&self) -> bool {
        self.decrypt
    }
}

/// Attributes a key is imported under.
///
/// The engine validates the material against these attributes at import
/// time and enforces them on every subsequent operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyAttributes {
    key_type: KeyType,
    bits: usize,
    alg: AlgId,
    usage: KeyUsage,
}

impl KeyAttributes {
    /// Creates key attributes.
    ///
    /// # Arguments
    ///
    /// * `key_type` - Type of the key material
    /// * `bits` - Key size in bits
    /// * `alg` - The single algorithm the key may be used with
    /// * `usage` - Usage flags restricting permitted operations
    pub fn new(key_type: KeyType, bits: usize, alg: AlgId, usage: KeyUsage) -> Self {
        Self {
            key_type,
            bits,
            alg,
            usage,
        }
    }

    /// Type of the key material.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Key size in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// The algorithm the key was imported for.
    pub fn alg(&self) -> AlgId {
        self.alg
    }

    /// Usage flags.
    pub fn usage(&self) -> KeyUsage {
        self.usage
    }
}

/// Capability trait for handle-based cipher engines.
///
/// All operations are synchronous and blocking. Implementations must allow
/// concurrent operations against the same handle: cipher operations only
/// read key material, so a shared engine reference is safe to use from
/// multiple threads.
///
/// Buffer handling follows the two-phase pattern: pass `None` as the
/// output to query the required buffer size, then call again with a
/// buffer of at least that size.
pub trait CipherEngine {
    /// Imports raw key material under the given attributes.
    ///
    /// The material is validated against the attributes (type, size in
    /// bits). On success the engine owns a copy of the material and
    /// returns an opaque handle for it.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidKeySize` if the material length is
    /// not a valid size for the key type or does not match `attrs.bits()`.
    fn import_key(&self, attrs: &KeyAttributes, material: &[u8])
        -> Result<KeyHandle, TransportError>;

    /// Destroys a key, zeroizing the engine's copy of its material.
    ///
    /// The handle becomes permanently invalid; it is never reissued.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidKeyHandle` if the handle is unknown
    /// or was already destroyed.
    fn destroy_key(&self, key: KeyHandle) -> Result<(), TransportError>;

    /// Unauthenticated cipher encryption.
    ///
    /// For [`AlgId::EcbNoPadding`] the input must be a multiple of the
    /// 16-byte block size; no padding is applied. The output buffer must
    /// be at least one block larger than the input; the returned count is
    /// the number of ciphertext bytes actually produced.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is invalid, the key's policy does
    /// not permit encryption under `alg`, the input is misaligned, the
    /// buffer is too small, or the backend fails.
    fn cipher_encrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError>;

    /// Unauthenticated cipher decryption.
    ///
    /// Same contract as [`cipher_encrypt`](Self::cipher_encrypt), in the
    /// decrypt direction.
    fn cipher_decrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError>;

    /// Authenticated encryption with associated data.
    ///
    /// For [`AlgId::Gcm`] the nonce must be 12 bytes. The authentication
    /// tag is appended to the ciphertext, so the output is 16 bytes longer
    /// than the plaintext. The associated data is authenticated exactly as
    /// supplied; its length is a contract between producer and consumer.
    fn aead_encrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        iv: &[u8],
        aad: &[u8],
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError>;

    /// Authenticated decryption with associated data.
    ///
    /// The input is ciphertext with the 16-byte tag appended. Fails closed:
    /// on any authentication failure no plaintext is written to the output
    /// buffer and [`TransportError::AeadAuthFailed`] is returned.
    fn aead_decrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        iv: &[u8],
        aad: &[u8],
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError>;
}

#[cfg(test)]
mod tests;
