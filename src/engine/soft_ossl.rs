// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenSSL-based software cipher engine.
//!
//! This engine keeps imported key material in an in-process table guarded
//! by a mutex and runs cipher operations through OpenSSL. It is the
//! software stand-in for a hardware keystore: handles are monotonic and
//! never reused, key material is zeroized on destroy, and every operation
//! is checked against the key's import policy first.

use std::collections::HashMap;

use openssl::cipher::*;
use openssl::cipher_ctx::*;
use parking_lot::Mutex;
use zeroize::Zeroize;
use zeroize::Zeroizing;

use super::*;

/// AES block size in bytes.
const AES_BLOCK_SIZE: usize = 16;

/// GCM nonce size in bytes.
const GCM_IV_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
const GCM_TAG_SIZE: usize = 16;

/// A key held by the engine: the imported material plus its policy.
struct KeyEntry {
    material: Vec<u8>,
    attrs: KeyAttributes,
}

impl Drop for KeyEntry {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

/// Key table state: entries by handle id plus the allocation counter.
struct KeyTable {
    next_id: u64,
    entries: HashMap<u64, KeyEntry>,
}

/// OpenSSL-backed software cipher engine.
///
/// Thread safety: the key table is mutex-guarded and cipher operations run
/// on a private copy of the key material, so a shared engine reference can
/// serve concurrent operations, including against the same handle.
pub struct OsslSoftEngine {
    keys: Mutex<KeyTable>,
}

impl Default for OsslSoftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OsslSoftEngine {
    /// Creates an empty engine with no imported keys.
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(KeyTable {
                next_id: 1,
                entries: HashMap::new(),
            }),
        }
    }

    /// Looks up a key, returning a copy of its material and its policy.
    ///
    /// The copy keeps the table lock out of backend cipher calls; it is
    /// zeroized when dropped.
    fn lookup(&self, key: KeyHandle) -> Result<(Zeroizing<Vec<u8>>, KeyAttributes), TransportError> {
        let table = self.keys.lock();
        let entry = table
            .entries
            .get(&key.id())
            .ok_or(TransportError::InvalidKeyHandle)?;
        Ok((Zeroizing::new(entry.material.clone()), entry.attrs))
    }

    /// Checks an operation against the key's import policy.
    fn check_policy(
        attrs: &KeyAttributes,
        alg: AlgId,
        decrypt: bool,
    ) -> Result<(), TransportError> {
        if attrs.alg() != alg {
            return Err(TransportError::AlgorithmMismatch);
        }
        let allowed = if decrypt {
            attrs.usage().allows_decrypt()
        } else {
            attrs.usage().allows_encrypt()
        };
        if !allowed {
            return Err(TransportError::KeyUsageNotPermitted);
        }
        Ok(())
    }

    /// Returns the AES-ECB cipher matching the key size.
    fn ecb_cipher(key_size: usize) -> Result<&'static CipherRef, TransportError> {
        match key_size {
            16 => Ok(Cipher::aes_128_ecb()),
            24 => Ok(Cipher::aes_192_ecb()),
            32 => Ok(Cipher::aes_256_ecb()),
            _ => Err(TransportError::InvalidKeySize),
        }
    }

    /// Returns the AES-GCM cipher matching the key size.
    fn gcm_cipher(key_size: usize) -> Result<&'static CipherRef, TransportError> {
        match key_size {
            16 => Ok(Cipher::aes_128_gcm()),
            24 => Ok(Cipher::aes_192_gcm()),
            32 => Ok(Cipher::aes_256_gcm()),
            _ => Err(TransportError::InvalidKeySize),
        }
    }

    /// Runs AES-ECB in either direction.
    ///
    /// The backend requires the output buffer to be one block larger than
    /// the input; the returned count is the exact number of bytes produced.
    fn ecb_run(
        key_bytes: &[u8],
        encrypt: bool,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let cipher = Self::ecb_cipher(key_bytes.len())?;

        if !input.len().is_multiple_of(cipher.block_size()) {
            return Err(TransportError::InvalidCipherInputSize);
        }

        let required = input.len() + cipher.block_size();
        let Some(output) = output else {
            return Ok(required);
        };
        if output.len() < required {
            return Err(TransportError::BufferTooSmall);
        }

        let mut ctx = CipherCtx::new().map_err(|e| {
            tracing::error!(?e, "failed to create cipher context");
            TransportError::CipherEngineFailed
        })?;
        if encrypt {
            ctx.encrypt_init(Some(cipher), Some(key_bytes), None)
                .map_err(|e| {
                    tracing::error!(?e, "ECB encrypt init failed");
                    TransportError::CipherEngineFailed
                })?;
        } else {
            ctx.decrypt_init(Some(cipher), Some(key_bytes), None)
                .map_err(|e| {
                    tracing::error!(?e, "ECB decrypt init failed");
                    TransportError::CipherEngineFailed
                })?;
        }
        ctx.set_padding(false);

        let mut count = ctx
            .cipher_update(input, Some(output))
            .map_err(|e| {
                tracing::error!(?e, "ECB cipher update failed");
                TransportError::CipherEngineFailed
            })?;
        count += ctx.cipher_final(&mut output[count..]).map_err(|e| {
            tracing::error!(?e, "ECB cipher final failed");
            TransportError::CipherEngineFailed
        })?;
        debug_assert!(count == input.len());

        Ok(count)
    }
}

impl CipherEngine for OsslSoftEngine {
    fn import_key(
        &self,
        attrs: &KeyAttributes,
        material: &[u8],
    ) -> Result<KeyHandle, TransportError> {
        match attrs.key_type() {
            KeyType::Aes => {
                if !matches!(material.len(), 16 | 24 | 32) {
                    return Err(TransportError::InvalidKeySize);
                }
            }
        }
        if material.len() * 8 != attrs.bits() {
            return Err(TransportError::InvalidKeySize);
        }

        let mut table = self.keys.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(
            id,
            KeyEntry {
                material: material.to_vec(),
                attrs: *attrs,
            },
        );

        tracing::debug!(id, bits = attrs.bits(), "imported key");
        Ok(KeyHandle::new(id))
    }

    fn destroy_key(&self, key: KeyHandle) -> Result<(), TransportError> {
        let mut table = self.keys.lock();
        // KeyEntry::drop zeroizes the material.
        table
            .entries
            .remove(&key.id())
            .ok_or(TransportError::InvalidKeyHandle)?;
        tracing::debug!(id = key.id(), "destroyed key");
        Ok(())
    }

    fn cipher_encrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let (material, attrs) = self.lookup(key)?;
        Self::check_policy(&attrs, alg, false)?;
        match alg {
            AlgId::EcbNoPadding => Self::ecb_run(material.as_slice(), true, input, output),
            AlgId::Gcm => Err(TransportError::AlgorithmMismatch),
        }
    }

    fn cipher_decrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let (material, attrs) = self.lookup(key)?;
        Self::check_policy(&attrs, alg, true)?;
        match alg {
            AlgId::EcbNoPadding => Self::ecb_run(material.as_slice(), false, input, output),
            AlgId::Gcm => Err(TransportError::AlgorithmMismatch),
        }
    }

    fn aead_encrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        iv: &[u8],
        aad: &[u8],
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let (material, attrs) = self.lookup(key)?;
        Self::check_policy(&attrs, alg, false)?;
        if alg != AlgId::Gcm {
            return Err(TransportError::AlgorithmMismatch);
        }
        if iv.len() != GCM_IV_SIZE {
            return Err(TransportError::AeadInvalidIvLength);
        }

        let expected_len = input.len() + GCM_TAG_SIZE;
        let Some(output) = output else {
            return Ok(expected_len);
        };
        if output.len() < expected_len {
            return Err(TransportError::BufferTooSmall);
        }

        let cipher = Self::gcm_cipher(material.len())?;
        let mut ctx = CipherCtx::new().map_err(|e| {
            tracing::error!(?e, "failed to create cipher context");
            TransportError::CipherEngineFailed
        })?;
        ctx.encrypt_init(Some(cipher), Some(material.as_slice()), Some(iv))
            .map_err(|e| {
                tracing::error!(?e, "GCM encrypt init failed");
                TransportError::CipherEngineFailed
            })?;
        if !aad.is_empty() {
            ctx.cipher_update(aad, None).map_err(|e| {
                tracing::error!(?e, "GCM AAD update failed");
                TransportError::CipherEngineFailed
            })?;
        }

        let count = ctx
            .cipher_update(input, Some(&mut output[..input.len()]))
            .map_err(|e| {
                tracing::error!(?e, "GCM cipher update failed");
                TransportError::CipherEngineFailed
            })?;
        let mut final_block = [0u8; AES_BLOCK_SIZE];
        ctx.cipher_final(&mut final_block).map_err(|e| {
            tracing::error!(?e, "GCM cipher final failed");
            TransportError::CipherEngineFailed
        })?;
        debug_assert!(count == input.len());

        let mut tag = [0u8; GCM_TAG_SIZE];
        ctx.tag(&mut tag).map_err(|e| {
            tracing::error!(?e, "GCM tag extraction failed");
            TransportError::CipherEngineFailed
        })?;
        output[input.len()..expected_len].copy_from_slice(&tag);

        Ok(expected_len)
    }

    fn aead_decrypt(
        &self,
        key: KeyHandle,
        alg: AlgId,
        iv: &[u8],
        aad: &[u8],
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> Result<usize, TransportError> {
        let (material, attrs) = self.lookup(key)?;
        Self::check_policy(&attrs, alg, true)?;
        if alg != AlgId::Gcm {
            return Err(TransportError::AlgorithmMismatch);
        }
        if iv.len() != GCM_IV_SIZE {
            return Err(TransportError::AeadInvalidIvLength);
        }
        if input.len() < GCM_TAG_SIZE {
            return Err(TransportError::AeadInvalidInputLength);
        }

        let (ciphertext, tag) = input.split_at(input.len() - GCM_TAG_SIZE);
        let expected_len = ciphertext.len();
        let Some(output) = output else {
            return Ok(expected_len);
        };
        if output.len() < expected_len {
            return Err(TransportError::BufferTooSmall);
        }

        let cipher = Self::gcm_cipher(material.len())?;
        let mut ctx = CipherCtx::new().map_err(|e| {
            tracing::error!(?e, "failed to create cipher context");
            TransportError::CipherEngineFailed
        })?;
        ctx.decrypt_init(Some(cipher), Some(material.as_slice()), Some(iv))
            .map_err(|e| {
                tracing::error!(?e, "GCM decrypt init failed");
                TransportError::CipherEngineFailed
            })?;

        // Tag must be set before the AAD is processed.
        ctx.set_tag(tag).map_err(|e| {
            tracing::error!(?e, "GCM set tag failed");
            TransportError::CipherEngineFailed
        })?;
        if !aad.is_empty() {
            ctx.cipher_update(aad, None).map_err(|e| {
                tracing::error!(?e, "GCM AAD update failed");
                TransportError::CipherEngineFailed
            })?;
        }

        // Decrypt into scratch so nothing reaches the caller's buffer
        // until the tag has verified.
        let mut scratch = Zeroizing::new(vec![0u8; expected_len]);
        let count = ctx
            .cipher_update(ciphertext, Some(scratch.as_mut_slice()))
            .map_err(|e| {
                tracing::error!(?e, "GCM cipher update failed");
                TransportError::CipherEngineFailed
            })?;

        // Finalization verifies the tag.
        let mut final_block = [0u8; AES_BLOCK_SIZE];
        if ctx.cipher_final(&mut final_block).is_err() {
            tracing::debug!("GCM authentication failed");
            return Err(TransportError::AeadAuthFailed);
        }
        debug_assert!(count == expected_len);

        output[..expected_len].copy_from_slice(scratch.as_slice());
        Ok(expected_len)
    }
}
