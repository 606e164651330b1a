// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;

#[test]
fn test_wrap_rfc3394_vectors() {
    init();

    for vector in RFC3394_VECTORS {
        let (engine, kek) = engine_with_kek(vector.kek, KeyUsage::ENCRYPT);
        let key_data = hex::decode(vector.key_data).unwrap();
        let wrapped = hex::decode(vector.wrapped).unwrap();

        let algo = KeyWrapAlgo::with_default_icv();
        let actual = algo
            .wrap_vec(&engine, kek, AlgId::EcbNoPadding, &key_data)
            .expect("wrap failed");
        assert_eq!(actual, wrapped);
    }
}

#[test]
fn test_wrap_unwrap_roundtrip() {
    init();

    let (engine, kek) = engine_with_kek(
        "C0C1C2C3C4C5C6C7C8C9CACBCCCDCECFD0D1D2D3D4D5D6D7D8D9DADBDCDDDEDF",
        KeyUsage::ENCRYPT_DECRYPT,
    );
    let algo = KeyWrapAlgo::with_default_icv();

    // 64- through 256-bit key data, including the single-semiblock case.
    for n in 1..=KeyWrapAlgo::MAX_SEMIBLOCKS {
        let key_data: Vec<u8> = (0..n * 8).map(|b| b as u8).collect();

        let wrapped = algo
            .wrap_vec(&engine, kek, AlgId::EcbNoPadding, &key_data)
            .expect("wrap failed");
        assert_eq!(wrapped.len(), key_data.len() + 8);

        let unwrapped = algo
            .unwrap_vec(&engine, kek, AlgId::EcbNoPadding, &wrapped, key_data.len() * 8)
            .expect("unwrap failed");
        assert_eq!(unwrapped, key_data);
    }
}

/// The n = 1 boundary runs the same six rounds as every other size, and
/// its integrity check still trips on tampering.
#[test]
fn test_wrap_unwrap_single_semiblock() {
    init();

    let (engine, kek) = engine_with_kek(
        "000102030405060708090A0B0C0D0E0F",
        KeyUsage::ENCRYPT_DECRYPT,
    );
    let algo = KeyWrapAlgo::with_default_icv();
    let key_data = hex::decode("0011223344556677").unwrap();

    let wrapped = algo
        .wrap_vec(&engine, kek, AlgId::EcbNoPadding, &key_data)
        .unwrap();
    assert_eq!(wrapped.len(), 16);

    let unwrapped = algo
        .unwrap_vec(&engine, kek, AlgId::EcbNoPadding, &wrapped, 64)
        .unwrap();
    assert_eq!(unwrapped, key_data);

    let mut tampered = wrapped.clone();
    tampered[3] ^= 0x10;
    let result = algo.unwrap_vec(&engine, kek, AlgId::EcbNoPadding, &tampered, 64);
    assert_eq!(result, Err(TransportError::IntegrityCheckFailed));
}

#[test]
fn test_wrap_rejects_invalid_lengths() {
    init();

    let (engine, kek) = engine_with_kek(RFC3394_VECTORS[0].kek, KeyUsage::ENCRYPT);
    let algo = KeyWrapAlgo::with_default_icv();

    // Not a multiple of 8 bytes.
    let result = algo.wrap_vec(&engine, kek, AlgId::EcbNoPadding, &[0u8; 12]);
    assert_eq!(result, Err(TransportError::InvalidInputLength));

    // Empty key data.
    let result = algo.wrap_vec(&engine, kek, AlgId::EcbNoPadding, &[]);
    assert_eq!(result, Err(TransportError::InvalidInputLength));

    // More semiblocks than the supported maximum.
    let result = algo.wrap_vec(&engine, kek, AlgId::EcbNoPadding, &[0u8; 40]);
    assert_eq!(result, Err(TransportError::InvalidInputLength));
}

#[test]
fn test_wrap_requires_encrypt_usage() {
    init();

    let (engine, kek) = engine_with_kek(RFC3394_VECTORS[0].kek, KeyUsage::DECRYPT);
    let key_data = hex::decode(RFC3394_VECTORS[0].key_data).unwrap();

    let algo = KeyWrapAlgo::with_default_icv();
    let result = algo.wrap_vec(&engine, kek, AlgId::EcbNoPadding, &key_data);
    assert_eq!(result, Err(TransportError::KeyUsageNotPermitted));
}

#[test]
fn test_wrap_buffer_handling() {
    init();

    let (engine, kek) = engine_with_kek(RFC3394_VECTORS[0].kek, KeyUsage::ENCRYPT);
    let key_data = hex::decode(RFC3394_VECTORS[0].key_data).unwrap();
    let algo = KeyWrapAlgo::with_default_icv();

    let required = algo
        .wrap(&engine, kek, AlgId::EcbNoPadding, &key_data, None)
        .unwrap();
    assert_eq!(required, key_data.len() + 8);

    let mut small = [0u8; 16];
    let result = algo.wrap(&engine, kek, AlgId::EcbNoPadding, &key_data, Some(&mut small));
    assert_eq!(result, Err(TransportError::BufferTooSmall));
}
