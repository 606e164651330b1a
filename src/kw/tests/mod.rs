// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;

mod wrap_tests;

/// Initializes tracing output for tests.
fn init() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();
}

/// Key wrap test vector: KEK, key data, and the expected wrapped form.
struct KwVector<'a> {
    kek: &'a str,
    key_data: &'a str,
    wrapped: &'a str,
}

/// RFC 3394 section 4 test vectors.
const RFC3394_VECTORS: &[KwVector<'static>] = &[
    // 4.1: 128 bits of key data with a 128-bit KEK
    KwVector {
        kek: "000102030405060708090A0B0C0D0E0F",
        key_data: "00112233445566778899AABBCCDDEEFF",
        wrapped: "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5",
    },
    // 4.2: 128 bits of key data with a 192-bit KEK
    KwVector {
        kek: "000102030405060708090A0B0C0D0E0F1011121314151617",
        key_data: "00112233445566778899AABBCCDDEEFF",
        wrapped: "96778B25AE6CA435F92B5B97C050AED2468AB8A17AD84E5D",
    },
    // 4.3: 128 bits of key data with a 256-bit KEK
    KwVector {
        kek: "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        key_data: "00112233445566778899AABBCCDDEEFF",
        wrapped: "64E8C3F9CE0F5BA263E9777905818A2A93C8191E7D6E8AE7",
    },
    // 4.4: 192 bits of key data with a 192-bit KEK
    KwVector {
        kek: "000102030405060708090A0B0C0D0E0F1011121314151617",
        key_data: "00112233445566778899AABBCCDDEEFF0001020304050607",
        wrapped: "031D33264E15D33268F24EC260743EDCE1C6C7DDEE725A936BA814915C6762D2",
    },
    // 4.5: 192 bits of key data with a 256-bit KEK
    KwVector {
        kek: "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        key_data: "00112233445566778899AABBCCDDEEFF0001020304050607",
        wrapped: "A8F9BC1612C68B3FF6E6F4FBE30E71E4769C8B80A32CB8958CD5D17D6B254DA1",
    },
    // 4.6: 256 bits of key data with a 256-bit KEK
    KwVector {
        kek: "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        key_data: "00112233445566778899AABBCCDDEEFF000102030405060708090A0B0C0D0E0F",
        wrapped: "28C9F404C4B810F4CBCCB35CFB87F8263F5786E2D80ED326CBC7F0E71A99F43BFB988B9B7A02DD21",
    },
];

/// Imports a hex-encoded KEK for ECB use and returns the engine with the
/// key's handle.
fn engine_with_kek(kek_hex: &str, usage: KeyUsage) -> (SoftEngine, KeyHandle) {
    let material = hex::decode(kek_hex).expect("invalid KEK hex");
    let attrs = KeyAttributes::new(
        KeyType::Aes,
        material.len() * 8,
        AlgId::EcbNoPadding,
        usage,
    );
    let engine = SoftEngine::new();
    let kek = engine
        .import_key(&attrs, &material)
        .expect("KEK import failed");
    (engine, kek)
}
