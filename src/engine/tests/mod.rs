// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;


/// Initializes tracing output for tests.
fn init() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();
}

/// Imports a hex-encoded AES key and returns its handle.
fn import_aes_key(engine: &SoftEngine, key_hex: &str, alg: AlgId, usage: KeyUsage) -> KeyHandle {
    let material = hex::decode(key_hex).expect("invalid key hex");
    let attrs = KeyAttributes::new(KeyType::Aes, material.len() * 8, alg, usage);
    engine
        .import_key(&attrs, &material)
        .expect("key import failed")
}
