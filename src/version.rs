// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Semantic Embedder

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "onnx-encoder",
    "word-vocabulary",
    "masked-mean-pooling",
    "l2-normalization",
    "random-fallback",
    "chunked-batches",
    "batch-cancellation",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("{} {}", PACKAGE_NAME, VERSION_NUMBER)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "name": PACKAGE_NAME,
        "version": VERSION_NUMBER,
        "features": FEATURES,
    })
}
