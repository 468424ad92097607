//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use memo_vault_core::{Address, IvmsPayload, MemoId, TokenInfo};
use memo_vault_crypto::P256SecretKey;

/// Generate a random Address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a random MemoId.
pub fn memo_id() -> impl Strategy<Value = MemoId> {
    any::<[u8; 32]>().prop_map(MemoId::from_bytes)
}

/// Generate a random P-256 private key.
pub fn secret_key() -> impl Strategy<Value = P256SecretKey> {
    // Almost every 32-byte string is a valid scalar; the filter drops the rest
    any::<[u8; 32]>()
        .prop_filter_map("not a valid scalar", |bytes| {
            P256SecretKey::from_bytes(&bytes).ok()
        })
}

/// Generate a token with plausible metadata.
pub fn token() -> impl Strategy<Value = TokenInfo> {
    (address(), "[A-Z][A-Za-z]{1,11}", 0u8..=18).prop_map(|(address, symbol, decimals)| {
        TokenInfo {
            address,
            symbol,
            decimals,
        }
    })
}

/// Generate a JSON object key.
pub fn json_key() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,11}".prop_map(String::from)
}

/// Generate an arbitrary JSON value, nested up to `depth` levels.
pub fn json_value(depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "\\PC{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(depth, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(json_key(), inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate an IVMS payload with a JSON object body.
pub fn ivms_payload() -> impl Strategy<Value = IvmsPayload> {
    prop::collection::btree_map(json_key(), json_value(2), 1..6)
        .prop_map(|m| IvmsPayload::json(Value::Object(m.into_iter().collect())))
}

/// Generate a small payload that always fits a three-party memo.
pub fn small_ivms_payload() -> impl Strategy<Value = IvmsPayload> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,64}".prop_map(IvmsPayload::text),
        prop::collection::btree_map(json_key(), "[a-zA-Z0-9 ]{0,16}", 1..4).prop_map(|m| {
            IvmsPayload::json(Value::Object(
                m.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
            ))
        }),
    ]
}

/// Shuffle an object's keys into a different insertion order.
pub fn reordered(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.reverse();
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), reordered(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(reordered).collect()),
        other => other.clone(),
    }
}
