//! # Memo Vault Testkit
//!
//! Testing utilities for Memo Vault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical JSON, memo id and key-wrap cases with
//!   expected outputs for cross-client verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic parties and drafts for test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use memo_vault_testkit::vectors::{verify_all_vectors, verify_wrap_vector, wrap_vector};
//!
//! for (name, passed, memo_id) in verify_all_vectors() {
//!     println!("{}: {} ({})", name, passed, memo_id);
//! }
//! assert!(verify_wrap_vector(&wrap_vector()).is_ok());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use memo_vault_testkit::generators::{json_value, reordered};
//!
//! proptest! {
//!     #[test]
//!     fn memo_id_is_order_independent(value in json_value(3)) {
//!         prop_assert_eq!(memo_id_for(&value)?, memo_id_for(&reordered(&value))?);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use memo_vault_testkit::fixtures::{sample_payload, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let draft = fixture.draft(sample_payload("INV-1"));
//! assert_eq!(draft.sender, fixture.sender.address);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fixed_time, multi_party_fixtures, sample_payload, Party, TestFixture};
pub use vectors::{all_vectors, verify_all_vectors, verify_wrap_vector, wrap_vector, GoldenVector};
