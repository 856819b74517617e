//! # XVRF Test Suite
//!
//! Cross-crate tests that run both chains against one in-memory channel.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs       # Harness: container, driver, recording consumer
//!     ├── scenarios.rs      # Lifecycle scenarios A-E
//!     ├── delivery.rs       # Duplicated, reordered and lost messages
//!     └── compensation.rs   # Credential lifecycle across the relay
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xv-tests
//! cargo test -p xv-tests integration::scenarios::
//! ```

pub mod integration;
