//! Testing utilities for keepsake
//!
//! Compiled for unit tests and, through the `testing` feature, for the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - canned tokens, profiles and a fully wired [`TestHarness`]
//! - [`builders`] - fluent builder for unsigned test tokens
//! - [`mock`] - scripted gateway, recording navigator, manual clock, failing store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keepsake::testing::{TestFixtures, TestHarness};
//!
//! let h = TestHarness::new();
//! h.gateway.respond("/api/user-profile", 200, TestFixtures::profile_json());
//! h.sign_in(&TestFixtures::valid_token()).await;
//! ```

pub mod builders;
pub mod fixtures;
pub mod mock;

pub use builders::TestTokenBuilder;
pub use constants::*;
pub use fixtures::{TestFixtures, TestHarness};
pub use mock::{FailingStore, MockClock, MockGateway, RecordingNavigator};

/// Common test constants
pub mod constants {
    /// Normalized test e-mail address
    pub const TEST_EMAIL: &str = "goat@example.com";

    pub const TEST_PASSWORD: &str = "correct horse battery staple";

    pub const TEST_USERNAME: &str = "goatmaster";

    /// Subject claim of test tokens
    pub const TEST_SUBJECT: &str = "42";

    /// 2026-01-01T00:00:00Z
    pub const TEST_NOW_SECONDS: i64 = 1_767_225_600;
}
