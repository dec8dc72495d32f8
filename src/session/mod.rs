//! Session Management Module
//!
//! Owns the credential lifecycle of the single active session on this device.
//!
//! # Modules
//!
//! - [`manager`] - login, logout, rehydration and token refresh
//! - [`account`] - registration, e-mail verification, profile completion, login history
//! - [`state`] - in-memory session value and its render-gating view
//! - [`navigation`] - routes the session layer asks the UI to show
//! - [`errors`] - error type shared by session and profile operations

pub mod account;
pub mod errors;
pub mod manager;
pub mod navigation;
pub mod state;

pub use account::{LoginRecord, ProfileCompletion, RegisterRequest};
pub use errors::SessionError;
pub use manager::SessionManager;
pub use navigation::{Navigator, NoopNavigator, Route};
pub use state::{Session, SessionState};
