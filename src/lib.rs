#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the keepsake client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod authentication;
pub mod clock;
pub mod gateway;
pub mod profile;
pub mod session;
pub mod settings;
pub mod storage;
pub mod token;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use authentication::{AuthClient, AuthClientBuilder, AuthClientFactory, SessionService};
pub use clock::{Clock, SystemClock};
pub use gateway::{ApiRequest, ApiResponse, GatewayError, HttpGateway, ReqwestGateway, ResponseClass};
pub use profile::{CachedProfile, JewelryItem, ProfileCache, ProfileFetcher, ProfileRecord};
pub use session::{Navigator, Route, SessionError, SessionManager, SessionState};
pub use settings::Settings;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use token::{TokenClaims, TokenCodec, TokenError};
