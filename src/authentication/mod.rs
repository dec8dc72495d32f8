//! Authentication module: the session service trait, its client
//! implementation and the factory that wires it from settings.

pub mod client;
pub mod factory;
pub mod traits;

pub use client::{AuthClient, AuthClientBuilder};
pub use factory::AuthClientFactory;
pub use traits::SessionService;
