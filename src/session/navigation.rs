/// Screens the session layer may send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in screen, used when the backend ended the session
    Login,
    /// Unauthenticated landing screen, used after a voluntary logout
    Root,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Root => "/",
        }
    }
}

/// Implemented by the embedding UI to act on session transitions
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: Route) {}
}
