use std::fmt;

/// In-memory view of the active credential
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    username: Option<String>,
}

/// Render-gating view of a [`Session`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { username: Option<String> },
}

impl Session {
    #[must_use]
    pub fn new(token: Option<String>, username: Option<String>) -> Self {
        Self { token, username }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::Authenticated {
                username: self.username.clone(),
            }
        } else {
            SessionState::Anonymous
        }
    }

    pub(crate) fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.username = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .finish()
    }
}
