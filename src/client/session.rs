use tokio::sync::watch;
use tracing::debug;

use crate::auth::dto::PublicUser;

/// Client-side session snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub current_user: Option<PublicUser>,
    pub access_token: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Everything that may change a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RequestStarted,
    RequestFailed(String),
    SignedIn {
        user: PublicUser,
        access_token: String,
    },
    UserUpdated(PublicUser),
    SignedOut,
    AccountDeleted,
}

impl Session {
    pub fn is_signed_in(&self) -> bool {
        self.current_user.is_some()
    }

    /// Pure transition function.
    pub fn apply(self, event: SessionEvent) -> Session {
        match event {
            SessionEvent::RequestStarted => Session {
                loading: true,
                error: None,
                ..self
            },
            SessionEvent::RequestFailed(error) => Session {
                loading: false,
                error: Some(error),
                ..self
            },
            SessionEvent::SignedIn { user, access_token } => Session {
                current_user: Some(user),
                access_token: Some(access_token),
                loading: false,
                error: None,
            },
            SessionEvent::UserUpdated(user) => Session {
                current_user: Some(user),
                loading: false,
                error: None,
                ..self
            },
            SessionEvent::SignedOut | SessionEvent::AccountDeleted => Session::default(),
        }
    }
}

/// Owns the session; observers subscribe, writers dispatch events.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn dispatch(&self, event: SessionEvent) {
        debug!(?event, "session event");
        self.tx.send_modify(|session| {
            *session = std::mem::take(session).apply(event);
        });
    }
}
