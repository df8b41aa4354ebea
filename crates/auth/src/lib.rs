//! `fieldquote-auth`: explicit session boundary.
//!
//! Every catalog and quote operation takes a [`Session`] argument; nothing in
//! the domain looks up an ambient "current user". A [`SessionGate`] is the
//! collaborator that produces sessions (sign in / sign out / current).

pub mod gate;
pub mod session;

pub use gate::{InMemorySessionGate, SessionGate};
pub use session::{AuthError, Credentials, Session};

use fieldquote_core::DomainError;

impl From<AuthError> for DomainError {
    fn from(value: AuthError) -> Self {
        DomainError::unauthenticated(value.to_string())
    }
}
