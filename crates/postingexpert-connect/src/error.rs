//! Connect error types

use postingexpert_core::{Platform, SessionError};
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum ConnectError {
    /// No session (or no app user) to connect with
    #[error("not signed in")]
    NotAuthenticated,

    #[error("{} cannot be connected from here", .0.display_name())]
    Unsupported(Platform),

    #[error("{} OAuth client is not configured", .0.display_name())]
    NotConfigured(Platform),

    #[error("popup blocked")]
    PopupBlocked,

    #[error("{} already has a request in flight", .0.display_name())]
    AlreadyInProgress(Platform),

    #[error("session expired")]
    SessionExpired,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("invalid authorization URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ConnectError {
    /// The user has to sign in again
    pub fn requires_login(&self) -> bool {
        match self {
            Self::NotAuthenticated | Self::SessionExpired => true,
            Self::Api(e) => e.is_auth_failure(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectError>;
