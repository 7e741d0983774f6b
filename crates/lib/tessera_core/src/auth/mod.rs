//! Authentication and token-lifecycle logic.
//!
//! Credential verification, identity assembly, RS256 token codec, and
//! single-use refresh-token rotation. The HTTP layer (`tessera_api`)
//! consumes these pieces and owns request-time policy wiring.

pub mod bootstrap;
pub mod entrypoint;
pub mod identity;
pub mod keys;
pub mod password;
pub mod queries;
pub mod rotation;
pub mod tokens;
pub mod verifier;

use thiserror::Error;

use crate::auth::entrypoint::EntrypointKind;

/// Prefix for stable, client-facing error codes.
const ERROR_CODE_PREFIX: &str = "TESSERA-";

/// Authentication errors.
///
/// Every variant maps to a stable error code via [`AuthError::code`];
/// HTTP status mapping lives at the API boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No account matches the given {0}")]
    PrincipalNotFound(EntrypointKind),

    #[error("User not found with the given user id")]
    UserNotFound,

    #[error("Incorrect password entered. Please verify your credentials and try again.")]
    IncorrectPassword,

    #[error("User account is disabled")]
    AccountDisabled,

    #[error("User account is locked")]
    AccountLocked,

    #[error("Client not found with the given client id")]
    ClientNotFound,

    #[error("Client id is invalid")]
    ClientIdInvalid,

    #[error("Client secret is invalid")]
    ClientSecretInvalid,

    #[error("Client credentials are expired")]
    ClientExpired,

    #[error("Client status is not active")]
    ClientInactive,

    #[error("Client id is not present in the request")]
    ClientIdRequired,

    #[error("Client secret is not present in the request")]
    ClientSecretRequired,

    #[error("Password is not present in the request")]
    PasswordRequired,

    #[error("Please enter a valid email, username or mobile number to continue")]
    EntrypointRequired,

    #[error("Token is expired")]
    TokenExpired,

    #[error("Token is malformed")]
    TokenMalformed,

    #[error("Refresh token is not allowed for accessing resources")]
    RefreshTokenNotAllowed,

    #[error("Refresh token is invalid")]
    RefreshTokenInvalid,

    #[error("Refresh token is expired")]
    RefreshTokenExpired,

    #[error("Remote address authentication failed")]
    RemoteAddressMismatch,

    #[error("Full user authentication is required to access this resource")]
    FullAuthenticationRequired,

    #[error("Not authorized to access the application")]
    AuthoritiesMissing,

    #[error("Access token is not present in the request")]
    AccessTokenRequired,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Signing key error: {0}")]
    SigningKey(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable error code returned in structured error bodies.
    pub fn code(&self) -> String {
        let number = match self {
            AuthError::UserNotFound => "1006",
            AuthError::IncorrectPassword => "1007",
            AuthError::AccountDisabled => "1008",
            AuthError::AccountLocked => "1009",
            AuthError::PrincipalNotFound(EntrypointKind::Email) => "1010",
            AuthError::PrincipalNotFound(EntrypointKind::Username) => "1011",
            AuthError::PrincipalNotFound(EntrypointKind::Mobile) => "1012",
            AuthError::ClientNotFound => "1013",
            AuthError::ClientIdInvalid => "1014",
            AuthError::ClientExpired => "1015",
            AuthError::ClientSecretInvalid => "1016",
            AuthError::ClientInactive => "1017",
            AuthError::ClientIdRequired => "1018",
            AuthError::ClientSecretRequired => "1019",
            AuthError::PasswordRequired => "1020",
            AuthError::EntrypointRequired => "1021",
            AuthError::AuthoritiesMissing => "1025",
            AuthError::TokenExpired => "1026",
            AuthError::TokenMalformed => "1027",
            AuthError::RefreshTokenNotAllowed => "1028",
            AuthError::FullAuthenticationRequired => "1030",
            AuthError::RemoteAddressMismatch => "1031",
            AuthError::NotLoggedIn => "1040",
            AuthError::RefreshTokenInvalid => "1041",
            AuthError::AccessTokenRequired => "1042",
            AuthError::RefreshTokenExpired => "1045",
            AuthError::SigningKey(_) | AuthError::Db(_) | AuthError::Internal(_) => "1038",
        };
        format!("{ERROR_CODE_PREFIX}{number}")
    }

    /// Whether this failure means an otherwise well-formed token has
    /// expired — callers use this to decide whether a refresh may help.
    pub fn is_token_expired(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired | AuthError::RefreshTokenExpired
        )
    }
}
