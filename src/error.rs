use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please accept the terms and conditions")]
    TermsNotAccepted,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("User with this email already exists")]
    EmailTaken,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoginError {
    // One variant on purpose: the caller cannot tell an unknown email from a
    // wrong password, so the UI cannot leak which emails are registered.
    #[error("Invalid email or password")]
    InvalidCredentials,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WatchlistError {
    #[error("Please login to add to watchlist")]
    NotAuthenticated,
    #[error("Already in your watchlist")]
    AlreadyPresent,
}

/// The durable store is unreadable or unwritable. Never fatal: the store keeps
/// operating in memory and the failure is surfaced as a warning.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sled::Error> for PersistError {
    fn from(err: sled::Error) -> Self {
        PersistError::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("cannot connect to email server: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email service returned an error: {0}")]
    Rejected(String),
}
