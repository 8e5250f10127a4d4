use crate::error::NotifyError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/signup";

#[derive(Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
struct SignupResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Asks the email service to send the welcome mail. Best-effort: callers fire
/// this after registration has already succeeded and only log the outcome.
pub async fn send_welcome(endpoint: &str, name: &str, email: &str) -> Result<(), NotifyError> {
    let response = reqwest::Client::new()
        .post(endpoint)
        .json(&SignupRequest { name, email })
        .send()
        .await?;

    if response.status().is_success() {
        return Ok(());
    }
    let detail = match response.json::<SignupResponse>().await {
        Ok(body) => body.error.unwrap_or_else(|| "unknown error".to_owned()),
        Err(_) => "unknown error".to_owned(),
    };
    Err(NotifyError::Rejected(detail))
}
