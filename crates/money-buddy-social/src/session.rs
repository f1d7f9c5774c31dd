// Authenticated session acquisition.
//
// Produces a logged-in client handle from stored credentials. Missing
// credentials fail immediately; login failures are retried on a fixed
// schedule (quiescence delay, then a constant delay between attempts) until
// the attempt ceiling is reached.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use money_buddy_core::config::{CredentialsConfig, TwitterConfig};

use crate::client::SocialClient;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pause before the first login attempt, to look less like automation.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Pause between a failed attempt and the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Total login attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Account identifier or secret absent from configuration. Never retried.
    #[error("Twitter credentials not found in runtime config")]
    MissingCredentials,

    /// Every attempt failed; `cause` is the last underlying failure.
    #[error("Failed to login to Twitter after {attempts} attempt(s): {cause}")]
    Login { attempts: u32, cause: String },
}

// ---------------------------------------------------------------------------
// Credentials and policy
// ---------------------------------------------------------------------------

/// Account identifier and secret as read from configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self {
            username: config.twitter_username.clone(),
            password: config.twitter_password.clone(),
        }
    }

    /// Both values, if both are present and non-blank.
    fn resolve(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((username, password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fixed retry schedule for login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginPolicy {
    pub initial_delay: Duration,
    pub retry_delay: Duration,
    pub max_attempts: u32,
    /// Optional cap on a single attempt; an attempt that exceeds it counts as failed.
    pub attempt_timeout: Option<Duration>,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: None,
        }
    }
}

impl LoginPolicy {
    pub fn from_config(config: &TwitterConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.login_delay_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_attempts: config.max_login_attempts.max(1),
            attempt_timeout: config.attempt_timeout_secs.map(Duration::from_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Session handle
// ---------------------------------------------------------------------------

/// A client bound to one successful login. Owned exclusively by whoever
/// acquired it; never cached or shared.
#[derive(Debug)]
pub struct Session<C> {
    client: C,
    username: String,
}

impl<C> Session<C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The account this session is logged in as.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn into_client(self) -> C {
        self.client
    }
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

/// Log a freshly built client in, retrying per `policy`.
///
/// `new_client` is only called once credentials have been validated, so a
/// configuration error performs no I/O at all.
pub async fn acquire_session<C, F>(
    credentials: &Credentials,
    policy: &LoginPolicy,
    new_client: F,
) -> Result<Session<C>, SessionError>
where
    C: SocialClient,
    F: FnOnce() -> C,
{
    let (username, password) = credentials
        .resolve()
        .ok_or(SessionError::MissingCredentials)?;

    let mut client = new_client();

    tokio::time::sleep(policy.initial_delay).await;

    let max_attempts = policy.max_attempts.max(1);
    let mut attempts: u32 = 0;
    loop {
        let result = match policy.attempt_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, client.login(username, password)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!(
                        "login attempt timed out after {}s",
                        limit.as_secs_f64()
                    )),
                }
            }
            None => client.login(username, password).await,
        };

        match result {
            Ok(()) => {
                info!(username, attempt = attempts + 1, "Successfully logged in to Twitter");
                return Ok(Session {
                    client,
                    username: username.to_string(),
                });
            }
            Err(e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    error!(username, attempts, "Twitter login failed: {e:#}");
                    return Err(SessionError::Login {
                        attempts,
                        cause: format!("{e:#}"),
                    });
                }
                warn!(
                    username,
                    attempt = attempts,
                    "Login attempt failed, retrying in {}s: {e:#}",
                    policy.retry_delay.as_secs_f64()
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
