use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::logger::MessageLogger;
use crate::protocol::{control_page_query, extract_token, login_form};
use crate::transport::Transport;
use crate::types::Credentials;

/// Owns the opaque session token. Absent until first needed, dropped on
/// `invalidate`, and reacquired by logging in and scraping the control page.
#[derive(Default)]
pub(crate) struct TokenManager {
    token: Option<String>,
}

impl TokenManager {
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn invalidate(&mut self) {
        if self.token.take().is_some() {
            debug!("session token invalidated");
        }
    }

    /// Current token, acquiring one first if needed. One attempt, no retry.
    pub async fn ensure_token(
        &mut self,
        transport: &Transport,
        creds: &Credentials,
        logger: Option<&mut MessageLogger>,
    ) -> Result<String, AuthError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let token = acquire(transport, creds, logger).await?;
        self.token = Some(token.clone());
        Ok(token)
    }
}

async fn acquire(
    transport: &Transport,
    creds: &Credentials,
    mut logger: Option<&mut MessageLogger>,
) -> Result<String, AuthError> {
    debug!(device = creds.device_id(), "logging in to portal");
    if let Some(logger) = logger.as_deref_mut() {
        logger.log_login(creds.username());
    }
    transport
        .login(&login_form(creds.username(), creds.password()))
        .await
        .map_err(AuthError::Transport)?;

    let page = transport
        .control_page(&control_page_query(creds.device_id()))
        .await
        .map_err(AuthError::Transport)?;

    let token = extract_token(&page);
    if let Some(logger) = logger {
        logger.log_token(creds.device_id(), token.is_some());
    }
    match token {
        Some(token) => {
            info!(device = creds.device_id(), "session token acquired");
            Ok(token)
        }
        None => {
            warn!(
                device = creds.device_id(),
                page_len = page.len(),
                "no token on control page"
            );
            Err(AuthError::TokenNotFound)
        }
    }
}
