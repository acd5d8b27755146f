use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::access_log::{AccessLogEntry, AccessLogger, RequestMeta};
use crate::auth::dto::{normalize_email, AuthAction, AuthRequest, AuthResponse};
use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::UserRecord;
use crate::auth::token::TokenCodec;
use crate::config::SignupWriteMode;
use crate::errors::ApiError;

/// Signup/login flow over the injected credential store and access logger.
///
/// Login checks only that the account exists; the password is required to be present and
/// is otherwise ignored. No password is ever stored.
#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialStore,
    logger: AccessLogger,
    tokens: TokenCodec,
    signup_mode: SignupWriteMode,
}

impl AuthService {
    pub fn new(
        credentials: CredentialStore,
        logger: AccessLogger,
        tokens: TokenCodec,
        signup_mode: SignupWriteMode,
    ) -> Self {
        Self {
            credentials,
            logger,
            tokens,
            signup_mode,
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    #[instrument(skip(self, request, meta), fields(action = ?request.action))]
    pub async fn authenticate(
        &self,
        request: AuthRequest,
        meta: RequestMeta,
    ) -> Result<AuthResponse, ApiError> {
        let (email, _password) = request.credentials().map_err(|e| {
            warn!("missing email or password");
            e
        })?;
        let email = normalize_email(email);
        let action = request.action().map_err(|e| {
            warn!(action = ?request.action, "unrecognized action");
            e
        })?;

        let now = OffsetDateTime::now_utc();
        match action {
            AuthAction::Signup => self.signup(&email, now).await?,
            AuthAction::Login => self.login(&email, now).await?,
        }

        let token = self.tokens.issue(&email, now)?;
        self.log_access(&email, action, now, meta).await;
        info!(email = %email, action = action.as_str(), "auth succeeded");

        Ok(AuthResponse {
            success: true,
            email,
            token,
        })
    }

    async fn signup(&self, email: &str, now: OffsetDateTime) -> Result<(), ApiError> {
        let user = UserRecord::new(email, now);
        match self.signup_mode {
            // Another signup can land between the lookup and the write; the later write wins.
            SignupWriteMode::CheckThenPut => {
                if self.credentials.exists(email).await? {
                    warn!(email = %email, "signup for existing user");
                    return Err(ApiError::DuplicateUser);
                }
                self.credentials.put(email, &user).await?;
            }
            SignupWriteMode::PutIfAbsent => {
                if !self.credentials.insert_new(email, &user).await? {
                    warn!(email = %email, "signup for existing user");
                    return Err(ApiError::DuplicateUser);
                }
            }
        }
        Ok(())
    }

    async fn login(&self, email: &str, now: OffsetDateTime) -> Result<(), ApiError> {
        let Some(mut user) = self.credentials.get(email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        };
        user.last_login = Some(now);
        self.credentials.put(email, &user).await?;
        Ok(())
    }

    /// Log failures never change the outcome of the request.
    async fn log_access(
        &self,
        email: &str,
        action: AuthAction,
        now: OffsetDateTime,
        meta: RequestMeta,
    ) {
        let entry = AccessLogEntry::new(email, action, now, meta);
        if let Err(e) = self.logger.record(entry).await {
            let error = format!("{e:#}");
            warn!(%error, email = %email, "access log write failed");
        }
    }
}
