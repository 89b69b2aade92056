//! The state every `plantctl` command handler receives.

use std::future::Future;

use chrono::Utc;

use crate::cli_utils::OutputFormat;
use crate::commands::shared::exit_with_handled;
use crate::{AuthResponse, ClientError, PlantClient, Session, SessionError, SessionStore};

/// API client, login state and output preferences for one invocation.
pub struct CliContext {
    base_url: String,
    client: PlantClient,
    session: Session,
    sessions: SessionStore,
    output: OutputFormat,
}

impl CliContext {
    /// Loads the stored session and builds a client carrying its token.
    pub fn new(
        base_url: impl Into<String>,
        sessions: SessionStore,
        output: OutputFormat,
    ) -> Result<Self, SessionError> {
        let base_url = base_url.into();
        let session = sessions.load()?;
        let client = client_for(&base_url, &session);
        Ok(CliContext {
            base_url,
            client,
            session,
            sessions,
            output,
        })
    }

    pub fn client(&self) -> &PlantClient {
        &self.client
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Stores the session a register or login produced.
    pub fn establish(&mut self, response: AuthResponse) -> Result<(), SessionError> {
        self.session = Session::from_auth(response);
        self.sessions.save(&self.session)?;
        self.client = client_for(&self.base_url, &self.session);
        Ok(())
    }

    /// Forgets the current session, locally and on disk.
    pub fn end_session(&mut self) -> Result<(), SessionError> {
        self.session = Session::default();
        self.client = client_for(&self.base_url, &self.session);
        self.sessions.clear()
    }

    /// Exits unless a live token is available.
    pub fn require_login(&self) {
        if !self.client.has_token() {
            exit_with_handled(&ClientError::NotLoggedIn, "Cannot continue");
        }
    }

    /// Runs an API operation, exiting with a readable message on failure.
    ///
    /// A 401 means the token is no longer accepted, so the stored session is
    /// cleared before exiting.
    pub async fn execute_or_exit<T, F, Fut>(&mut self, operation: F, context: &str) -> T
    where
        F: FnOnce(PlantClient) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        match operation(self.client.clone()).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_unauthorized() {
                    if let Err(clear) = self.end_session() {
                        eprintln!("Warning: {}", clear);
                    }
                }
                exit_with_handled(&e, context)
            }
        }
    }
}

fn client_for(base_url: &str, session: &Session) -> PlantClient {
    PlantClient::new(base_url).with_token(session.active_token(Utc::now()).map(str::to_string))
}
