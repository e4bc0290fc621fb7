use crate::api::ApiError;
use std::time::Duration;

/// The server hosts a single administrative account.
pub const ACCOUNT_NAME: &str = "admin";

/// How long the signup completion screen lingers before returning to login.
pub const SIGNUP_REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Editing,
    Submitting,
    Done,
}

pub struct LoginFlow {
    pub password: String,
    pub error: Option<String>,
    pub token: Option<String>,
    pub state: LoginState,
}

impl LoginFlow {
    pub fn new() -> Self {
        Self {
            password: String::new(),
            error: None,
            token: None,
            state: LoginState::Editing,
        }
    }

    /// Returns true when a login request should be issued. Submits while a
    /// request is in flight are inert.
    pub fn submit(&mut self) -> bool {
        if self.state != LoginState::Editing {
            return false;
        }
        if self.password.is_empty() {
            self.error = Some("password required".to_string());
            return false;
        }
        self.error = None;
        self.state = LoginState::Submitting;
        true
    }

    pub fn on_response(&mut self, result: Result<String, ApiError>) {
        match result {
            Ok(token) => {
                self.token = Some(token);
                self.state = LoginState::Done;
            }
            Err(err) => {
                self.state = LoginState::Editing;
                self.password.clear();
                // older servers answer 403 instead of 401 for a bad password
                self.error = Some(if err.is_unauthorized() || err.is_forbidden() {
                    "incorrect password".to_string()
                } else {
                    err.to_string()
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupState {
    Editing,
    Submitting,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupError {
    Rejected,
    AlreadyExists,
    Other(String),
}

impl std::fmt::Display for SignupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignupError::Rejected => write!(f, "signup failed"),
            SignupError::AlreadyExists => write!(f, "account already exists"),
            SignupError::Other(message) => write!(f, "{}", message),
        }
    }
}

pub fn passwords_valid(password: &str, confirm: &str) -> bool {
    !password.is_empty() && password == confirm
}

pub struct SignupFlow {
    pub password: String,
    pub confirm: String,
    pub error: Option<SignupError>,
    pub state: SignupState,
}

impl SignupFlow {
    pub fn new() -> Self {
        Self {
            password: String::new(),
            confirm: String::new(),
            error: None,
            state: SignupState::Editing,
        }
    }

    /// Submit stays inert until both password fields are non-empty and equal.
    pub fn can_submit(&self) -> bool {
        self.state == SignupState::Editing && passwords_valid(&self.password, &self.confirm)
    }

    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        self.error = None;
        self.state = SignupState::Submitting;
        true
    }

    pub fn on_response(&mut self, result: Result<String, ApiError>) {
        match result {
            // the fresh token is dropped on purpose: the flow returns to the
            // login screen rather than opening a session
            Ok(_) => self.state = SignupState::Complete,
            Err(err) => {
                self.state = SignupState::Editing;
                self.error = Some(if err.is_forbidden() {
                    SignupError::Rejected
                } else if err.is_conflict() {
                    SignupError::AlreadyExists
                } else {
                    SignupError::Other(err.to_string())
                });
            }
        }
    }
}
