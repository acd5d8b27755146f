use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Signup,
    Login,
}

impl AuthAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthAction::Signup => "signup",
            AuthAction::Login => "login",
        }
    }
}

/// Body of `POST /api/auth`.
///
/// Fields keep their raw JSON values: presence is judged by truthiness (`null`, `false`,
/// `0` and `""` count as missing), and only `email` has to be a string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthRequest {
    pub action: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn present(field: &Option<Value>) -> Option<&Value> {
    field.as_ref().filter(|v| is_truthy(v))
}

impl AuthRequest {
    /// Decodes a request body. Anything but a JSON object is rejected.
    pub fn from_json(body: Value) -> anyhow::Result<Self> {
        if !body.is_object() {
            anyhow::bail!("auth request body is not a JSON object");
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Raw email and password, both present. Whitespace counts as content here.
    /// A present email that is not a string is an internal error.
    pub fn credentials(&self) -> Result<(&str, &Value), ApiError> {
        let (Some(email), Some(password)) = (present(&self.email), present(&self.password))
        else {
            return Err(ApiError::Validation);
        };
        let email = email
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("email is not a string"))?;
        Ok((email, password))
    }

    pub fn action(&self) -> Result<AuthAction, ApiError> {
        match self.action.as_ref().and_then(Value::as_str) {
            Some("signup") => Ok(AuthAction::Signup),
            Some("login") => Ok(AuthAction::Login),
            _ => Err(ApiError::InvalidAction),
        }
    }
}

/// Lower-cased, trimmed email: the only key used for storage and logging.
pub fn normalize_email(raw: &str) -> String {
    raw.to_lowercase().trim().to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub email: String,
    pub token: String,
}
