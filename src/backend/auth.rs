//! Admin session state and the sign-in form's validation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Collection whose records may use the admin routes.
pub const SUPERUSERS: &str = "_superusers";

/// `localStorage` key the session is persisted under.
pub const STORAGE_KEY: &str = "pocketbase_auth";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRecord {
    pub id: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    pub token: String,
    pub record: Option<AuthRecord>,
}

impl AuthState {
    /// A token is valid while its `exp` claim lies in the future.
    pub fn is_valid_at(&self, now_secs: u64) -> bool {
        !self.token.is_empty() && token_expiry(&self.token).is_some_and(|exp| exp > now_secs)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(crate::clock::now_millis() / 1000)
    }

    pub fn is_superuser(&self) -> bool {
        self.is_valid()
            && self
                .record
                .as_ref()
                .is_some_and(|r| r.collection_name == SUPERUSERS)
    }

    pub fn clear(&mut self) {
        *self = AuthState::default();
    }
}

fn token_expiry(token: &str) -> Option<u64> {
    #[derive(Deserialize)]
    struct Claims {
        exp: u64,
    }
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok().map(|c| c.exp)
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

/// Session saved by a previous visit, if any.
pub fn load_persisted() -> AuthState {
    #[cfg(target_arch = "wasm32")]
    {
        let raw = local_storage().and_then(|s| s.get_item(STORAGE_KEY).ok().flatten());
        if let Some(raw) = raw {
            match serde_json::from_str(&raw) {
                Ok(state) => return state,
                Err(e) => tracing::warn!("discarding stored session: {e}"),
            }
        }
    }
    AuthState::default()
}

pub fn persist(state: &AuthState) {
    #[cfg(target_arch = "wasm32")]
    {
        let Some(storage) = local_storage() else {
            return;
        };
        let result = if state.token.is_empty() {
            storage.remove_item(STORAGE_KEY)
        } else {
            match serde_json::to_string(state) {
                Ok(raw) => storage.set_item(STORAGE_KEY, &raw),
                Err(e) => {
                    tracing::warn!("could not encode session: {e}");
                    return;
                }
            }
        };
        if result.is_err() {
            tracing::warn!("could not write session to localStorage");
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::debug!(signed_in = !state.token.is_empty(), "session not persisted off-browser");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: LoginField,
    pub message: &'static str,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub const MIN_PASSWORD: usize = 8;

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError {
                field: LoginField::Email,
                message: "Email is required.",
            });
        } else if !looks_like_email(email) {
            errors.push(FieldError {
                field: LoginField::Email,
                message: "Enter a valid email address.",
            });
        }
        if self.password.is_empty() {
            errors.push(FieldError {
                field: LoginField::Password,
                message: "Password is required.",
            });
        } else if self.password.chars().count() < Self::MIN_PASSWORD {
            errors.push(FieldError {
                field: LoginField::Password,
                message: "Password must be at least 8 characters.",
            });
        }
        errors
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
