//! User domain types.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use easybuy_core::{Email, UserId, UserType};

/// Default delivery city when a registration does not name one.
pub const DEFAULT_CITY: &str = "Douala";

/// A storefront user as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub user_type_display: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.full_name.trim().is_empty() {
            &self.full_name
        } else if !self.first_name.trim().is_empty() {
            &self.first_name
        } else if !self.username.is_empty() {
            &self.username
        } else {
            &self.email
        }
    }
}

/// Partial user update. Only `Some` fields are applied or sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl UserPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.whatsapp.is_none()
            && self.address.is_none()
            && self.city.is_none()
    }

    /// Merge the patch into `user`.
    ///
    /// A changed first or last name also rebuilds `full_name`.
    pub fn apply(&self, user: &mut User) {
        let renamed = self.first_name.is_some() || self.last_name.is_some();
        if let Some(first_name) = &self.first_name {
            user.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &self.last_name {
            user.last_name.clone_from(last_name);
        }
        if let Some(phone) = &self.phone {
            user.phone.clone_from(phone);
        }
        if let Some(whatsapp) = &self.whatsapp {
            user.whatsapp = Some(whatsapp.clone());
        }
        if let Some(address) = &self.address {
            user.address = Some(address.clone());
        }
        if let Some(city) = &self.city {
            user.city.clone_from(city);
        }
        if renamed {
            user.full_name = format!("{} {}", user.first_name, user.last_name)
                .trim()
                .to_string();
        }
    }
}

/// Email and password sign-in.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: SecretString,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Sign-up form data.
///
/// Optional fields fall back to backend-friendly defaults when the request
/// is built; see the accessor methods.
#[derive(Debug, Clone)]
pub struct RegistrationData {
    pub username: Option<String>,
    pub email: String,
    pub phone: String,
    pub whatsapp: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub password: SecretString,
    pub password_confirmation: SecretString,
    pub user_type: Option<UserType>,
}

impl RegistrationData {
    /// Check the form before it is sent.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<Email, String> {
        let email = Email::parse(&self.email).map_err(|e| format!("email: {e}"))?;
        if self.phone.trim().is_empty() {
            return Err("phone: this field is required".to_string());
        }
        if self.password.expose_secret().is_empty() {
            return Err("password: this field is required".to_string());
        }
        if self.password.expose_secret() != self.password_confirmation.expose_secret() {
            return Err("password_confirmation: passwords do not match".to_string());
        }
        Ok(email)
    }

    /// Username to register, derived from the email when none was chosen.
    #[must_use]
    pub fn effective_username(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.trim().is_empty()) {
            return username.trim().to_string();
        }
        Email::parse(&self.email).map_or_else(
            |_| self.email.replace(|c: char| !c.is_ascii_alphanumeric(), "_"),
            |email| email.derived_username(),
        )
    }

    /// WhatsApp number, defaulting to the phone number.
    #[must_use]
    pub fn effective_whatsapp(&self) -> &str {
        self.whatsapp
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .unwrap_or(&self.phone)
    }

    /// Delivery city, defaulting to [`DEFAULT_CITY`].
    #[must_use]
    pub fn effective_city(&self) -> &str {
        self.city
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CITY)
    }
}

/// Password change form.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub old_password: SecretString,
    pub new_password: SecretString,
    pub new_password_confirmation: SecretString,
}

impl PasswordChange {
    /// Check the form before it is sent.
    ///
    /// # Errors
    ///
    /// Returns a message if the new password is empty or unconfirmed.
    pub fn validate(&self) -> Result<(), String> {
        if self.new_password.expose_secret().is_empty() {
            return Err("new_password: this field is required".to_string());
        }
        if self.new_password.expose_secret() != self.new_password_confirmation.expose_secret() {
            return Err("new_password2: passwords do not match".to_string());
        }
        Ok(())
    }
}
