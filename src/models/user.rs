use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::remote::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Patient => write!(f, "patient"),
            UserRole::Doctor => write!(f, "doctor"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patient" => Ok(UserRole::Patient),
            "doctor" => Ok(UserRole::Doctor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The signed-in identity: account fields merged with the profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "userType", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl User {
    /// Merges the remote identity with its profile document. Identity fields
    /// always come from the account; the profile fills in the rest.
    pub fn from_account(account: &Account, profile: Option<UserProfile>) -> Self {
        let profile = profile.unwrap_or_default();
        let mut user = Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            role: profile.role,
            phone: profile.phone,
            specialization: profile.specialization,
            license_number: profile.license_number,
            date_of_birth: profile.date_of_birth,
            address: profile.address,
        };
        user.enforce_role_fields();
        user
    }

    /// Doctor-only fields are dropped unless the role is doctor.
    pub fn enforce_role_fields(&mut self) {
        if self.role != Some(UserRole::Doctor) {
            self.specialization = None;
            self.license_number = None;
        }
    }

    pub fn is_doctor(&self) -> bool {
        self.role == Some(UserRole::Doctor)
    }
}

/// A profile document from the users collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "$id", default)]
    pub document_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "userType", default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Everything the registration form collects.
#[derive(Debug, Clone)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
}

/// Minimum password length the backend accepts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

impl RegisterData {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if !self.email.contains('@') || self.email.len() > 255 {
            return Err("Invalid email address".to_string());
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password too weak (minimum {} characters)",
                MIN_PASSWORD_LENGTH
            ));
        }
        Ok(())
    }

    /// The non-credential part, as written to the profile document.
    pub fn profile(&self) -> NewProfile {
        let is_doctor = self.role == UserRole::Doctor;
        NewProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: non_blank(&self.phone),
            specialization: non_blank(&self.specialization).filter(|_| is_doctor),
            license_number: non_blank(&self.license_number).filter(|_| is_doctor),
            date_of_birth: non_blank(&self.date_of_birth),
            address: non_blank(&self.address),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    pub email: String,
    #[serde(rename = "userType")]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl NewProfile {
    pub fn into_user(self, user_id: String) -> User {
        let mut user = User {
            id: user_id,
            email: self.email,
            name: self.name,
            role: Some(self.role),
            phone: self.phone,
            specialization: self.specialization,
            license_number: self.license_number,
            date_of_birth: self.date_of_birth,
            address: self.address,
        };
        user.enforce_role_fields();
        user
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
