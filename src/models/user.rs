use serde::{Deserialize, Serialize};

/// Signed-in customer as returned by `/auth/signin` and persisted under the
/// `user` local-storage key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub token: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

