use serde::Deserialize;

pub const ACTIVE_STATUS: &str = "active";

/// One decoded `/v2/account` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountSnapshot {
    pub status: String,
    pub droplet_limit: u64,
    pub email_verified: bool,
    pub floating_ip_limit: u64,
    #[serde(default)]
    pub volume_limit: Option<u64>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

impl AccountSnapshot {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountRoot {
    pub account: AccountSnapshot,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
