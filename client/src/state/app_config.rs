//! Server-provided app config: feature flags, the permission catalogue and
//! the table list used by the sidebar.

use crate::net::api::DEMO_FLAG;
use crate::net::types::{AppConfig, Table};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppConfigState {
    pub config: Option<AppConfig>,
}

impl AppConfigState {
    pub fn set(&mut self, config: AppConfig) {
        self.config = Some(config);
    }

    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| c.flags.iter().any(|f| f == flag))
    }

    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.has_flag(DEMO_FLAG)
    }

    /// Uploads are blocked in demo mode.
    #[must_use]
    pub fn can_upload_files(&self) -> bool {
        !self.is_demo()
    }

    #[must_use]
    pub fn can_create_reactions(&self) -> bool {
        !self.is_demo()
    }

    /// Every permission string the server knows about.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        self.config.as_ref().map_or(&[], |c| c.permissions.as_slice())
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        self.config.as_ref().map_or(&[], |c| c.tables.as_slice())
    }
}
