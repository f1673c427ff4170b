use anyhow::{anyhow, Context, Result};
use std::fmt;

use crate::config::types::{GrantType, IdentityConfig};

#[derive(Clone)]
pub enum Grant {
    ClientCredentials,
    Password { username: String, password: String },
}

/// Identity-provider credentials resolved once at startup.
#[derive(Clone)]
pub struct IdentityCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub grant: Grant,
}

impl IdentityCredentials {
    pub fn client_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant: Grant::ClientCredentials,
        }
    }

    pub fn resolve(config: &IdentityConfig) -> Result<Self> {
        let client_id = config.client_id.resolve().context("identity.client_id")?;
        let client_secret = config.client_secret.resolve().context("identity.client_secret")?;
        let grant = match config.grant {
            GrantType::ClientCredentials => Grant::ClientCredentials,
            GrantType::Password => {
                let username = config
                    .username
                    .as_ref()
                    .ok_or_else(|| anyhow!("identity.username is required for the password grant"))?
                    .resolve()
                    .context("identity.username")?;
                let password = config
                    .password
                    .as_ref()
                    .ok_or_else(|| anyhow!("identity.password is required for the password grant"))?
                    .resolve()
                    .context("identity.password")?;
                Grant::Password { username, password }
            }
        };
        Ok(Self { client_id, client_secret, grant })
    }

    pub fn grant_type(&self) -> GrantType {
        match self.grant {
            Grant::ClientCredentials => GrantType::ClientCredentials,
            Grant::Password { .. } => GrantType::Password,
        }
    }

    /// Form body for the token endpoint
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", self.grant_type().as_str().to_owned()),
            ("client_id", self.client_id.to_owned()),
            ("client_secret", self.client_secret.to_owned()),
        ];
        if let Grant::Password { username, password } = &self.grant {
            form.push(("username", username.to_owned()));
            form.push(("password", password.to_owned()));
        }
        form
    }
}

impl fmt::Debug for IdentityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCredentials")
            .field("client_id", &self.client_id)
            .field("grant", &self.grant_type())
            .finish_non_exhaustive()
    }
}
