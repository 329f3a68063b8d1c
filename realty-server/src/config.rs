//! Marketplace server configuration

use crate::notify::SmtpConfig;

/// Process configuration, loaded once at startup and moved into `AppState`
#[derive(Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Application id embedded in session tokens
    pub app_id: String,

    /// Symmetric secret for session tokens
    pub jwt_secret: String,

    /// Base URL of the OAuth identity provider
    pub oauth_server_url: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,

    /// Identity promoted to admin on every sync
    pub owner_open_id: Option<String>,

    /// Static token guarding the admin UI. `None` rejects every attempt.
    pub admin_token: Option<String>,

    /// SQLite database file. `None` keeps everything in memory.
    pub database_path: Option<String>,

    /// Directory holding the admin UI bundle
    pub static_dir: String,

    /// SMTP configuration for notifications
    pub smtp: Option<SmtpConfig>,
}

// Helper to get non-empty env var
fn get_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Required:
    /// - JWT_SECRET
    ///
    /// Optional:
    /// - PORT (default: 3000)
    /// - APP_ID, OAUTH_SERVER_URL, OAUTH_CLIENT_ID, OAUTH_CLIENT_SECRET
    /// - OWNER_OPEN_ID, ADMIN_TOKEN, DATABASE_PATH
    /// - STATIC_DIR (default: "static")
    /// - SMTP_* (see [`SmtpConfig::from_env`])
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret =
            get_env("JWT_SECRET").ok_or_else(|| "JWT_SECRET must be set".to_string())?;

        let port = match get_env("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("Invalid PORT {:?}: {}", raw, e))?,
            None => 3000,
        };

        Ok(Self {
            port,
            app_id: get_env("APP_ID").unwrap_or_default(),
            jwt_secret,
            oauth_server_url: get_env("OAUTH_SERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            oauth_client_id: get_env("OAUTH_CLIENT_ID").unwrap_or_default(),
            oauth_client_secret: get_env("OAUTH_CLIENT_SECRET").unwrap_or_default(),
            owner_open_id: get_env("OWNER_OPEN_ID"),
            admin_token: get_env("ADMIN_TOKEN"),
            database_path: get_env("DATABASE_PATH"),
            static_dir: get_env("STATIC_DIR").unwrap_or_else(|| "static".to_string()),
            smtp: SmtpConfig::from_env(),
        })
    }

    /// Configuration for tests and local experiments
    pub fn for_testing(jwt_secret: &str) -> Self {
        Self {
            port: 0,
            app_id: "test-app".to_string(),
            jwt_secret: jwt_secret.to_string(),
            oauth_server_url: "http://oauth.invalid".to_string(),
            oauth_client_id: "test-client".to_string(),
            oauth_client_secret: "test-client-secret".to_string(),
            owner_open_id: None,
            admin_token: None,
            database_path: None,
            static_dir: "static".to_string(),
            smtp: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("app_id", &self.app_id)
            .field("jwt_secret", &"<redacted>")
            .field("oauth_server_url", &self.oauth_server_url)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("owner_open_id", &self.owner_open_id)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("database_path", &self.database_path)
            .field("static_dir", &self.static_dir)
            .field("smtp", &self.smtp.as_ref().map(|s| &s.host))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::for_testing("super-secret-value");
        config.admin_token = Some("admin-secret-value".to_string());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-value"));
        assert!(!rendered.contains("admin-secret-value"));
        assert!(!rendered.contains("test-client-secret"));
        assert!(rendered.contains("test-app"));
    }
}
