use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    pub database_url: String,
    pub uploads_dir: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,

    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: u32,

    #[serde(default = "default_login_window")]
    pub login_window_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: default_session_ttl(),
            login_max_attempts: default_login_max_attempts(),
            login_window_seconds: default_login_window(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3030".into()
}

fn default_session_ttl() -> i64 {
    crate::DEFAULT_SESSION_TTL_SECONDS
}

fn default_login_max_attempts() -> u32 {
    crate::DEFAULT_LOGIN_MAX_ATTEMPTS
}

fn default_login_window() -> u64 {
    crate::DEFAULT_LOGIN_WINDOW_SECONDS
}

fn default_fetch_timeout() -> u64 {
    crate::DEFAULT_FETCH_TIMEOUT_SECONDS
}

#[cfg(test)]
mod test {
    use super::SiteConfig;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: SiteConfig = toml::from_str(
            r#"
            database_url = "site.db"
            uploads_dir = "public/uploads"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:3030");
        assert_eq!(config.auth.login_max_attempts, 5);
        assert_eq!(config.fetch.timeout_seconds, 30);
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let config: SiteConfig = toml::from_str(
            r#"
            database_url = "site.db"
            uploads_dir = "public/uploads"
            listen_addr = "127.0.0.1:8080"

            [auth]
            session_ttl_seconds = 3600

            [fetch]
            timeout_seconds = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.auth.session_ttl_seconds, 3600);
        assert_eq!(config.auth.login_max_attempts, 5);
        assert_eq!(config.fetch.timeout_seconds, 5);
    }
}
