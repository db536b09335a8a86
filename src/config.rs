use menva::FromEnv;
use std::{fmt, net::Ipv4Addr, path::PathBuf, str::FromStr};

#[derive(Debug, Clone, PartialEq)]
pub enum Env {
    Development,
    Production,
    Test,
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Env::Development),
            "production" => Ok(Env::Production),
            "test" => Ok(Env::Test),
            _ => Err(format!("Invalid value for enum Env: {}", s)),
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone, FromEnv)]
pub struct WebsiteConfig {
    pub env: Env,
    ip: Ipv4Addr,
    port: u16,
    pub database_url: String,
    pub session_key: String,
    pub session_cookie_name: String,
    pub session_expiration: i64,
    pub login_redirect_to: String,
    pub static_dir: String,
    pub max_upload_size: usize,
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
    pub sentry_dsn: String,
}

impl WebsiteConfig {
    pub fn stub() -> Self {
        Self {
            env: Env::Test,
            ip: Ipv4Addr::new(127, 0, 0, 1),
            port: 8000,
            database_url: "sqlite::memory:".into(),
            session_key: "session_key".into(),
            session_cookie_name: "session_id".into(),
            session_expiration: 30,
            login_redirect_to: "/boards".into(),
            static_dir: std::env::temp_dir()
                .join("taskboard-static")
                .to_string_lossy()
                .into_owned(),
            max_upload_size: 10485760,
            worker_threads: 1,
            max_blocking_threads: 1,
            sentry_dsn: "".into(),
        }
    }

    pub fn socket_addr(&self) -> (Ipv4Addr, u16) {
        (self.ip, self.port)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.static_dir).join("uploads")
    }

    pub fn sentry_dsn(&self) -> Option<&str> {
        if self.sentry_dsn.is_empty() {
            None
        } else {
            Some(&self.sentry_dsn)
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }

    pub fn print(&self) {
        println!("http://{:?}:{:?}", &self.ip, &self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_is_case_insensitive() {
        assert_eq!("Production".parse::<Env>(), Ok(Env::Production));
        assert_eq!("TEST".parse::<Env>(), Ok(Env::Test));
        assert!("staging".parse::<Env>().is_err());
    }

    #[test]
    fn test_stub_disables_sentry_and_secure_cookies() {
        let config = WebsiteConfig::stub();
        assert!(config.sentry_dsn().is_none());
        assert!(!config.secure_cookies());
        assert!(config.uploads_dir().ends_with("uploads"));
    }
}
