use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Upper bound on a single profile lookup; on expiry the verification
    /// procedure takes the same fallback path as a hard query failure.
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub session_expiry_hours: u64,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Privileged identities that are always administrators. Configured, not
    /// hardcoded, so the list can be rotated without a code change.
    pub allowlist_emails: Vec<String>,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

/// The production trust anchor; overridable via ADMIN_EMAILS.
const DEFAULT_ADMIN_EMAIL: &str = "armazemsaojoaquimoficial@gmail.com";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_LOOKUP_TIMEOUT_MS") {
            self.database.lookup_timeout_ms = v.parse().unwrap_or(self.database.lookup_timeout_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.security.session_expiry_hours = v.parse().unwrap_or(self.security.session_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        // Admin overrides
        if let Ok(v) = env::var("ADMIN_EMAILS") {
            let emails: Vec<String> = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !emails.is_empty() {
                self.admin.allowlist_emails = emails;
            }
        }
        if let Ok(v) = env::var("ADMIN_CACHE_TTL_SECS") {
            self.admin.cache_ttl_secs = v.parse().unwrap_or(self.admin.cache_ttl_secs);
        }
        if let Ok(v) = env::var("ADMIN_CACHE_MAX_ENTRIES") {
            self.admin.cache_max_entries = v.parse().unwrap_or(self.admin.cache_max_entries);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
                lookup_timeout_ms: 5000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_expiry_hours: 24 * 7, // 1 week
                enable_audit_logging: false,
            },
            admin: AdminConfig {
                allowlist_emails: vec![DEFAULT_ADMIN_EMAIL.to_string()],
                cache_ttl_secs: 300,
                cache_max_entries: 10_000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                acquire_timeout_secs: 10,
                lookup_timeout_ms: 2500,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_expiry_hours: 24,
                enable_audit_logging: true,
            },
            admin: AdminConfig {
                allowlist_emails: vec![DEFAULT_ADMIN_EMAIL.to_string()],
                cache_ttl_secs: 300,
                cache_max_entries: 10_000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
                lookup_timeout_ms: 1500,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_expiry_hours: 4,
                enable_audit_logging: true,
            },
            admin: AdminConfig {
                allowlist_emails: vec![DEFAULT_ADMIN_EMAIL.to_string()],
                cache_ttl_secs: 300,
                cache_max_entries: 10_000,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
