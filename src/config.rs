use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers and extractors pull it out of the shared state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Database connection string (Postgres), or "memory" for the in-process store.
    pub db_url: String,
    // Runtime environment marker. Controls log format, cookie flags and secret requirements.
    pub env: Env,
    // HMAC secret used to sign and validate session tokens.
    pub session_secret: String,
    // Lifetime of an issued session token, in seconds.
    pub session_ttl_secs: u64,
    // When true, `x-user-id` / `x-user-role` set by a trusted upstream are accepted as identity.
    pub trust_identity_headers: bool,
    // PBKDF2 work factor for newly hashed passwords.
    pub password_hash_iterations: u32,
    // Optional endpoint receiving order status events.
    pub notify_webhook_url: Option<String>,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: developer conveniences locally, hardened settings in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const LOCAL_SESSION_SECRET: &str = "laundry-hub-local-session-secret";
pub const MEMORY_DB_URL: &str = "memory";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            db_url: MEMORY_DB_URL.to_string(),
            env: Env::Local,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: 86_400,
            trust_identity_headers: false,
            password_hash_iterations: 100_000,
            notify_webhook_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if `DATABASE_URL` is missing, if `SESSION_SECRET` is missing in production,
    /// if production is pointed at the in-memory store, or if a numeric/boolean variable
    /// cannot be parsed.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").expect("FATAL: DATABASE_URL must be set");
        if env == Env::Production && db_url == MEMORY_DB_URL {
            panic!("FATAL: the in-memory store cannot be used in production");
        }

        let session_secret = match env {
            Env::Production => env::var("SESSION_SECRET")
                .expect("FATAL: SESSION_SECRET must be set in production."),
            Env::Local => {
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string())
            }
        };

        let defaults = Self::default();

        Self {
            db_url,
            env,
            session_secret,
            session_ttl_secs: parse_var("SESSION_TTL_SECS", defaults.session_ttl_secs),
            trust_identity_headers: parse_var(
                "TRUST_IDENTITY_HEADERS",
                defaults.trust_identity_headers,
            ),
            password_hash_iterations: parse_var(
                "PASSWORD_HASH_ITERATIONS",
                defaults.password_hash_iterations,
            ),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_url == MEMORY_DB_URL
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {name} has an invalid value: {raw}")),
        Err(_) => default,
    }
}
