use std::env;
use std::net::{IpAddr, SocketAddr};

/// AppConfig
///
/// Holds the panel's entire configuration. Loaded once at startup and shared
/// read-only through the application state, where handlers and the login gate
/// pull it out via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local login bypass and Swagger UI.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub listen: String,
    // Secret used to sign and validate session tokens.
    pub jwt_secret: String,
    // Lifetime of a session token and its cookie, in seconds.
    pub session_max_age: u64,
    // Whether the session cookie carries the `Secure` attribute.
    pub secure_cookie: bool,
    // Credentials of the account seeded into a fresh repository.
    pub admin_username: String,
    pub admin_password: String,
    // Optional directory overriding the embedded page templates.
    pub template_dir: Option<String>,
}

/// Env
///
/// Switches between development conveniences (header bypass, Swagger UI,
/// loopback-only default bind) and hardened production behaviour.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

// Local mode accepts the `x-user-id` bypass, so it only listens on loopback
// unless told otherwise.
const LOCAL_LISTEN: &str = "127.0.0.1:54321";
const PRODUCTION_LISTEN: &str = "0.0.0.0:54321";
const DEFAULT_SESSION_MAX_AGE: u64 = 7 * 24 * 60 * 60;
const LOCAL_JWT_SECRET: &str = "xpanel-local-development-secret";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test state scaffolding. Binds an
    /// ephemeral loopback port.
    fn default() -> Self {
        Self {
            env: Env::Local,
            listen: "127.0.0.1:0".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            secure_cookie: false,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            template_dir: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `XPANEL_JWT_SECRET` is missing, or when a
    /// numeric variable cannot be parsed. The panel refuses to start with a
    /// half-valid configuration.
    pub fn load() -> Self {
        // Environment Resolution
        // Anything but an explicit "production" is treated as local development.
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        // JWT Secret Resolution
        // The production secret is mandatory; the local fallback is public.
        let jwt_secret = match env {
            Env::Production => env::var("XPANEL_JWT_SECRET")
                .expect("FATAL: XPANEL_JWT_SECRET must be set in production."),
            Env::Local => {
                env::var("XPANEL_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string())
            }
        };

        // Bind Address
        let listen = env::var("XPANEL_LISTEN").unwrap_or_else(|_| match env {
            Env::Production => PRODUCTION_LISTEN.to_string(),
            Env::Local => LOCAL_LISTEN.to_string(),
        });

        // Session Settings
        let session_max_age = env::var("XPANEL_SESSION_MAX_AGE")
            .map(|value| {
                value
                    .parse::<u64>()
                    .expect("FATAL: XPANEL_SESSION_MAX_AGE must be a number of seconds.")
            })
            .unwrap_or(DEFAULT_SESSION_MAX_AGE);

        // Cookies are Secure by default only where TLS is expected.
        let secure_cookie = env::var("XPANEL_SECURE_COOKIE")
            .map(|value| {
                value
                    .parse::<bool>()
                    .expect("FATAL: XPANEL_SECURE_COOKIE must be true or false.")
            })
            .unwrap_or(env == Env::Production);

        Self {
            listen,
            jwt_secret,
            session_max_age,
            secure_cookie,
            // Seed account for the in-memory repository.
            admin_username: env::var("XPANEL_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("XPANEL_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            template_dir: env::var("XPANEL_TEMPLATE_DIR").ok(),
            env,
        }
    }

    /// login_bypass_exposed
    ///
    /// True when the local development bypass is active and the server listens
    /// on an address other hosts can reach. A `listen` value that is not a
    /// socket address is only trusted as `localhost:<port>`.
    pub fn login_bypass_exposed(&self) -> bool {
        if self.env != Env::Local {
            return false;
        }

        match self.listen.parse::<SocketAddr>() {
            Ok(addr) => !is_loopback(addr.ip()),
            Err(_) => !self.listen.starts_with("localhost:"),
        }
    }
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback()),
    }
}
