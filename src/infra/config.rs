use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    /// How often lapsed subscriptions are renewed or expired.
    pub expiry_sweep_secs: u64,
    /// Default look-ahead for the expiring-subscriptions report.
    pub expiring_window_days: i64,
    /// When both are set, a superadmin with these credentials is created at startup.
    pub admin_email: Option<String>,
    pub admin_password: Option<SecretString>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 86_400);

        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let db_max_connections: u32 = get_env_default("DB_MAX_CONNECTIONS", 5);
        let expiry_sweep_secs: u64 = get_env_default("EXPIRY_SWEEP_SECS", 3_600);
        let expiring_window_days: i64 = get_env_default("EXPIRING_WINDOW_DAYS", 7);

        let admin_email: Option<String> = std::env::var("ADMIN_EMAIL").ok();
        let admin_password: Option<SecretString> = std::env::var("ADMIN_PASSWORD")
            .ok()
            .map(|p| SecretString::new(p.into()));

        Self {
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            cors_origin,
            bind_addr,
            database_url,
            db_max_connections,
            expiry_sweep_secs,
            expiring_window_days,
            admin_email,
            admin_password,
        }
    }
}
