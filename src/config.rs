/// Seven days.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 7;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Default account and welcome post created on an empty store.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub enabled: bool,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the service on the in-process store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub seed: SeedConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: env_or("JWT_ISSUER", "blogapp"),
            audience: env_or("JWT_AUDIENCE", "blogapp-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", DEFAULT_TOKEN_TTL_MINUTES),
        };
        let seed = SeedConfig {
            enabled: env_parse("SEED_DEFAULTS", true),
            email: env_or("DEFAULT_USER_EMAIL", "admin@example.com"),
            password: env_or("DEFAULT_USER_PASSWORD", "admin123"),
            name: env_or("DEFAULT_USER_NAME", "admin"),
        };
        Ok(Self {
            database_url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            seed,
        })
    }
}
