use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub bind_addr: String,
    pub uploads_dir: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "edulms".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let jwt_ttl_seconds = settings
            .get_int("auth.jwt_ttl_seconds")
            .ok()
            .or_else(|| {
                env::var("JWT_TTL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
            })
            .unwrap_or(86400); // Default: 1 day

        let host = settings
            .get_string("server.host")
            .or_else(|_| env::var("HOST"))
            .unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = settings
            .get_string("server.port")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "5000".to_string());
        let bind_addr = format!("{}:{}", host, port);

        let uploads_dir = settings
            .get_string("storage.uploads_dir")
            .or_else(|_| env::var("UPLOADS_DIR"))
            .unwrap_or_else(|_| "uploads".to_string());

        let cors_allowed_origins = settings
            .get_string("server.cors_allowed_origins")
            .or_else(|_| env::var("CORS_ALLOWED_ORIGINS"))
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            mongo_uri,
            mongo_database,
            jwt_secret,
            jwt_ttl_seconds,
            bind_addr,
            uploads_dir,
            cors_allowed_origins,
        })
    }
}
