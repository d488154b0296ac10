use std::env;

use crate::constants::DEFAULT_MAX_IMAGE_BYTES;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    /// Directory representative images are written to
    pub upload_dir: String,
    /// Public URL prefix under which `upload_dir` is served
    pub image_base_url: String,
    pub max_image_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/family_moments.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "./data/images".to_string());

        let image_base_url = env::var("IMAGE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080/images".to_string())
            .trim_end_matches('/')
            .to_string();

        let max_image_bytes = match env::var("MAX_IMAGE_BYTES") {
            Ok(raw) => raw.parse().map_err(|_| "Invalid MAX_IMAGE_BYTES")?,
            Err(_) => DEFAULT_MAX_IMAGE_BYTES,
        };

        Ok(Config {
            server_host,
            server_port,
            database_url,
            allowed_origins,
            environment,
            upload_dir,
            image_base_url,
            max_image_bytes,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
