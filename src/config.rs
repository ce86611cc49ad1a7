use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub signup_grant_points: i64,
    pub llm: LlmConfig,
    pub render: RenderConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub chrome_executable: Option<String>,
    pub timeout_secs: u64,
    pub vertical_width: u32,
    pub horizontal_width: u32,
    pub height_hint: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: String,
    pub local_path: String,
    pub public_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub supabase_bucket: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/summary_cards".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key".to_string()),
            signup_grant_points: env::var("SIGNUP_GRANT_POINTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            llm: LlmConfig {
                api_url: env::var("LLM_API_URL").unwrap_or_else(|_| {
                    "https://api.deepseek.com/v1/chat/completions".to_string()
                }),
                api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
                temperature: env::var("LLM_TEMPERATURE")
                    .unwrap_or_else(|_| "0.7".to_string())
                    .parse()?,
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .unwrap_or_else(|_| "8192".to_string())
                    .parse()?,
            },
            render: RenderConfig {
                chrome_executable: env::var("CHROME_EXECUTABLE").ok(),
                timeout_secs: env::var("RENDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
                vertical_width: env::var("RENDER_VERTICAL_WIDTH")
                    .unwrap_or_else(|_| "720".to_string())
                    .parse()?,
                horizontal_width: env::var("RENDER_HORIZONTAL_WIDTH")
                    .unwrap_or_else(|_| "1280".to_string())
                    .parse()?,
                height_hint: env::var("RENDER_HEIGHT_HINT")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()?,
            },
            storage: StorageConfig {
                backend: env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string()),
                local_path: env::var("STORAGE_LOCAL_PATH")
                    .unwrap_or_else(|_| "./uploads".to_string()),
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                supabase_url: env::var("SUPABASE_URL").ok(),
                supabase_service_key: env::var("SUPABASE_SERVICE_KEY").ok(),
                supabase_bucket: env::var("SUPABASE_BUCKET")
                    .unwrap_or_else(|_| "cards".to_string()),
            },
        })
    }
}
