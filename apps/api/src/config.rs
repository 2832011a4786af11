use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    pub production: bool,
    /// Allowed CORS origin. Permissive CORS when unset.
    pub client_url: Option<String>,
    /// Login page linked from onboarding emails.
    pub portal_url: String,
    pub mail: MailConfig,
    pub chrome_bin: String,
    pub offer_template_path: Option<String>,
    pub jira: Option<JiraConfig>,
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    /// `None` means mail is logged instead of sent.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let smtp = match optional_env("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: optional_env("SMTP_PORT")
                    .unwrap_or_else(|| "587".to_string())
                    .parse::<u16>()
                    .context("SMTP_PORT must be a valid port number")?,
                user: optional_env("SMTP_USER"),
                pass: optional_env("SMTP_PASS"),
                secure: optional_env("SMTP_SECURE").as_deref() == Some("true"),
            }),
            None => None,
        };

        let jira = match (
            optional_env("JIRA_BASE_URL"),
            optional_env("JIRA_EMAIL"),
            optional_env("JIRA_API_TOKEN"),
        ) {
            (Some(base_url), Some(email), Some(api_token)) => Some(JiraConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                email,
                api_token,
            }),
            _ => None,
        };

        let seed_admin = match (
            optional_env("SEED_ADMIN_EMAIL"),
            optional_env("SEED_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            production: optional_env("APP_ENV").as_deref() == Some("production"),
            client_url: optional_env("CLIENT_URL"),
            portal_url: optional_env("PORTAL_URL")
                .unwrap_or_else(|| "http://localhost:5173/login".to_string()),
            mail: MailConfig {
                from: optional_env("MAIL_FROM")
                    .unwrap_or_else(|| "HR Team <hr@talentdesk.local>".to_string()),
                smtp,
            },
            chrome_bin: optional_env("CHROME_BIN").unwrap_or_else(|| "chromium".to_string()),
            offer_template_path: optional_env("OFFER_TEMPLATE_PATH"),
            jira,
            seed_admin,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, treating empty strings as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
