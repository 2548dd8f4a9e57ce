use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone)]
pub struct MailgunSettings {
    pub domain: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from: String,
    /// Delivery goes through Mailgun only when both domain and key are set.
    pub mailgun: Option<MailgunSettings>,
}

/// Process configuration, read once at startup and shared through `web::Data`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtSettings,
    pub upload_dir: PathBuf,
    pub frontend_url: String,
    pub public_base_url: String,
    pub environment: Environment,
    pub mail: MailSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = var("PORT", "5000")
            .parse::<u16>()
            .map_err(|e| format!("PORT must be a valid port number: {}", e))?;
        let database_url = get("DATABASE_URL").ok_or_else(|| "DATABASE_URL must be set".to_string())?;
        let secret = get("JWT_SECRET").ok_or_else(|| "JWT_SECRET must be set".to_string())?;
        let expires_in_hours = var("JWT_EXPIRES_IN_HOURS", "24")
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| "JWT_EXPIRES_IN_HOURS must be a positive integer".to_string())?;

        let environment = match var("APP_ENV", "production").to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        };

        let mailgun = match (get("MAILGUN_DOMAIN"), get("MAILGUN_API_KEY")) {
            (Some(domain), Some(api_key)) if !domain.is_empty() && !api_key.is_empty() => {
                Some(MailgunSettings { domain, api_key })
            }
            _ => None,
        };

        Ok(Self {
            public_base_url: var("PUBLIC_BASE_URL", &format!("http://localhost:{}", port)),
            host,
            port,
            database_url,
            jwt: JwtSettings {
                secret,
                issuer: var("JWT_ISSUER", "legalease-service"),
                audience: var("JWT_AUDIENCE", "legalease-api"),
                expires_in_hours,
            },
            upload_dir: PathBuf::from(var("UPLOAD_DIR", "uploads")),
            frontend_url: var("FRONTEND_URL", "http://localhost:3000"),
            environment,
            mail: MailSettings {
                from: var("MAIL_FROM", "Legal Ease Lite <noreply@legalease.local>"),
                mailgun,
            },
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("mongodb://localhost:27017/legalease_test".to_string()),
        "JWT_SECRET" => Some("test-secret".to_string()),
        _ => None,
    })
    .expect("test config")
}
