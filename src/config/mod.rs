use std::env;

/// Top-level configuration, constructed once at process start and passed
/// by reference into the engine constructors. Business logic never reads
/// ambient environment state.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub otp: OtpConfig,
    pub smtp: SmtpConfig,
    /// Base URL the verification / reset links are built against.
    pub frontend_base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub access_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub refresh_expiry_days: i64,
    pub remember_me_expiry_days: i64,
    pub max_active_sessions: i64,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_address: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; real environment variables win.
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str.parse().map_err(|e: String| anyhow::anyhow!(e))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("estate-auth"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            jwt: JwtConfig {
                access_secret: get_env("JWT_ACCESS_SECRET", None, is_prod)?,
                access_expiry_minutes: parse_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    Some("15"),
                    is_prod,
                )?,
            },
            session: SessionConfig {
                refresh_expiry_days: parse_env(
                    "REFRESH_TOKEN_EXPIRY_DAYS",
                    Some("7"),
                    is_prod,
                )?,
                remember_me_expiry_days: parse_env(
                    "REFRESH_TOKEN_REMEMBER_ME_EXPIRY_DAYS",
                    Some("30"),
                    is_prod,
                )?,
                max_active_sessions: parse_env("MAX_ACTIVE_SESSIONS", Some("3"), is_prod)?,
            },
            otp: OtpConfig {
                expiry_minutes: parse_env("OTP_EXPIRY_MINUTES", Some("10"), is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("MAIL_HOST", Some("localhost"), is_prod)?,
                port: parse_env("MAIL_PORT", Some("587"), is_prod)?,
                user: get_env("MAIL_USER", Some(""), is_prod)?,
                password: get_env("MAIL_PASS", Some(""), is_prod)?,
                from_address: get_env("MAIL_FROM", Some("no-reply@localhost"), is_prod)?,
            },
            frontend_base_url: get_env(
                "FRONTEND_URL",
                Some("http://localhost:3000"),
                is_prod,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt.access_secret.is_empty() {
            return Err(anyhow::anyhow!("JWT_ACCESS_SECRET must not be empty"));
        }

        if self.jwt.access_expiry_minutes <= 0 {
            return Err(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            ));
        }

        if self.session.refresh_expiry_days <= 0 || self.session.remember_me_expiry_days <= 0 {
            return Err(anyhow::anyhow!(
                "refresh token expiry days must be positive"
            ));
        }

        if self.session.max_active_sessions <= 0 {
            return Err(anyhow::anyhow!("MAX_ACTIVE_SESSIONS must be positive"));
        }

        if self.otp.expiry_minutes <= 0 {
            return Err(anyhow::anyhow!("OTP_EXPIRY_MINUTES must be positive"));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, anyhow::Error> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                ))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(anyhow::anyhow!("{} is required but not set", key))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?
        .parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{}: {}", key, e))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
