// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub run_migrations: bool,
  pub app_base_url: String,

  /// HS256 secret shared with the auth provider that issues bearer tokens.
  pub jwt_secret: String,

  pub whatsapp: WhatsappConfig,
  pub push: PushConfig,
  pub dispatcher: DispatcherConfig,
  pub realtime: RealtimeConfig,

  pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WhatsappConfig {
  pub api_url: String,
  pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
  /// Uncompressed P-256 public key, base64url, as handed to browsers.
  pub vapid_public_key: String,
  /// PKCS#8 PEM of the matching private key. Empty disables push.
  pub vapid_private_key_pem: String,
  /// `mailto:` or `https:` contact placed in the VAPID `sub` claim.
  pub vapid_subject: String,
  pub icon_url: String,
  pub ttl_secs: u32,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
  pub max_attempts: i32,
  pub retry_base: Duration,
  pub poll_interval: Duration,
  pub batch_size: i64,
  /// How long a claimed entry stays invisible to other dispatchers.
  pub claim_lease: Duration,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
  pub debounce: Duration,
  pub visibility_grace: Duration,
  pub channel_capacity: usize,
  pub dedup_capacity: usize,
  /// How long an event id is remembered for de-duplication.
  pub dedup_window: Duration,
}

impl Default for DispatcherConfig {
  fn default() -> Self {
    Self {
      max_attempts: 5,
      retry_base: Duration::from_secs(30),
      poll_interval: Duration::from_secs(5),
      batch_size: 50,
      claim_lease: Duration::from_secs(120),
    }
  }
}

impl Default for RealtimeConfig {
  fn default() -> Self {
    Self {
      debounce: Duration::from_millis(2000),
      visibility_grace: Duration::from_millis(3000),
      channel_capacity: 256,
      dedup_capacity: 1024,
      dedup_window: Duration::from_secs(60),
    }
  }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, default: T) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    Err(_) => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_env("SERVER_PORT", 8080u16)?;
    let database_url = get_env("DATABASE_URL")?;
    let run_migrations = parse_env("RUN_MIGRATIONS", false)?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    let jwt_secret = get_env("JWT_SECRET")?;

    let whatsapp = WhatsappConfig {
      api_url: get_env("WHATSAPP_API_URL").unwrap_or_default(),
      api_key: get_env("WHATSAPP_API_KEY").unwrap_or_default(),
    };

    let vapid_private_key_pem = match get_env("VAPID_PRIVATE_KEY_PEM") {
      Ok(pem) => pem.replace("\\n", "\n"),
      Err(_) => match get_env("VAPID_PRIVATE_KEY_PATH") {
        Ok(path) => std::fs::read_to_string(&path)
          .map_err(|e| AppError::Config(format!("Cannot read VAPID key at '{}': {}", path, e)))?,
        Err(_) => String::new(),
      },
    };
    let push = PushConfig {
      vapid_public_key: get_env("VAPID_PUBLIC_KEY").unwrap_or_default(),
      vapid_private_key_pem,
      vapid_subject: get_env("VAPID_SUBJECT").unwrap_or_else(|_| "mailto:suporte@example.com".to_string()),
      icon_url: get_env("PUSH_ICON_URL").unwrap_or_else(|_| format!("{}/icons/icon-192.png", app_base_url)),
      ttl_secs: parse_env("PUSH_TTL_SECS", 86_400u32)?,
    };

    let defaults = DispatcherConfig::default();
    let dispatcher = DispatcherConfig {
      max_attempts: parse_env("NOTIFICATION_MAX_ATTEMPTS", defaults.max_attempts)?,
      retry_base: Duration::from_secs(parse_env("NOTIFICATION_RETRY_BASE_SECS", 30u64)?),
      poll_interval: Duration::from_secs(parse_env("DISPATCHER_POLL_SECS", 5u64)?),
      batch_size: parse_env("DISPATCHER_BATCH_SIZE", defaults.batch_size)?,
      claim_lease: defaults.claim_lease,
    };
    if dispatcher.max_attempts < 1 {
      return Err(AppError::Config("NOTIFICATION_MAX_ATTEMPTS must be at least 1".to_string()));
    }
    if dispatcher.batch_size < 1 {
      return Err(AppError::Config("DISPATCHER_BATCH_SIZE must be at least 1".to_string()));
    }

    let realtime_defaults = RealtimeConfig::default();
    let realtime = RealtimeConfig {
      debounce: Duration::from_millis(parse_env("REALTIME_DEBOUNCE_MS", 2000u64)?),
      visibility_grace: Duration::from_millis(parse_env("REALTIME_VISIBILITY_GRACE_MS", 3000u64)?),
      ..realtime_defaults
    };

    let http_timeout = Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 10u64)?);

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      run_migrations,
      app_base_url,
      jwt_secret,
      whatsapp,
      push,
      dispatcher,
      realtime,
      http_timeout,
    })
  }
}
