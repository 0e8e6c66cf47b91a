//! Configuration for the pipeline processes, read from the environment.
//!
//! Every `from_env` loads an optional `.env` file first. The `from_lookup`
//! variants take the variable source as a closure so they can be tested
//! without touching the process environment.

use crate::domain::media::CodecProfile;
use crate::domain::topics;
use crate::domain::video::CONVERTED_CONTAINER;
use crate::error::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

fn load_dotenv() {
    dotenv::dotenv().ok();
}

fn env_lookup(var: &str) -> Option<String> {
    env::var(var).ok()
}

fn string_or<L>(lookup: &L, var: &str, default: &str) -> String
where
    L: Fn(&str) -> Option<String>,
{
    lookup(var).unwrap_or_else(|| String::from(default))
}

fn parse_or<L, T>(lookup: &L, var: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

/// HTTP bind address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: &L) -> Result<Self, ConfigError> {
        Ok(Self {
            addr: string_or(lookup, "SERVER_ADDR", "0.0.0.0"),
            port: parse_or(lookup, "SERVER_PORT", 3000)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// Connection to the Redis instance backing the broker and the state store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerConfig {
    pub redis_url: String,
    pub pubsub_name: String,
    pub max_deliveries: u32,
}

impl BrokerConfig {
    fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: &L) -> Result<Self, ConfigError> {
        Ok(Self {
            redis_url: string_or(lookup, "REDIS_URL", "redis://127.0.0.1/"),
            pubsub_name: string_or(lookup, "PUBSUB_NAME", "pubsub"),
            max_deliveries: parse_or(lookup, "MAX_DELIVERIES", 5)?,
        })
    }
}

/// Settings of the external media engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaConfig {
    pub ffmpeg_bin: String,
    pub timeout: Option<Duration>,
    pub converted_extension: String,
    pub profile: CodecProfile,
}

impl MediaConfig {
    fn from_lookup<L: Fn(&str) -> Option<String>>(lookup: &L) -> Result<Self, ConfigError> {
        let defaults = CodecProfile::default();
        let timeout = match lookup("MEDIA_TIMEOUT_SECS") {
            None => None,
            Some(value) => {
                let secs: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "MEDIA_TIMEOUT_SECS",
                    value,
                })?;
                Some(Duration::from_secs(secs))
            }
        };

        Ok(Self {
            ffmpeg_bin: string_or(lookup, "FFMPEG_BIN", "ffmpeg"),
            timeout,
            converted_extension: string_or(lookup, "CONVERTED_EXTENSION", CONVERTED_CONTAINER),
            profile: CodecProfile {
                video: string_or(lookup, "VIDEO_CODEC", &defaults.video),
                audio: string_or(lookup, "AUDIO_CODEC", &defaults.audio),
            },
        })
    }
}

/// Which pipeline stage a process runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Merger,
    Converter,
    Compressor,
}

impl StageKind {
    pub fn default_sub_topic(self) -> &'static str {
        match self {
            StageKind::Merger => topics::VIDEO_RECORDED,
            StageKind::Converter => topics::VIDEO_MERGED,
            StageKind::Compressor => topics::VIDEO_CONVERTED,
        }
    }

    pub fn default_pub_topic(self) -> Option<&'static str> {
        match self {
            StageKind::Merger => Some(topics::VIDEO_MERGED),
            StageKind::Converter => Some(topics::VIDEO_CONVERTED),
            StageKind::Compressor => None,
        }
    }
}

/// Configuration of one stage process.
#[derive(Clone, Debug)]
pub struct StageConfig {
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    pub media: MediaConfig,
    pub sub_topic: String,
    /// `None` ends the pipeline at this stage.
    pub pub_topic: Option<String>,
    pub subscription_route: String,
    /// Pull workers; `0` leaves the stage push-only.
    pub workers: usize,
}

impl StageConfig {
    pub fn from_env(kind: StageKind) -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(kind, env_lookup)
    }

    pub fn from_lookup<L>(kind: StageKind, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let pub_topic = match lookup("PUB_TOPIC") {
            Some(topic) if topic.trim().is_empty() => None,
            Some(topic) => Some(topic),
            None => kind.default_pub_topic().map(String::from),
        };

        let mut subscription_route = string_or(&lookup, "SUBSCRIPTION_ROUTE", "/events");
        if !subscription_route.starts_with('/') {
            subscription_route.insert(0, '/');
        }

        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            broker: BrokerConfig::from_lookup(&lookup)?,
            media: MediaConfig::from_lookup(&lookup)?,
            sub_topic: string_or(&lookup, "SUB_TOPIC", kind.default_sub_topic()),
            pub_topic,
            subscription_route,
            workers: parse_or(&lookup, "WORKERS", 4)?,
        })
    }
}

/// Configuration of the ingest and marker API.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    /// Topic the record notification is published to.
    pub pub_topic: String,
    pub state_store_name: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            broker: BrokerConfig::from_lookup(&lookup)?,
            pub_topic: string_or(&lookup, "PUB_TOPIC", topics::VIDEO_RECORDED),
            state_store_name: string_or(&lookup, "STATE_STORE_NAME", "statestore"),
        })
    }
}

/// Configuration for the single-process deployment running every stage.
#[derive(Clone, Debug)]
pub struct MonolithConfig {
    pub api: ApiConfig,
    pub media: MediaConfig,
    /// In-process broker and store when unset.
    pub redis_url: Option<String>,
    pub workers: usize,
}

impl MonolithConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api: ApiConfig::from_lookup(&lookup)?,
            media: MediaConfig::from_lookup(&lookup)?,
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            workers: parse_or(&lookup, "WORKERS", 4)?,
        })
    }
}
