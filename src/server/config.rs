use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_BACKLOG: i32 = 128;
pub const DEFAULT_BUFFER_LIMIT: usize = 1 << 20; // 1 MiB
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MAX_EVENTS: usize = 128;

/// Per-connection buffer caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    pub max_read_buffer: usize,
    pub max_write_buffer: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            max_read_buffer: DEFAULT_BUFFER_LIMIT,
            max_write_buffer: DEFAULT_BUFFER_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backlog: i32,
    pub limits: BufferLimits,
    /// `None` leaves expired keys to lazy removal only.
    pub sweep_interval: Option<Duration>,
    pub max_events: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            limits: BufferLimits::default(),
            sweep_interval: Some(Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS)),
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl ServerConfig {
    /// Builds a config from command-line flags (program name already skipped).
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            let mut value = || args.next().ok_or_else(|| ConfigError::MissingValue(flag.clone()));
            match flag.as_str() {
                "--host" => config.host = value()?,
                "--port" => config.port = parse_value(&flag, value()?)?,
                "--backlog" => config.backlog = parse_value(&flag, value()?)?,
                "--max-read-buffer" => {
                    config.limits.max_read_buffer = parse_value(&flag, value()?)?
                }
                "--max-write-buffer" => {
                    config.limits.max_write_buffer = parse_value(&flag, value()?)?
                }
                "--sweep-interval-ms" => {
                    let millis: u64 = parse_value(&flag, value()?)?;
                    config.sweep_interval = (millis > 0).then(|| Duration::from_millis(millis));
                }
                "--max-events" => config.max_events = parse_value(&flag, value()?)?,
                _ => return Err(ConfigError::UnknownFlag(flag.clone())),
            }
        }

        Ok(config)
    }

    pub fn get_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.get_addr()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.get_addr()))
    }
}

fn parse_value<T: FromStr>(flag: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}
