pub mod commands;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::{CommandExecutor, RedisCommand, RedisCommandExecutor, RedisResponse};
pub use error::{ConfigError, ServerError};
pub use protocol::resp::RespParser;
pub use server::{RedisServer, ServerConfig};
pub use storage::{MemoryStorage, Storage};
