pub mod executor;
pub mod parser;
pub mod response;

pub use executor::{CommandExecutor, RedisCommandExecutor};
pub use parser::{CommandError, CommandParser};
pub use response::RedisResponse;

use std::time::Duration;

/// A validated request. Arguments borrow from the connection's read buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum RedisCommand<'a> {
    Ping(Option<&'a [u8]>),
    Echo(&'a [u8]),
    Get(&'a [u8]),
    Set(&'a [u8], &'a [u8]),
    Del(Vec<&'a [u8]>),
    Exists(Vec<&'a [u8]>),
    Expire(&'a [u8], Duration),
    Ttl(&'a [u8]),
}
