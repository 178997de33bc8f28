use super::RedisCommand;
use std::time::Duration;
use thiserror::Error;

/// Application-level failures. The `Display` text is what the client sees
/// after `-ERR `.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    EmptyCommand,

    #[error("unknown command")]
    UnknownCommand,

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    #[error("invalid expire time")]
    InvalidExpireTime,
}

pub struct CommandParser;

impl CommandParser {
    /// Names are matched exactly; `get` is not `GET`.
    pub fn parse<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        let Some(name) = args.first() else {
            return Err(CommandError::EmptyCommand);
        };

        match *name {
            b"PING" => Self::parse_ping(args),
            b"ECHO" => Self::parse_echo(args),
            b"SET" => Self::parse_set(args),
            b"GET" => Self::parse_get(args),
            b"DEL" => Self::parse_del(args),
            b"EXISTS" => Self::parse_exists(args),
            b"EXPIRE" => Self::parse_expire(args),
            b"TTL" => Self::parse_ttl(args),
            _ => Err(CommandError::UnknownCommand),
        }
    }

    fn parse_ping<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        match args.len() {
            1 => Ok(RedisCommand::Ping(None)),
            2 => Ok(RedisCommand::Ping(Some(args[1]))),
            _ => Err(CommandError::WrongArity("ping")),
        }
    }

    fn parse_echo<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() != 2 {
            return Err(CommandError::WrongArity("echo"));
        }
        Ok(RedisCommand::Echo(args[1]))
    }

    fn parse_set<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() != 3 {
            return Err(CommandError::WrongArity("set"));
        }
        Ok(RedisCommand::Set(args[1], args[2]))
    }

    fn parse_get<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() != 2 {
            return Err(CommandError::WrongArity("get"));
        }
        Ok(RedisCommand::Get(args[1]))
    }

    fn parse_del<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::WrongArity("del"));
        }
        Ok(RedisCommand::Del(args[1..].to_vec()))
    }

    fn parse_exists<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::WrongArity("exists"));
        }
        Ok(RedisCommand::Exists(args[1..].to_vec()))
    }

    fn parse_expire<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() != 3 {
            return Err(CommandError::WrongArity("expire"));
        }
        let millis = Self::parse_millis(args[2])?;
        Ok(RedisCommand::Expire(args[1], Duration::from_millis(millis)))
    }

    fn parse_ttl<'a>(args: &[&'a [u8]]) -> Result<RedisCommand<'a>, CommandError> {
        if args.len() != 2 {
            return Err(CommandError::WrongArity("ttl"));
        }
        Ok(RedisCommand::Ttl(args[1]))
    }

    // Signed parse so "-5" is rejected as negative rather than as garbage;
    // either way the reply is the same.
    fn parse_millis(raw: &[u8]) -> Result<u64, CommandError> {
        let millis = std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandError::InvalidExpireTime)?;
        u64::try_from(millis).map_err(|_| CommandError::InvalidExpireTime)
    }
}
