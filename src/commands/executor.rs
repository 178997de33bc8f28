use super::{CommandParser, RedisCommand, RedisResponse};
use crate::storage::{MemoryStorage, Storage};
use bytes::Bytes;

pub trait CommandExecutor {
    fn execute(&mut self, command: RedisCommand<'_>) -> RedisResponse;

    /// Validates `args`, runs the command and appends the reply to `out`.
    ///
    /// Invalid requests get an error reply and never touch the store.
    fn dispatch(&mut self, args: &[&[u8]], out: &mut Vec<u8>) {
        let response = match CommandParser::parse(args) {
            Ok(command) => self.execute(command),
            Err(error) => {
                log::debug!("Rejected command: {}", error);
                RedisResponse::error(error)
            }
        };
        response.write_to(out);
    }
}

pub struct RedisCommandExecutor {
    storage: MemoryStorage,
}

impl RedisCommandExecutor {
    pub fn new(storage: MemoryStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut MemoryStorage {
        &mut self.storage
    }
}

impl CommandExecutor for RedisCommandExecutor {
    fn execute(&mut self, command: RedisCommand<'_>) -> RedisResponse {
        log::debug!("Executing command: {:?}", command);

        match command {
            RedisCommand::Ping(message) => match message {
                Some(msg) => RedisResponse::bulk(msg),
                None => RedisResponse::pong(),
            },
            RedisCommand::Echo(message) => RedisResponse::bulk(message),
            RedisCommand::Get(key) => match self.storage.get(key) {
                Some(value) => RedisResponse::BulkString(Some(value)),
                None => RedisResponse::nil(),
            },
            RedisCommand::Set(key, value) => {
                self.storage
                    .set(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
                RedisResponse::ok()
            }
            RedisCommand::Del(keys) => {
                let deleted = self.storage.delete_multiple(&keys);
                RedisResponse::Integer(deleted as i64)
            }
            RedisCommand::Exists(keys) => {
                let exists = self.storage.exists_multiple(&keys);
                RedisResponse::Integer(exists as i64)
            }
            RedisCommand::Expire(key, ttl) => {
                let applied = self.storage.expire(key, ttl);
                RedisResponse::Integer(i64::from(applied))
            }
            RedisCommand::Ttl(key) => RedisResponse::Integer(self.storage.ttl(key)),
        }
    }
}

impl Default for RedisCommandExecutor {
    fn default() -> Self {
        Self::new(MemoryStorage::new())
    }
}
