pub mod client;
pub mod config;
pub mod event_loop;
pub mod listener;

pub use client::{Client, CloseReason};
pub use config::{BufferLimits, ServerConfig};

use crate::commands::RedisCommandExecutor;
use crate::error::{Result, ServerError};
use crate::storage::MemoryStorage;
use event_loop::EventLoop;
use std::net::SocketAddr;

pub struct RedisServer {
    event_loop: EventLoop,
}

impl RedisServer {
    /// Binds the listener and builds the store, executor and event loop.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let address = config.socket_addr()?;

        let listener = listener::bind_listener(address, config.backlog)
            .map_err(ServerError::io("failed to bind listener"))?;
        log::info!("Redis server listening on {}", listener.local_addr().unwrap_or(address));

        let executor = RedisCommandExecutor::new(MemoryStorage::new());
        let event_loop = EventLoop::new(listener, executor, &config)?;

        Ok(Self { event_loop })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.event_loop
            .local_addr()
            .map_err(ServerError::io("failed to read listener address"))
    }

    pub fn run(&mut self) -> Result<()> {
        log::info!("Starting Redis server event loop");
        self.event_loop.run()
    }
}
