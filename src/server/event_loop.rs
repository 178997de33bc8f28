use super::client::Client;
use super::config::{BufferLimits, ServerConfig};
use crate::commands::{CommandExecutor, RedisCommandExecutor};
use crate::error::{Result, ServerError};
use crate::storage::Storage;
use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const SERVER_TOKEN: Token = Token(0);

pub struct EventLoop {
    poll: Poll,
    events: Events,
    server: TcpListener,
    clients: HashMap<Token, Client>,
    command_executor: RedisCommandExecutor,
    next_token: usize,
    limits: BufferLimits,

    // Expiry sweep driven by the poll timeout
    sweep_interval: Option<Duration>,
    next_sweep: Option<Instant>,
}

impl EventLoop {
    pub fn new(
        mut server: TcpListener,
        command_executor: RedisCommandExecutor,
        config: &ServerConfig,
    ) -> Result<Self> {
        let poll = Poll::new().map_err(ServerError::io("failed to create poll instance"))?;
        let events = Events::with_capacity(config.max_events);

        // Register server socket for accept events
        poll.registry()
            .register(&mut server, SERVER_TOKEN, Interest::READABLE)
            .map_err(ServerError::io("failed to register listener"))?;

        let sweep_interval = config.sweep_interval;
        Ok(EventLoop {
            poll,
            events,
            server,
            clients: HashMap::new(),
            command_executor,
            next_token: 1, // 0 is reserved for server
            limits: config.limits,
            sweep_interval,
            next_sweep: sweep_interval.map(|interval| Instant::now() + interval),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn run(&mut self) -> Result<()> {
        log::info!("Event loop started");

        loop {
            self.run_once()?;
        }
    }

    /// One wait-and-dispatch round.
    pub fn run_once(&mut self) -> Result<()> {
        let timeout = self.calculate_poll_timeout();

        // Block until events are ready or timeout
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                // A signal is just an empty round.
                self.events.clear();
            }
            Err(e) => return Err(ServerError::Io { context: "poll failed", source: e }),
        }

        self.run_sweep_if_due();

        // Collect events to avoid borrowing conflicts
        let events_to_process: Vec<(Token, bool, bool, bool)> = self
            .events
            .iter()
            .map(|event| {
                (
                    event.token(),
                    event.is_readable(),
                    event.is_writable(),
                    Self::is_hangup(event),
                )
            })
            .collect();

        for (token, is_readable, is_writable, is_hangup) in events_to_process {
            match token {
                SERVER_TOKEN => self.handle_new_connections(),
                token => self.handle_client_event(token, is_readable, is_writable, is_hangup),
            }
        }

        Ok(())
    }

    fn is_hangup(event: &Event) -> bool {
        event.is_error() || event.is_write_closed()
    }

    fn handle_new_connections(&mut self) {
        loop {
            match self.server.accept() {
                Ok((mut socket, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(e) = socket.set_nodelay(true) {
                        log::warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    // Register new client for read events
                    if let Err(e) =
                        self.poll
                            .registry()
                            .register(&mut socket, token, Interest::READABLE)
                    {
                        log::error!("Failed to register client {}: {}", addr, e);
                        continue;
                    }

                    log::info!("New client connection from {} with token {}", addr, token.0);
                    self.clients
                        .insert(token, Client::new(socket, token, self.limits));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    // No more connections to accept right now
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Error accepting connection: {}", e);
                    break;
                }
            }
        }
    }

    fn handle_client_event(
        &mut self,
        token: Token,
        is_readable: bool,
        is_writable: bool,
        is_hangup: bool,
    ) {
        let executor = &mut self.command_executor;
        let Some(client) = self.clients.get_mut(&token) else {
            return;
        };

        let mut alive = !is_hangup;
        if alive && is_readable {
            alive = client.on_readable(|args, out| executor.dispatch(args, out));
        }
        if alive && is_writable {
            alive = client.on_writable();
        }

        if alive {
            let interest = if client.wants_write() {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };
            if let Err(e) = self
                .poll
                .registry()
                .reregister(&mut client.socket, token, interest)
            {
                log::error!("Failed to update interest for client {}: {}", token.0, e);
                alive = false;
            }
        }

        if !alive {
            self.close_client(token);
        }
    }

    fn close_client(&mut self, token: Token) {
        if let Some(mut client) = self.clients.remove(&token) {
            log::info!(
                "Closing client connection {} ({:?})",
                token.0,
                client.close_reason()
            );
            let _ = self.poll.registry().deregister(&mut client.socket);
        }
    }

    fn calculate_poll_timeout(&self) -> Option<Duration> {
        let next_sweep = self.next_sweep?;
        Some(next_sweep.saturating_duration_since(Instant::now()))
    }

    fn run_sweep_if_due(&mut self) {
        let (Some(interval), Some(next_sweep)) = (self.sweep_interval, self.next_sweep) else {
            return;
        };

        let now = Instant::now();
        if now < next_sweep {
            return;
        }

        let removed = self.command_executor.storage_mut().sweep_expired();
        if removed > 0 {
            log::debug!("Expiry sweep removed {} keys", removed);
        }
        self.next_sweep = Some(now + interval);
    }
}
