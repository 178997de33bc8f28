use bytes::BytesMut;
use mio::{net::TcpStream, Token};
use std::io::{ErrorKind, Read, Write};

use super::config::BufferLimits;
use crate::commands::RedisResponse;
use crate::protocol::{ParseStatus, RespParser};

const READ_CHUNK: usize = 4096;
/// The flushed prefix of the write buffer is only dropped once the cursor
/// is past this many bytes and past half the buffer.
const COMPACT_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    ReadError,
    WriteError,
    ReadBufferFull,
    WriteBufferFull,
    ProtocolError,
}

/// One client connection: its socket, buffers and parser.
pub struct Client<S = TcpStream> {
    pub socket: S,
    pub token: Token,
    read_buffer: BytesMut,
    write_buffer: Vec<u8>,
    write_pos: usize,
    parser: RespParser,
    limits: BufferLimits,
    close_reason: Option<CloseReason>,
}

impl<S: Read + Write> Client<S> {
    pub fn new(socket: S, token: Token, limits: BufferLimits) -> Self {
        Self {
            socket,
            token,
            read_buffer: BytesMut::with_capacity(READ_CHUNK),
            write_buffer: Vec::new(),
            write_pos: 0,
            parser: RespParser::new(),
            limits,
            close_reason: None,
        }
    }

    /// Drains the socket and runs every complete command through `dispatch`.
    ///
    /// Returns `false` once the connection must be torn down.
    pub fn on_readable<F>(&mut self, mut dispatch: F) -> bool
    where
        F: FnMut(&[&[u8]], &mut Vec<u8>),
    {
        if let Err(reason) = self.read_data() {
            return self.close(reason);
        }

        loop {
            match self.parser.parse(&self.read_buffer) {
                Ok(ParseStatus::Complete) => {
                    let args = self.parser.args(&self.read_buffer);
                    log::debug!(
                        "Processing command from client {}: {} args",
                        self.token.0,
                        args.len()
                    );
                    dispatch(&args[..], &mut self.write_buffer);
                    drop(args);
                    self.parser.consume(&mut self.read_buffer);

                    if self.pending_write_bytes() > self.limits.max_write_buffer {
                        return self.close(CloseReason::WriteBufferFull);
                    }
                }
                Ok(ParseStatus::Incomplete) => return true,
                Err(e) => {
                    log::debug!("Protocol error from client {}: {}", self.token.0, e);
                    RedisResponse::error("protocol error").write_to(&mut self.write_buffer);
                    // Best effort: whatever the socket takes right now is all
                    // the client gets before the close.
                    let _ = self.write_data();
                    return self.close(CloseReason::ProtocolError);
                }
            }
        }
    }

    /// Flushes as much of the pending output as the socket accepts.
    pub fn on_writable(&mut self) -> bool {
        match self.write_data() {
            Ok(()) => true,
            Err(reason) => self.close(reason),
        }
    }

    pub fn wants_write(&self) -> bool {
        self.write_pos < self.write_buffer.len()
    }

    pub fn pending_write_bytes(&self) -> usize {
        self.write_buffer.len() - self.write_pos
    }

    pub fn buffered_read_bytes(&self) -> usize {
        self.read_buffer.len()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    fn close(&mut self, reason: CloseReason) -> bool {
        log::debug!("Client {} terminating: {:?}", self.token.0, reason);
        self.close_reason = Some(reason);
        false
    }

    fn read_data(&mut self) -> Result<(), CloseReason> {
        let mut temp_buffer = [0u8; READ_CHUNK];

        loop {
            // Ask for at most one byte past the cap so an oversized request
            // is detected without buffering more than that.
            let room = self.limits.max_read_buffer - self.read_buffer.len();
            let want = room.saturating_add(1).min(READ_CHUNK);

            match self.socket.read(&mut temp_buffer[..want]) {
                Ok(0) => {
                    log::debug!("Client {} closed connection", self.token.0);
                    return Err(CloseReason::PeerClosed);
                }
                Ok(n) if n > room => {
                    log::warn!(
                        "Client {} exceeded the {} byte read buffer",
                        self.token.0,
                        self.limits.max_read_buffer
                    );
                    return Err(CloseReason::ReadBufferFull);
                }
                Ok(n) => {
                    log::debug!("Read {} bytes from client {}", n, self.token.0);
                    self.read_buffer.extend_from_slice(&temp_buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("Error reading from client {}: {}", self.token.0, e);
                    return Err(CloseReason::ReadError);
                }
            }
        }
    }

    fn write_data(&mut self) -> Result<(), CloseReason> {
        while self.wants_write() {
            match self.socket.write(&self.write_buffer[self.write_pos..]) {
                Ok(0) => {
                    log::debug!("Client {} stopped accepting writes", self.token.0);
                    return Err(CloseReason::WriteError);
                }
                Ok(n) => {
                    log::debug!("Wrote {} bytes to client {}", n, self.token.0);
                    self.write_pos += n;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    self.compact_write_buffer();
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("Error writing to client {}: {}", self.token.0, e);
                    return Err(CloseReason::WriteError);
                }
            }
        }

        self.clear_write_buffer();
        Ok(())
    }

    fn compact_write_buffer(&mut self) {
        if self.write_pos >= COMPACT_THRESHOLD && self.write_pos >= self.write_buffer.len() / 2 {
            self.write_buffer.drain(..self.write_pos);
            self.write_pos = 0;
        }
    }

    fn clear_write_buffer(&mut self) {
        self.write_buffer.clear();
        self.write_pos = 0;
    }
}

#[cfg(test)]
impl<S> Client<S> {
    fn write_pos(&self) -> usize {
        self.write_pos
    }
}
