pub mod resp;

pub use resp::{ParseStatus, ParserState, ProtocolError, RespParser};
