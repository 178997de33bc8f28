use bytes::Bytes;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, PartialEq)]
pub enum RedisResponse {
    SimpleString(&'static str),
    BulkString(Option<Bytes>), // None represents null
    Integer(i64),
    Error(String),
}

impl RedisResponse {
    /// Appends the wire encoding to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            RedisResponse::SimpleString(s) => {
                out.push(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(CRLF);
            }
            RedisResponse::BulkString(Some(data)) => {
                out.push(b'$');
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(CRLF);
                out.extend_from_slice(data);
                out.extend_from_slice(CRLF);
            }
            RedisResponse::BulkString(None) => out.extend_from_slice(b"$-1\r\n"),
            RedisResponse::Integer(i) => {
                out.push(b':');
                out.extend_from_slice(i.to_string().as_bytes());
                out.extend_from_slice(CRLF);
            }
            RedisResponse::Error(e) => {
                out.extend_from_slice(b"-ERR ");
                out.extend_from_slice(e.as_bytes());
                out.extend_from_slice(CRLF);
            }
        }
    }

    pub fn to_resp(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    pub fn ok() -> Self {
        RedisResponse::SimpleString("OK")
    }

    pub fn pong() -> Self {
        RedisResponse::SimpleString("PONG")
    }

    pub fn nil() -> Self {
        RedisResponse::BulkString(None)
    }

    pub fn bulk(data: &[u8]) -> Self {
        RedisResponse::BulkString(Some(Bytes::copy_from_slice(data)))
    }

    pub fn error(msg: impl ToString) -> Self {
        RedisResponse::Error(msg.to_string())
    }
}
