//! Redis backend over RESP2.
//!
//! A small synchronous client: one TCP connection, commands encoded as RESP
//! arrays of bulk strings, replies parsed into [`Reply`]. No reconnection
//! and no retries; any transport failure surfaces as
//! `ServeError::StoreUnavailable`.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;

use parking_lot::Mutex;
use serving_core::{ServeError, ServeResult};

use crate::traits::{KvStore, ScanPage, WriteBatch};

/// Largest bulk string accepted from the server (Redis `proto-max-bulk-len`).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// A parsed RESP2 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`
    Simple(String),
    /// `-ERR ...`
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$n` payload; `None` for the null bulk string
    Bulk(Option<Vec<u8>>),
    /// `*n` elements; `None` for the null array
    Array(Option<Vec<Reply>>),
}

impl Reply {
    fn describe(&self) -> String {
        match self {
            Reply::Simple(s) => format!("simple string '{}'", s),
            Reply::Error(e) => format!("error '{}'", e),
            Reply::Integer(n) => format!("integer {}", n),
            Reply::Bulk(None) => "null bulk string".to_string(),
            Reply::Bulk(Some(b)) => format!("bulk string of {} bytes", b.len()),
            Reply::Array(None) => "null array".to_string(),
            Reply::Array(Some(items)) => format!("array of {} elements", items.len()),
        }
    }
}

/// Encode one command as a RESP array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn read_line<R: BufRead>(r: &mut R) -> ServeResult<String> {
    let mut line = Vec::new();
    let n = r
        .read_until(b'\n', &mut line)
        .map_err(|e| ServeError::unavailable("read reply", e))?;
    if n == 0 {
        return Err(ServeError::unavailable(
            "read reply",
            io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by store"),
        ));
    }
    if !line.ends_with(b"\r\n") {
        return Err(ServeError::protocol("reply line not terminated by CRLF"));
    }
    line.truncate(line.len() - 2);
    String::from_utf8(line).map_err(|_| ServeError::protocol("reply line is not UTF-8"))
}

fn parse_len(s: &str) -> ServeResult<i64> {
    s.parse::<i64>()
        .map_err(|_| ServeError::protocol(format!("invalid length '{}'", s)))
}

/// Read one complete reply from `r`.
pub fn read_reply<R: BufRead>(r: &mut R) -> ServeResult<Reply> {
    let line = read_line(r)?;
    let (kind, rest) = match line.chars().next() {
        Some(c) => (c, &line[c.len_utf8()..]),
        None => return Err(ServeError::protocol("empty reply line")),
    };
    match kind {
        '+' => Ok(Reply::Simple(rest.to_string())),
        '-' => Ok(Reply::Error(rest.to_string())),
        ':' => Ok(Reply::Integer(parse_len(rest)?)),
        '$' => {
            let len = parse_len(rest)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            if len > MAX_BULK_LEN {
                return Err(ServeError::protocol(format!(
                    "bulk string length {} exceeds {}",
                    len, MAX_BULK_LEN
                )));
            }
            let mut buf = vec![0u8; len as usize + 2];
            r.read_exact(&mut buf)
                .map_err(|e| ServeError::unavailable("read bulk string", e))?;
            if !buf.ends_with(b"\r\n") {
                return Err(ServeError::protocol("bulk string not terminated by CRLF"));
            }
            buf.truncate(len as usize);
            Ok(Reply::Bulk(Some(buf)))
        }
        '*' => {
            let len = parse_len(rest)?;
            if len < 0 {
                return Ok(Reply::Array(None));
            }
            let mut items = Vec::with_capacity((len as usize).min(1024));
            for _ in 0..len {
                items.push(read_reply(&mut *r)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(ServeError::protocol(format!(
            "unknown reply type byte '{}'",
            other
        ))),
    }
}

fn bulk_to_string(bytes: Vec<u8>, what: &str) -> ServeResult<String> {
    String::from_utf8(bytes).map_err(|_| ServeError::serialization(format!("{} is not UTF-8", what)))
}

fn expect_ok(reply: Reply, command: &str) -> ServeResult<()> {
    match reply {
        Reply::Simple(s) if s == "OK" => Ok(()),
        other => Err(ServeError::protocol(format!(
            "unexpected reply to {}: {}",
            command,
            other.describe()
        ))),
    }
}

fn expect_integer(reply: Reply, command: &str) -> ServeResult<u64> {
    match reply {
        Reply::Integer(n) if n >= 0 => Ok(n as u64),
        other => Err(ServeError::protocol(format!(
            "unexpected reply to {}: {}",
            command,
            other.describe()
        ))),
    }
}

fn parse_scan_reply(reply: Reply) -> ServeResult<ScanPage> {
    let unexpected = |r: &Reply| {
        ServeError::protocol(format!("unexpected reply to SCAN: {}", r.describe()))
    };
    let items = match reply {
        Reply::Array(Some(items)) if items.len() == 2 => items,
        other => return Err(unexpected(&other)),
    };
    let mut items = items.into_iter();
    let cursor = match items.next() {
        Some(Reply::Bulk(Some(b))) => {
            let s = bulk_to_string(b, "SCAN cursor")?;
            s.parse::<u64>()
                .map_err(|_| ServeError::protocol(format!("invalid SCAN cursor '{}'", s)))?
        }
        Some(other) => return Err(unexpected(&other)),
        None => return Err(ServeError::protocol("SCAN reply missing cursor")),
    };
    let keys = match items.next() {
        Some(Reply::Array(Some(keys))) => keys
            .into_iter()
            .map(|k| match k {
                Reply::Bulk(Some(b)) => bulk_to_string(b, "key"),
                other => Err(unexpected(&other)),
            })
            .collect::<ServeResult<Vec<_>>>()?,
        Some(other) => return Err(unexpected(&other)),
        None => return Err(ServeError::protocol("SCAN reply missing keys")),
    };
    Ok(ScanPage { cursor, keys })
}

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Connection {
    fn send(&mut self, commands: &[Vec<u8>]) -> ServeResult<()> {
        for cmd in commands {
            self.writer
                .write_all(cmd)
                .map_err(|e| ServeError::unavailable("write command", e))?;
        }
        self.writer
            .flush()
            .map_err(|e| ServeError::unavailable("flush commands", e))
    }

    fn call(&mut self, args: &[&[u8]]) -> ServeResult<Reply> {
        self.send(&[encode_command(args)])?;
        match read_reply(&mut self.reader)? {
            Reply::Error(msg) => Err(ServeError::protocol(msg)),
            reply => Ok(reply),
        }
    }
}

/// [`KvStore`] backed by a Redis server.
pub struct RespStore {
    addr: String,
    conn: Mutex<Connection>,
}

impl RespStore {
    /// Connect to `host:port` and select database `db` when non-zero.
    pub fn connect(host: &str, port: u16, db: u32) -> ServeResult<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect((host, port))
            .map_err(|e| ServeError::unavailable(format!("connect {}", addr), e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| ServeError::unavailable(format!("configure {}", addr), e))?;
        let write_half = stream
            .try_clone()
            .map_err(|e| ServeError::unavailable(format!("clone stream {}", addr), e))?;

        let store = Self {
            addr,
            conn: Mutex::new(Connection {
                reader: BufReader::new(stream),
                writer: BufWriter::new(write_half),
            }),
        };
        if db != 0 {
            let db = db.to_string();
            let reply = store.conn.lock().call(&[b"SELECT", db.as_bytes()])?;
            expect_ok(reply, "SELECT")?;
        }
        tracing::debug!(target: "serving::store", addr = %store.addr, db = %db, "connected");
        Ok(store)
    }

    /// Address this store is connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl KvStore for RespStore {
    fn get(&self, key: &str) -> ServeResult<Option<String>> {
        match self.conn.lock().call(&[b"GET", key.as_bytes()])? {
            Reply::Bulk(Some(b)) => bulk_to_string(b, "value").map(Some),
            Reply::Bulk(None) => Ok(None),
            other => Err(ServeError::protocol(format!(
                "unexpected reply to GET: {}",
                other.describe()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> ServeResult<()> {
        let reply = self
            .conn
            .lock()
            .call(&[b"SET", key.as_bytes(), value.as_bytes()])?;
        expect_ok(reply, "SET")
    }

    fn delete(&self, keys: &[String]) -> ServeResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
        args.push(b"DEL");
        args.extend(keys.iter().map(|k| k.as_bytes()));
        let reply = self.conn.lock().call(&args)?;
        expect_integer(reply, "DEL")
    }

    fn scan(&self, cursor: u64, pattern: &str, count: usize) -> ServeResult<ScanPage> {
        let cursor = cursor.to_string();
        let count = count.max(1).to_string();
        let reply = self.conn.lock().call(&[
            b"SCAN",
            cursor.as_bytes(),
            b"MATCH",
            pattern.as_bytes(),
            b"COUNT",
            count.as_bytes(),
        ])?;
        parse_scan_reply(reply)
    }

    fn dbsize(&self) -> ServeResult<u64> {
        let reply = self.conn.lock().call(&[b"DBSIZE"])?;
        expect_integer(reply, "DBSIZE")
    }

    fn flushdb(&self) -> ServeResult<()> {
        let reply = self.conn.lock().call(&[b"FLUSHDB"])?;
        expect_ok(reply, "FLUSHDB")
    }

    fn apply_batch(&self, batch: WriteBatch) -> ServeResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let commands: Vec<Vec<u8>> = batch
            .sets()
            .iter()
            .map(|(k, v)| encode_command(&[b"SET", k.as_bytes(), v.as_bytes()]))
            .collect();

        let mut conn = self.conn.lock();
        conn.send(&commands)?;

        // Every reply must be drained to keep the connection in sync, even
        // after an error reply.
        let mut first_error = None;
        for _ in 0..commands.len() {
            let result = match read_reply(&mut conn.reader)? {
                Reply::Error(msg) => Err(ServeError::protocol(msg)),
                other => expect_ok(other, "SET"),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RespStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespStore").field("addr", &self.addr).finish()
    }
}
