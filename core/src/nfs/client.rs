//! Minimal NFSv4.0 client: enough to list one directory
//!
//! Speaks ONC RPC over TCP with record marking. Every listing is a single
//! COMPOUND of `PUTROOTFH`, one `LOOKUP` per path component and `READDIR`,
//! repeated with the returned cookie until the server reports `eof`.

use super::xdr::{XdrReader, XdrWriter};
use super::NfsError;
use chrono::{DateTime, Utc};
use schema::FileEntry;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Default NFS port
pub const NFS_PORT: u16 = 2049;

pub(crate) const NFS_PROGRAM: u32 = 100_003;
pub(crate) const NFS_V4: u32 = 4;
pub(crate) const PROC_NULL: u32 = 0;
pub(crate) const PROC_COMPOUND: u32 = 1;

const RPC_VERSION: u32 = 2;
const MSG_CALL: u32 = 0;
const MSG_REPLY: u32 = 1;
const REPLY_ACCEPTED: u32 = 0;
const ACCEPT_SUCCESS: u32 = 0;
pub(crate) const AUTH_NONE: u32 = 0;
pub(crate) const AUTH_SYS: u32 = 1;

const LAST_FRAGMENT: u32 = 0x8000_0000;
const MAX_RECORD: usize = 16 * 1024 * 1024;

pub(crate) const OP_LOOKUP: u32 = 15;
pub(crate) const OP_PUTROOTFH: u32 = 24;
pub(crate) const OP_READDIR: u32 = 26;

pub(crate) const NF4DIR: u32 = 2;
const FATTR4_TYPE: u32 = 1;
const FATTR4_SIZE: u32 = 4;
const FATTR4_TIME_MODIFY: u32 = 53;
pub(crate) const ATTR_WORD0: u32 = 1 << FATTR4_TYPE | 1 << FATTR4_SIZE;
pub(crate) const ATTR_WORD1: u32 = 1 << (FATTR4_TIME_MODIFY - 32);

const READDIR_DIRCOUNT: u32 = 8 * 1024;
const READDIR_MAXCOUNT: u32 = 64 * 1024;

/// AUTH_SYS identity presented to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    pub uid: u32,
    pub gid: u32,
    pub machine_name: String,
}

/// Resolve `host` or `host:port` into a dialable address, defaulting to 2049
pub fn server_address(server: &str) -> String {
    if server.parse::<std::net::SocketAddr>().is_ok() {
        return server.to_string();
    }
    match server.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            server.to_string()
        }
        _ if server.contains(':') => format!("[{server}]:{NFS_PORT}"),
        _ => format!("{server}:{NFS_PORT}"),
    }
}

/// One connection to an NFSv4 server
#[derive(Debug)]
pub struct Nfs4Client {
    stream: TcpStream,
    auth: AuthParams,
    xid: u32,
}

impl Nfs4Client {
    /// Dial `address` and check that the NFS program answers a NULL call
    pub async fn connect(address: &str, auth: AuthParams) -> Result<Self, NfsError> {
        debug!("connecting to nfs server at {}", address);
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        let mut client = Self {
            stream,
            auth,
            xid: rand::random(),
        };
        client.call(PROC_NULL, &[]).await?;
        Ok(client)
    }

    /// List the directory at `path`, resolved from the server's root
    pub async fn list_dir(&mut self, path: &str) -> Result<Vec<FileEntry>, NfsError> {
        let components = path_components(path);
        let mut entries = Vec::new();
        let mut cookie = 0u64;
        let mut verifier = [0u8; 8];

        loop {
            let args = encode_readdir_compound(&components, cookie, &verifier)?;
            let reply = self.call(PROC_COMPOUND, &args).await?;
            let page = decode_readdir_compound(&reply)?;
            trace!(
                "READDIR page for {:?}: {} entries, eof={}",
                path,
                page.entries.len(),
                page.eof
            );

            let last_cookie = page.entries.last().map(|(c, _)| *c);
            entries.extend(page.entries.into_iter().map(|(_, entry)| entry));
            if page.eof {
                break;
            }
            match last_cookie {
                Some(next) => {
                    cookie = next;
                    verifier = page.verifier;
                }
                None => {
                    return Err(NfsError::Decode(
                        "READDIR returned an empty page before eof".to_string(),
                    ))
                }
            }
        }

        Ok(entries)
    }

    async fn call(&mut self, procedure: u32, args: &[u8]) -> Result<Vec<u8>, NfsError> {
        self.xid = self.xid.wrapping_add(1);
        let xid = self.xid;

        let mut msg = XdrWriter::new();
        msg.put_u32(xid)
            .put_u32(MSG_CALL)
            .put_u32(RPC_VERSION)
            .put_u32(NFS_PROGRAM)
            .put_u32(NFS_V4)
            .put_u32(procedure);
        put_auth_sys(&mut msg, &self.auth)?;
        msg.put_u32(AUTH_NONE).put_u32(0);
        msg.put_fixed(args);

        write_record(&mut self.stream, &msg.into_inner()).await?;

        loop {
            let record = read_record(&mut self.stream).await?;
            if let Some(body) = accepted_body(&record, xid)? {
                return Ok(body);
            }
            debug!("discarding rpc reply for a stale xid");
        }
    }
}

fn path_components(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect()
}

fn put_auth_sys(msg: &mut XdrWriter, auth: &AuthParams) -> Result<(), NfsError> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32;
    let mut body = XdrWriter::new();
    body.put_u32(stamp);
    body.put_string(&auth.machine_name)?;
    body.put_u32(auth.uid).put_u32(auth.gid).put_u32(0);

    msg.put_u32(AUTH_SYS);
    msg.put_opaque(&body.into_inner())?;
    Ok(())
}

/// Returns the procedure results of an accepted reply, or `None` when the
/// reply belongs to another xid.
fn accepted_body(record: &[u8], xid: u32) -> Result<Option<Vec<u8>>, NfsError> {
    let mut r = XdrReader::new(record);
    if r.get_u32()? != xid {
        return Ok(None);
    }
    let msg_type = r.get_u32()?;
    if msg_type != MSG_REPLY {
        return Err(NfsError::Decode(format!("expected reply, got message type {msg_type}")));
    }
    let reply_stat = r.get_u32()?;
    if reply_stat != REPLY_ACCEPTED {
        let reject_stat = r.get_u32()?;
        return Err(NfsError::Rpc(format!("call denied (reject_stat {reject_stat})")));
    }
    let _verifier_flavor = r.get_u32()?;
    r.get_opaque()?;
    match r.get_u32()? {
        ACCEPT_SUCCESS => {
            let offset = record.len() - r.remaining();
            Ok(Some(record[offset..].to_vec()))
        }
        1 => Err(NfsError::Rpc("program unavailable".to_string())),
        2 => Err(NfsError::Rpc("program version mismatch".to_string())),
        3 => Err(NfsError::Rpc("procedure unavailable".to_string())),
        4 => Err(NfsError::Rpc("server could not decode arguments".to_string())),
        other => Err(NfsError::Rpc(format!("accept_stat {other}"))),
    }
}

fn encode_readdir_compound(
    components: &[&str],
    cookie: u64,
    verifier: &[u8; 8],
) -> Result<Vec<u8>, NfsError> {
    let ops = u32::try_from(components.len() + 2)
        .map_err(|_| NfsError::Encode("path has too many components".to_string()))?;

    let mut w = XdrWriter::new();
    w.put_string("")?;
    w.put_u32(0).put_u32(ops);
    w.put_u32(OP_PUTROOTFH);
    for component in components {
        w.put_u32(OP_LOOKUP);
        w.put_string(component)?;
    }
    w.put_u32(OP_READDIR)
        .put_u64(cookie)
        .put_fixed(verifier)
        .put_u32(READDIR_DIRCOUNT)
        .put_u32(READDIR_MAXCOUNT)
        .put_u32(2)
        .put_u32(ATTR_WORD0)
        .put_u32(ATTR_WORD1);
    Ok(w.into_inner())
}

#[derive(Debug)]
struct ReaddirPage {
    verifier: [u8; 8],
    entries: Vec<(u64, FileEntry)>,
    eof: bool,
}

fn decode_readdir_compound(body: &[u8]) -> Result<ReaddirPage, NfsError> {
    let mut r = XdrReader::new(body);
    let compound_status = r.get_u32()?;
    r.get_opaque()?;
    let results = r.get_u32()?;

    for _ in 0..results {
        let op = r.get_u32()?;
        let status = r.get_u32()?;
        if status != 0 {
            return Err(NfsError::Status {
                op: op_name(op),
                status,
            });
        }
        match op {
            OP_PUTROOTFH | OP_LOOKUP => continue,
            OP_READDIR => return decode_readdir_ok(&mut r),
            other => {
                return Err(NfsError::Decode(format!("unexpected operation {other} in reply")))
            }
        }
    }

    if compound_status != 0 {
        return Err(NfsError::Status {
            op: "COMPOUND",
            status: compound_status,
        });
    }
    Err(NfsError::Decode("reply carries no READDIR result".to_string()))
}

fn decode_readdir_ok(r: &mut XdrReader<'_>) -> Result<ReaddirPage, NfsError> {
    let mut verifier = [0u8; 8];
    verifier.copy_from_slice(r.get_fixed(8)?);

    let mut entries = Vec::new();
    while r.get_bool()? {
        let cookie = r.get_u64()?;
        let name = r.get_string()?;
        let entry = decode_attrs(r, name)?;
        entries.push((cookie, entry));
    }
    let eof = r.get_bool()?;

    Ok(ReaddirPage {
        verifier,
        entries,
        eof,
    })
}

fn decode_attrs(r: &mut XdrReader<'_>, name: String) -> Result<FileEntry, NfsError> {
    let words = r.get_u32()? as usize;
    if words > 8 {
        return Err(NfsError::Decode(format!("attribute bitmap of {words} words")));
    }
    let mut bitmap = [0u32; 2];
    for i in 0..words {
        let word = r.get_u32()?;
        if i < bitmap.len() {
            bitmap[i] = word;
        } else if word != 0 {
            return Err(NfsError::Decode("unexpected attributes in entry".to_string()));
        }
    }
    if bitmap[0] & !ATTR_WORD0 != 0 || bitmap[1] & !ATTR_WORD1 != 0 {
        return Err(NfsError::Decode("unexpected attributes in entry".to_string()));
    }

    let values = r.get_opaque()?;
    let mut v = XdrReader::new(values);
    let mut entry = FileEntry {
        name,
        is_dir: false,
        size: 0,
        mtime: DateTime::<Utc>::default(),
    };
    if bitmap[0] & (1 << FATTR4_TYPE) != 0 {
        entry.is_dir = v.get_u32()? == NF4DIR;
    }
    if bitmap[0] & (1 << FATTR4_SIZE) != 0 {
        entry.size = v.get_u64()?;
    }
    if bitmap[1] & ATTR_WORD1 != 0 {
        let seconds = v.get_i64()?;
        let nanos = v.get_u32()?;
        entry.mtime = DateTime::from_timestamp(seconds, nanos).unwrap_or_default();
    }
    Ok(entry)
}

fn op_name(op: u32) -> &'static str {
    match op {
        OP_PUTROOTFH => "PUTROOTFH",
        OP_LOOKUP => "LOOKUP",
        OP_READDIR => "READDIR",
        _ => "UNKNOWN",
    }
}

pub(crate) async fn write_record<W>(w: &mut W, data: &[u8]) -> Result<(), NfsError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_RECORD {
        return Err(NfsError::Encode(format!("record of {} bytes", data.len())));
    }
    let mut frame = XdrWriter::new();
    frame.put_u32(LAST_FRAGMENT | data.len() as u32);
    frame.put_fixed(data);
    debug_assert_eq!(frame.len() % 4, 0);
    w.write_all(&frame.into_inner()).await?;
    w.flush().await?;
    Ok(())
}

pub(crate) async fn read_record<R>(r: &mut R) -> Result<Vec<u8>, NfsError>
where
    R: AsyncRead + Unpin,
{
    let mut record = Vec::new();
    loop {
        let header = r.read_u32().await?;
        let len = (header & !LAST_FRAGMENT) as usize;
        if record.len() + len > MAX_RECORD {
            return Err(NfsError::Decode(format!(
                "record exceeds {MAX_RECORD} bytes"
            )));
        }
        let start = record.len();
        record.resize(start + len, 0);
        r.read_exact(&mut record[start..]).await?;
        if header & LAST_FRAGMENT != 0 {
            return Ok(record);
        }
    }
}
