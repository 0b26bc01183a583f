//! Loopback NFSv4 server for tests

use super::client::{
    read_record, write_record, ATTR_WORD0, ATTR_WORD1, AUTH_NONE, AUTH_SYS, NF4DIR, OP_LOOKUP,
    OP_PUTROOTFH, OP_READDIR, PROC_COMPOUND,
};
use super::xdr::{XdrReader, XdrWriter};
use super::NfsError;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};

/// What the server answers to the next COMPOUND call
#[derive(Debug, Clone)]
pub(crate) enum FakeReply {
    /// Accepted reply carrying this COMPOUND result body
    Compound(Vec<u8>),
    /// `MSG_DENIED` / `AUTH_ERROR`
    Denied,
}

/// Decoded view of one call the server received
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub procedure: u32,
    pub uid: u32,
    pub gid: u32,
    pub machine_name: String,
    pub lookups: Vec<String>,
    pub readdir_cookie: Option<u64>,
}

#[derive(Debug, Default)]
struct State {
    replies: Mutex<VecDeque<FakeReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    silent: bool,
}

#[derive(Debug)]
pub(crate) struct FakeNfsServer {
    addr: SocketAddr,
    state: Arc<State>,
}

impl FakeNfsServer {
    /// Answer NULL calls, then COMPOUND calls with `replies` in order
    pub(crate) async fn spawn(replies: Vec<FakeReply>) -> Self {
        Self::start(State {
            replies: Mutex::new(replies.into()),
            ..State::default()
        })
        .await
    }

    /// Accept connections but never answer anything
    pub(crate) async fn silent() -> Self {
        Self::start(State {
            silent: true,
            ..State::default()
        })
        .await
    }

    async fn start(state: State) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(state);
        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, shared.clone()));
            }
        });
        Self { addr, state }
    }

    pub(crate) fn address(&self) -> String {
        self.addr.to_string()
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }
}

async fn serve_connection(mut stream: TcpStream, state: Arc<State>) {
    loop {
        let Ok(record) = read_record(&mut stream).await else {
            return;
        };
        if state.silent {
            continue;
        }
        let Ok((xid, call)) = decode_call(&record) else {
            return;
        };
        let reply = if call.procedure == PROC_COMPOUND {
            state
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(FakeReply::Denied)
        } else {
            FakeReply::Compound(Vec::new())
        };
        state.calls.lock().unwrap().push(call);
        if write_record(&mut stream, &encode_reply(xid, &reply)).await.is_err() {
            return;
        }
    }
}

fn decode_call(record: &[u8]) -> Result<(u32, RecordedCall), NfsError> {
    let mut r = XdrReader::new(record);
    let xid = r.get_u32()?;
    let _msg_type = r.get_u32()?;
    let _rpc_version = r.get_u32()?;
    let _program = r.get_u32()?;
    let _version = r.get_u32()?;
    let procedure = r.get_u32()?;

    assert_eq!(r.get_u32()?, AUTH_SYS);
    let cred = r.get_opaque()?;
    let mut c = XdrReader::new(cred);
    let _stamp = c.get_u32()?;
    let machine_name = c.get_string()?;
    let uid = c.get_u32()?;
    let gid = c.get_u32()?;

    let _verf_flavor = r.get_u32()?;
    r.get_opaque()?;

    let mut call = RecordedCall {
        procedure,
        uid,
        gid,
        machine_name,
        lookups: Vec::new(),
        readdir_cookie: None,
    };

    if procedure == PROC_COMPOUND {
        r.get_opaque()?;
        let _minor = r.get_u32()?;
        let ops = r.get_u32()?;
        for _ in 0..ops {
            match r.get_u32()? {
                OP_PUTROOTFH => {}
                OP_LOOKUP => call.lookups.push(r.get_string()?),
                OP_READDIR => {
                    call.readdir_cookie = Some(r.get_u64()?);
                    r.get_fixed(8)?;
                    let _dircount = r.get_u32()?;
                    let _maxcount = r.get_u32()?;
                    let words = r.get_u32()?;
                    for _ in 0..words {
                        r.get_u32()?;
                    }
                }
                other => return Err(NfsError::Decode(format!("unexpected op {other}"))),
            }
        }
    }

    Ok((xid, call))
}

fn encode_reply(xid: u32, reply: &FakeReply) -> Vec<u8> {
    let mut w = XdrWriter::new();
    w.put_u32(xid).put_u32(1);
    match reply {
        FakeReply::Compound(body) => {
            w.put_u32(0).put_u32(AUTH_NONE).put_u32(0).put_u32(0);
            w.put_fixed(body);
        }
        FakeReply::Denied => {
            // MSG_DENIED, AUTH_ERROR, AUTH_BADCRED
            w.put_u32(1).put_u32(1).put_u32(1);
        }
    }
    w.into_inner()
}

/// Directory entry served by [`readdir_ok`]
#[derive(Debug, Clone)]
pub(crate) struct DirEntrySpec {
    cookie: u64,
    name: &'static str,
    is_dir: bool,
    size: u64,
    mtime: i64,
}

impl DirEntrySpec {
    pub(crate) fn dir(cookie: u64, name: &'static str, mtime: i64) -> Self {
        Self {
            cookie,
            name,
            is_dir: true,
            size: 4096,
            mtime,
        }
    }

    pub(crate) fn file(cookie: u64, name: &'static str, size: u64, mtime: i64) -> Self {
        Self {
            cookie,
            name,
            is_dir: false,
            size,
            mtime,
        }
    }
}

/// Successful COMPOUND result: PUTROOTFH, `lookups` x LOOKUP, READDIR
pub(crate) fn readdir_ok(lookups: usize, entries: &[DirEntrySpec], eof: bool) -> Vec<u8> {
    let mut w = XdrWriter::new();
    w.put_u32(0);
    w.put_string("").unwrap();
    w.put_u32(lookups as u32 + 2);
    w.put_u32(OP_PUTROOTFH).put_u32(0);
    for _ in 0..lookups {
        w.put_u32(OP_LOOKUP).put_u32(0);
    }
    w.put_u32(OP_READDIR).put_u32(0);
    w.put_fixed(&[9u8; 8]);
    for entry in entries {
        w.put_bool(true).put_u64(entry.cookie);
        w.put_string(entry.name).unwrap();

        let mut attrs = XdrWriter::new();
        attrs
            .put_u32(if entry.is_dir { NF4DIR } else { 1 })
            .put_u64(entry.size)
            .put_u64(entry.mtime as u64)
            .put_u32(0);
        w.put_u32(2).put_u32(ATTR_WORD0).put_u32(ATTR_WORD1);
        w.put_opaque(&attrs.into_inner()).unwrap();
    }
    w.put_bool(false).put_bool(eof);
    w.into_inner()
}

/// COMPOUND result where `failing_op` returns `status` after `lookups_ok`
/// successful lookups
pub(crate) fn op_failure(lookups_ok: usize, failing_op: u32, status: u32) -> Vec<u8> {
    let mut w = XdrWriter::new();
    w.put_u32(status);
    w.put_string("").unwrap();
    w.put_u32(lookups_ok as u32 + 2);
    w.put_u32(OP_PUTROOTFH).put_u32(0);
    for _ in 0..lookups_ok {
        w.put_u32(OP_LOOKUP).put_u32(0);
    }
    w.put_u32(failing_op).put_u32(status);
    w.into_inner()
}
