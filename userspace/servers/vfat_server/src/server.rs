//! Line-oriented request loop standing in for the VFS host layer.
//!
//! One request per line, answered before the next is read:
//!
//! ```text
//! getattr <path>                ok ino=.. mode=.. nlink=.. uid=.. gid=.. size=.. atime=.. mtime=.. ctime=..
//! readdir <path>                entry <ino> <mode> <size> <name> ... then ok <count>
//! read <offset> <length> <path> ok <n>, n raw bytes, newline
//! getxattr <name> <path>        ok <value>
//! ```
//!
//! Failures answer `err <NAME> <errno>`; paths run to the end of the line.

use std::io::{self, BufRead, Write};

use log::debug;
use vfat_api_types::{Errno, FsOp};

use crate::device::BlockDev;
use crate::dir::DirEntry;
use crate::error::VfatError;
use crate::metadata::Metadata;
use crate::mount::MountContext;

// ─── Requests ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    GetAttr  { path: &'a str },
    ReadDir  { path: &'a str },
    Read     { offset: u64, length: usize, path: &'a str },
    GetXattr { name: &'a str, path: &'a str },
}

impl<'a> Request<'a> {
    pub fn parse(line: &'a str) -> Result<Self, Errno> {
        let (verb, args) = line.split_once(' ').unwrap_or((line, ""));
        let nonempty = |s: &'a str| if s.is_empty() { Err(Errno::EINVAL) } else { Ok(s) };

        match verb.parse::<FsOp>()? {
            FsOp::GetAttr => Ok(Request::GetAttr { path: nonempty(args)? }),
            FsOp::ReadDir => Ok(Request::ReadDir { path: nonempty(args)? }),
            FsOp::Read => {
                let mut parts = args.splitn(3, ' ');
                let offset = parts.next().and_then(|s| s.parse().ok()).ok_or(Errno::EINVAL)?;
                let length = parts.next().and_then(|s| s.parse().ok()).ok_or(Errno::EINVAL)?;
                let path   = nonempty(parts.next().unwrap_or(""))?;
                Ok(Request::Read { offset, length, path })
            }
            FsOp::GetXattr => {
                let (name, path) = args.split_once(' ').ok_or(Errno::EINVAL)?;
                Ok(Request::GetXattr { name: nonempty(name)?, path: nonempty(path)? })
            }
        }
    }
}

// ─── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Response {
    Attr(Metadata),
    Entries(Vec<DirEntry>),
    Data(Vec<u8>),
    Value(String),
}

fn unix(t: time::OffsetDateTime) -> i64 {
    t.unix_timestamp()
}

impl Response {
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Response::Attr(m) => writeln!(
                out,
                "ok ino={} mode={:o} nlink={} uid={} gid={} size={} atime={} mtime={} ctime={}",
                m.ino, m.mode.bits(), m.nlink, m.uid, m.gid, m.size,
                unix(m.accessed), unix(m.modified), unix(m.created),
            ),
            Response::Entries(entries) => {
                for e in entries {
                    let m = &e.metadata;
                    writeln!(out, "entry {} {:o} {} {}", m.ino, m.mode.bits(), m.size, e.name)?;
                }
                writeln!(out, "ok {}", entries.len())
            }
            Response::Data(bytes) => {
                writeln!(out, "ok {}", bytes.len())?;
                out.write_all(bytes)?;
                writeln!(out)
            }
            Response::Value(v) => writeln!(out, "ok {v}"),
        }
    }
}

fn send_error(out: &mut impl Write, errno: Errno) -> io::Result<()> {
    writeln!(out, "err {} {}", errno.name(), i32::from(errno))
}

// ─── Dispatch ──────────────────────────────────────────────────────────────────

pub fn dispatch<D: BlockDev>(fs: &MountContext<D>, req: &Request<'_>) -> Result<Response, VfatError> {
    match *req {
        Request::GetAttr { path } => fs.get_attributes(path).map(Response::Attr),
        Request::ReadDir { path } => fs.list_directory(path).map(Response::Entries),
        Request::Read { offset, length, path } => {
            fs.read_file(path, offset, length).map(Response::Data)
        }
        Request::GetXattr { name, path } => {
            fs.get_extended_attribute(path, name).map(Response::Value)
        }
    }
}

/// Answer one request line.
pub fn handle_line<D: BlockDev>(fs: &MountContext<D>, line: &str, out: &mut impl Write) -> io::Result<()> {
    let req = match Request::parse(line) {
        Ok(req) => req,
        Err(errno) => {
            debug!("vfat: malformed request {:?}", line);
            return send_error(out, errno);
        }
    };
    match dispatch(fs, &req) {
        Ok(resp) => resp.write_to(out),
        Err(e) => {
            debug!("vfat: {:?} failed: {}", req, e);
            send_error(out, e.errno())
        }
    }
}

/// Serve requests from `input` until EOF.
pub fn run<D: BlockDev>(fs: &MountContext<D>, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        handle_line(fs, line, &mut output)?;
        output.flush()?;
    }
    Ok(())
}
