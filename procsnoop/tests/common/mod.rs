#![allow(dead_code)]

use bytes::{BufMut, Bytes, BytesMut};

/// Builds a wire record field by field, independent of the struct layout.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub pid: u32,
    pub ppid: u32,
    pub exit_code: u32,
    pub duration_ns: u64,
    pub comm: Vec<u8>,
    pub filename: Vec<u8>,
    pub exit_event: u8,
}

impl RawRecord {
    pub fn exec(pid: u32, ppid: u32, comm: &str, filename: &str) -> Self {
        Self {
            pid,
            ppid,
            comm: comm.as_bytes().to_vec(),
            filename: filename.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    pub fn exit(pid: u32, ppid: u32, comm: &str, exit_code: u32, duration_ns: u64) -> Self {
        Self {
            pid,
            ppid,
            exit_code,
            duration_ns,
            comm: comm.as_bytes().to_vec(),
            exit_event: 1,
            ..Self::default()
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(168);
        buf.put_u32_le(self.pid);
        buf.put_u32_le(self.ppid);
        buf.put_u32_le(self.exit_code);
        buf.put_bytes(0, 4);
        buf.put_u64_le(self.duration_ns);
        put_fixed(&mut buf, &self.comm, 16);
        put_fixed(&mut buf, &self.filename, 127);
        buf.put_u8(self.exit_event);
        assert_eq!(buf.len(), 168);
        buf.freeze()
    }
}

fn put_fixed(buf: &mut BytesMut, value: &[u8], len: usize) {
    let n = value.len().min(len);
    buf.put_slice(&value[..n]);
    buf.put_bytes(0, len - n);
}
