#![cfg_attr(not(test), no_std)]

//! Fixed-layout record written by the kernel producer into the `rb` ring
//! buffer and read back by the user-space agent.
//!
//! | offset | size | field         |
//! |--------|------|---------------|
//! | 0      | 4    | `pid`         |
//! | 4      | 4    | `ppid`        |
//! | 8      | 4    | `exit_code`   |
//! | 12     | 4    | padding       |
//! | 16     | 8    | `duration_ns` |
//! | 24     | 16   | `comm`        |
//! | 40     | 127  | `filename`    |
//! | 167    | 1    | `exit_event`  |
//!
//! All integers are little-endian. Total size is [`PROCESS_EVENT_SIZE`].

/// Kernel TASK_COMM_LEN.
pub const COMM_LEN: usize = 16;
pub const FILENAME_LEN: usize = 127;
pub const PROCESS_EVENT_SIZE: usize = 168;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessEvent {
    pub pid: u32,
    pub ppid: u32,
    /// Only meaningful for exit events.
    pub exit_code: u32,
    pub _pad: [u8; 4],
    /// Process lifetime, only meaningful for exit events.
    pub duration_ns: u64,
    pub comm: [u8; COMM_LEN],
    /// Executed path, only meaningful for exec events.
    pub filename: [u8; FILENAME_LEN],
    /// Zero for exec, any other value for exit.
    pub exit_event: u8,
}

const _: () = assert!(core::mem::size_of::<ProcessEvent>() == PROCESS_EVENT_SIZE);

impl ProcessEvent {
    pub const fn is_exit(&self) -> bool {
        self.exit_event != 0
    }

    /// Process name without NUL padding.
    pub fn comm_bytes(&self) -> &[u8] {
        until_nul(&self.comm)
    }

    /// Executed path without NUL padding.
    pub fn filename_bytes(&self) -> &[u8] {
        until_nul(&self.filename)
    }
}

// 内核写入的字符串不一定在缓冲区末尾以 NUL 结束，截到第一个 NUL 为止
fn until_nul(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for ProcessEvent {}
