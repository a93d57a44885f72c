//! Decoding of raw ring buffer records and rendering of decoded events.

use crate::error::DecodeError;
use bytes::Buf;
use chrono::{Local, NaiveTime};
use procsnoop_common::{COMM_LEN, FILENAME_LEN, PROCESS_EVENT_SIZE};
use std::borrow::Cow;

pub use procsnoop_common::ProcessEvent;

const NS_PER_MS: u64 = 1_000_000;

/// Decodes one little-endian wire record.
///
/// The length is checked before any field is read, so a short or long
/// record never yields a partially filled event.
pub fn decode(raw: &[u8]) -> Result<ProcessEvent, DecodeError> {
    if raw.len() != PROCESS_EVENT_SIZE {
        return Err(DecodeError::Length {
            expected: PROCESS_EVENT_SIZE,
            actual: raw.len(),
        });
    }

    let mut buf = raw;
    let pid = buf.get_u32_le();
    let ppid = buf.get_u32_le();
    let exit_code = buf.get_u32_le();
    let mut pad = [0u8; 4];
    buf.copy_to_slice(&mut pad);
    let duration_ns = buf.get_u64_le();
    let mut comm = [0u8; COMM_LEN];
    buf.copy_to_slice(&mut comm);
    let mut filename = [0u8; FILENAME_LEN];
    buf.copy_to_slice(&mut filename);
    let exit_event = buf.get_u8();

    Ok(ProcessEvent {
        pid,
        ppid,
        exit_code,
        _pad: pad,
        duration_ns,
        comm,
        filename,
        exit_event,
    })
}

pub fn comm(event: &ProcessEvent) -> Cow<'_, str> {
    String::from_utf8_lossy(event.comm_bytes())
}

pub fn filename(event: &ProcessEvent) -> Cow<'_, str> {
    String::from_utf8_lossy(event.filename_bytes())
}

/// Column header matching the layout of [`render`].
pub fn header_line() -> String {
    format!(
        "{:<8} {:<5} {:<16} {:<7} {:<7} {}",
        "TIME", "EVENT", "COMM", "PID", "PPID", "FILENAME/EXIT CODE"
    )
}

/// Renders `event` stamped with the current local time.
pub fn render(event: &ProcessEvent) -> String {
    render_at(event, Local::now().time())
}

pub fn render_at(event: &ProcessEvent, time: NaiveTime) -> String {
    let timestamp = time.format("%H:%M:%S").to_string();
    if event.is_exit() {
        let mut line = format!(
            "{:<8} {:<5} {:<16} {:<7} {:<7} [{}]",
            timestamp,
            "EXIT",
            comm(event),
            event.pid,
            event.ppid,
            event.exit_code
        );
        if event.duration_ns > 0 {
            line.push_str(&format!(" ({}ms)", event.duration_ns / NS_PER_MS));
        }
        line
    } else {
        format!(
            "{:<8} {:<5} {:<16} {:<7} {:<7} {}",
            timestamp,
            "EXEC",
            comm(event),
            event.pid,
            event.ppid,
            filename(event)
        )
    }
}
