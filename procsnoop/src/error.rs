//! Error taxonomy for every stage of the probe.
//!
//! Setup errors (`ResourceLimitError`, `LoadError`, `AttachError`) are fatal
//! and end up in [`ProbeError`]. `DecodeError` and `ReadError` are only ever
//! seen by the pump, which logs them and keeps going.

use crate::probe::{ProbeState, Tracepoint};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("cannot raise RLIMIT_MEMLOCK to soft={soft} hard={hard} bytes")]
pub struct ResourceLimitError {
    pub soft: u64,
    pub hard: u64,
    #[source]
    pub source: nix::errno::Errno,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("probe cannot be loaded from the {0} state")]
    InvalidState(ProbeState),

    #[error("cannot load eBPF object {}", path.display())]
    Object {
        path: PathBuf,
        #[source]
        source: aya::EbpfError,
    },

    #[error("program `{0}` not found in eBPF object")]
    MissingProgram(&'static str),

    #[error("program `{name}` rejected by the kernel")]
    Program {
        name: &'static str,
        #[source]
        source: aya::programs::ProgramError,
    },

    #[error("map `{0}` not found in eBPF object")]
    MissingMap(&'static str),

    #[error("map `{name}` is not a usable ring buffer")]
    Map {
        name: &'static str,
        #[source]
        source: aya::maps::MapError,
    },

    #[error("cannot register ring buffer with the event loop")]
    RingBuffer(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AttachError {
    #[error("probe cannot be attached from the {0} state")]
    InvalidState(ProbeState),

    #[error("no program loaded for tracepoint {0}")]
    MissingProgram(Tracepoint),

    #[error("cannot attach tracepoint {tracepoint}")]
    Link {
        tracepoint: Tracepoint,
        #[source]
        source: aya::programs::ProgramError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("ring buffer poll failed")]
    Io(#[from] std::io::Error),

    #[error("record source closed")]
    Closed,
}

/// Fatal setup failure, named after the stage that produced it.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("resource limit")]
    ResourceLimit(#[from] ResourceLimitError),

    #[error("load")]
    Load(#[from] LoadError),

    #[error("attach")]
    Attach(#[from] AttachError),

    #[error("signal registration")]
    Signal(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_error_names_tracepoint() {
        let err = AttachError::MissingProgram(Tracepoint::ProcessExit);
        assert_eq!(
            err.to_string(),
            "no program loaded for tracepoint sched/sched_process_exit"
        );
    }

    #[test]
    fn probe_error_chain_names_stage_then_cause() {
        let err = ProbeError::from(LoadError::MissingMap("rb"));
        let chained = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chained, "load: map `rb` not found in eBPF object");
    }

    #[test]
    fn decode_error_reports_lengths() {
        let err = DecodeError::Length {
            expected: 168,
            actual: 12,
        };
        assert_eq!(err.to_string(), "record is 12 bytes, expected 168");
    }
}
