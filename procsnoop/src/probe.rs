//! Kernel side lifecycle: memlock limit, loading the eBPF object, binding the
//! two sched tracepoints and tearing all of it down again.
//!
//! `Unloaded -> Loaded -> Attached -> Closed`. `close` may be called from any
//! state and any number of times.

use crate::error::{AttachError, LoadError, ResourceLimitError};
use aya::{
    maps::{MapData, RingBuf},
    programs::{trace_point::TracePointLink, TracePoint},
    Ebpf, EbpfLoader,
};
use aya_log::EbpfLogger;
use nix::sys::resource::{setrlimit, Resource};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const MEMLOCK_SOFT_LIMIT: u64 = 20 * 1024 * 1024;
const MEMLOCK_HARD_LIMIT: u64 = 40 * 1024 * 1024;

pub const DEFAULT_OBJECT_PATH: &str = "/usr/lib/procsnoop/procsnoop.bpf.o";
pub const DEFAULT_PIN_PATH: &str = "/sys/fs/bpf";
pub const RING_BUFFER_MAP: &str = "rb";
pub const MIN_DURATION_GLOBAL: &str = "min_duration_ns";

const NS_PER_MS: u64 = 1_000_000;

/// Raises RLIMIT_MEMLOCK so the kernel can pin the probe's maps.
pub fn raise_memlock_rlimit() -> Result<(), ResourceLimitError> {
    info!(
        "[Probe] Setting RLIMIT_MEMLOCK to {} / {} bytes",
        MEMLOCK_SOFT_LIMIT, MEMLOCK_HARD_LIMIT
    );
    setrlimit(Resource::RLIMIT_MEMLOCK, MEMLOCK_SOFT_LIMIT, MEMLOCK_HARD_LIMIT).map_err(
        |source| ResourceLimitError {
            soft: MEMLOCK_SOFT_LIMIT,
            hard: MEMLOCK_HARD_LIMIT,
            source,
        },
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Unloaded,
    Loaded,
    Attached,
    Closed,
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeState::Unloaded => "unloaded",
            ProbeState::Loaded => "loaded",
            ProbeState::Attached => "attached",
            ProbeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// The two hook points, in attach order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracepoint {
    ProcessExec,
    ProcessExit,
}

impl Tracepoint {
    pub const ALL: [Tracepoint; 2] = [Tracepoint::ProcessExec, Tracepoint::ProcessExit];

    pub fn category(self) -> &'static str {
        "sched"
    }

    pub fn event(self) -> &'static str {
        match self {
            Tracepoint::ProcessExec => "sched_process_exec",
            Tracepoint::ProcessExit => "sched_process_exit",
        }
    }

    /// Name of the program in the eBPF object bound to this tracepoint.
    pub fn program(self) -> &'static str {
        match self {
            Tracepoint::ProcessExec => "handle_exec",
            Tracepoint::ProcessExit => "handle_exit",
        }
    }
}

impl fmt::Display for Tracepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category(), self.event())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub object_path: PathBuf,
    /// Exit events of processes that lived shorter than this are dropped by
    /// the kernel producer. `0` disables the filter.
    pub min_duration_ms: u32,
    pub pin_path: PathBuf,
}

impl ProbeOptions {
    pub fn min_duration_ns(&self) -> u64 {
        u64::from(self.min_duration_ms) * NS_PER_MS
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            object_path: PathBuf::from(DEFAULT_OBJECT_PATH),
            min_duration_ms: 0,
            pin_path: PathBuf::from(DEFAULT_PIN_PATH),
        }
    }
}

pub struct Probe {
    state: ProbeState,
    // links 必须先于 ebpf 释放
    exec_link: Option<TracePointLink>,
    exit_link: Option<TracePointLink>,
    ring_buf: Option<RingBuf<MapData>>,
    ebpf: Option<Ebpf>,
}

impl Probe {
    pub fn new() -> Self {
        Self {
            state: ProbeState::Unloaded,
            exec_link: None,
            exit_link: None,
            ring_buf: None,
            ebpf: None,
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Loads the eBPF object, verifies both programs and takes the ring
    /// buffer map. On failure the probe stays `Unloaded`.
    pub fn load(&mut self, options: &ProbeOptions) -> Result<(), LoadError> {
        if self.state != ProbeState::Unloaded {
            return Err(LoadError::InvalidState(self.state));
        }
        info!(
            "[Probe] Loading eBPF object {}",
            options.object_path.display()
        );

        let min_duration_ns = options.min_duration_ns();
        let mut loader = EbpfLoader::new();
        loader.map_pin_path(&options.pin_path);
        if min_duration_ns > 0 {
            loader.set_global(MIN_DURATION_GLOBAL, &min_duration_ns, true);
            info!(
                "[Probe] Set {} to {} ms",
                MIN_DURATION_GLOBAL, options.min_duration_ms
            );
        }
        let mut ebpf = loader
            .load_file(&options.object_path)
            .map_err(|source| LoadError::Object {
                path: options.object_path.clone(),
                source,
            })?;

        if let Err(e) = EbpfLogger::init(&mut ebpf) {
            debug!("[Probe] eBPF logger unavailable: {}", e);
        }

        for tracepoint in Tracepoint::ALL {
            let name = tracepoint.program();
            let program: &mut TracePoint = ebpf
                .program_mut(name)
                .ok_or(LoadError::MissingProgram(name))?
                .try_into()
                .map_err(|source| LoadError::Program { name, source })?;
            program
                .load()
                .map_err(|source| LoadError::Program { name, source })?;
            debug!("[Probe] Program '{}' loaded.", name);
        }

        let map = ebpf
            .take_map(RING_BUFFER_MAP)
            .ok_or(LoadError::MissingMap(RING_BUFFER_MAP))?;
        let ring_buf = RingBuf::try_from(map).map_err(|source| LoadError::Map {
            name: RING_BUFFER_MAP,
            source,
        })?;

        self.ring_buf = Some(ring_buf);
        self.ebpf = Some(ebpf);
        self.state = ProbeState::Loaded;
        info!("[Probe] eBPF object loaded.");
        Ok(())
    }

    /// Binds `sched_process_exec` then `sched_process_exit`.
    ///
    /// A failure on the second tracepoint keeps the first link in the probe;
    /// the caller releases it with [`Probe::close`].
    pub fn attach(&mut self) -> Result<(), AttachError> {
        if self.state != ProbeState::Loaded {
            return Err(AttachError::InvalidState(self.state));
        }
        let ebpf = self
            .ebpf
            .as_mut()
            .ok_or(AttachError::InvalidState(self.state))?;
        info!("[Probe] Attaching programs to tracepoints");

        self.exec_link = Some(attach_tracepoint(ebpf, Tracepoint::ProcessExec)?);
        info!("[Probe] Linked tracepoint {}", Tracepoint::ProcessExec);

        self.exit_link = Some(attach_tracepoint(ebpf, Tracepoint::ProcessExit)?);
        info!("[Probe] Linked tracepoint {}", Tracepoint::ProcessExit);

        self.state = ProbeState::Attached;
        Ok(())
    }

    /// Hands the ring buffer to its single reader. Returns `None` before
    /// `load` or once taken.
    pub fn take_ring_buffer(&mut self) -> Option<RingBuf<MapData>> {
        self.ring_buf.take()
    }

    pub fn attached_links(&self) -> usize {
        usize::from(self.exec_link.is_some()) + usize::from(self.exit_link.is_some())
    }

    /// Detaches whatever links exist and unloads the object.
    pub fn close(&mut self) {
        if self.state == ProbeState::Closed {
            return;
        }
        info!(
            "[Probe] Closing ({} link(s) attached, state {})",
            self.attached_links(),
            self.state
        );

        if let Some(link) = self.exec_link.take() {
            drop(link);
            debug!("[Probe] Detached {}", Tracepoint::ProcessExec);
        }
        if let Some(link) = self.exit_link.take() {
            drop(link);
            debug!("[Probe] Detached {}", Tracepoint::ProcessExit);
        }
        if self.ring_buf.take().is_some() {
            debug!("[Probe] Ring buffer was never handed to a reader");
        }
        if let Some(ebpf) = self.ebpf.take() {
            drop(ebpf);
            debug!("[Probe] eBPF object unloaded");
        }
        self.state = ProbeState::Closed;
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if self.state != ProbeState::Closed {
            warn!("[Probe] Dropped without close, releasing resources.");
            self.close();
        }
    }
}

fn attach_tracepoint(ebpf: &mut Ebpf, tracepoint: Tracepoint) -> Result<TracePointLink, AttachError> {
    let program: &mut TracePoint = ebpf
        .program_mut(tracepoint.program())
        .ok_or(AttachError::MissingProgram(tracepoint))?
        .try_into()
        .map_err(|source| AttachError::Link { tracepoint, source })?;
    let link_id = program
        .attach(tracepoint.category(), tracepoint.event())
        .map_err(|source| AttachError::Link { tracepoint, source })?;
    program
        .take_link(link_id)
        .map_err(|source| AttachError::Link { tracepoint, source })
}
