use crate::{
    cancel::CancellationToken,
    config::AppConfig,
    error::{LoadError, ProbeError},
    event,
    probe::{self, Probe},
    pump::{EventPump, RingBufSource, StdoutSink},
    signal_handler::SignalHandler,
};
use std::time::Duration;
use tracing::{error, info, warn};

const PUMP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Builds the runtime and runs the probe to completion.
pub fn async_runtime(app_config: AppConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("procsnoop")
        .build()?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        run(&app_config, cancel).await
    })?;
    Ok(())
}

/// Setup, run until cancelled, teardown.
///
/// Signal handlers are installed first so an early Ctrl+C still leads to a
/// clean teardown. Any setup failure closes the probe and returns before the
/// pump is started.
pub async fn run(config: &AppConfig, cancel: CancellationToken) -> Result<(), ProbeError> {
    info!("Core Logic: Starting up the probe...");

    let signals = SignalHandler::register().map_err(ProbeError::Signal)?;
    let forwarder = signals.forward_to(cancel.clone());

    let mut probe = Probe::new();
    let source = match setup(&mut probe, config) {
        Ok(source) => source,
        Err(e) => {
            error!("Core Logic: Setup failed at {} stage.", e);
            probe.close();
            forwarder.abort();
            return Err(e);
        }
    };

    println!("{}", event::header_line());

    let pump = EventPump::new(source, StdoutSink, cancel.clone());
    let mut pump_handle = tokio::spawn(pump.run());
    info!("Core Logic: Event pump running, waiting for shutdown signal.");

    cancel.cancelled().await;
    info!("Core Logic: Cancellation received, shutting down...");

    match tokio::time::timeout(PUMP_SHUTDOWN_TIMEOUT, &mut pump_handle).await {
        Ok(Ok(stats)) => info!(
            "Core Logic: Pump stopped after rendering {} event(s) ({} decode error(s), {} read error(s)).",
            stats.rendered, stats.decode_errors, stats.read_errors
        ),
        Ok(Err(e)) => warn!("Core Logic: Pump task ended abnormally: {}", e),
        Err(_) => {
            warn!(
                "Core Logic: Pump did not stop within {:?}, aborting it.",
                PUMP_SHUTDOWN_TIMEOUT
            );
            pump_handle.abort();
        }
    }

    probe.close();
    let _ = forwarder.await;
    info!("Core Logic: Shutdown completed.");
    Ok(())
}

fn setup(probe: &mut Probe, config: &AppConfig) -> Result<RingBufSource, ProbeError> {
    probe::raise_memlock_rlimit()?;
    probe.load(&config.probe_options())?;
    probe.attach()?;

    let ring_buf = probe
        .take_ring_buffer()
        .ok_or(LoadError::MissingMap(probe::RING_BUFFER_MAP))?;
    let source = RingBufSource::new(ring_buf).map_err(LoadError::RingBuffer)?;
    Ok(source)
}
