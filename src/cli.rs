/*!
 * Command Implementations
 * Bodies of the `threadwatch` subcommands, kept out of the binary so they
 * can write into any sink and be driven from tests
 */

use crate::core::types::StateCode;
use crate::core::WatchConfig;
use crate::host::SimulatedHost;
use crate::monitoring::{ShutdownReport, ThreadWatcher};
use crate::storage::TraceReader;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// States a simulated worker cycles through
const WORKER_STATES: [StateCode; 4] = [
    StateCode::RUNNABLE,
    StateCode::SLEEPING,
    StateCode::PARKED,
    StateCode::BLOCKED_ON_MONITOR_ENTER,
];

/// Write every record of the trace at `path` to `out`, one per line
///
/// Text mode uses the record's `Display`; JSON mode writes one object per
/// line. Returns the number of records written.
pub fn dump_trace<W: Write>(path: &Path, json: bool, out: &mut W) -> Result<u64> {
    let reader = TraceReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut count = 0u64;

    for record in reader {
        let record = record.with_context(|| format!("corrupt trace after {} records", count))?;
        if json {
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", record)?;
        }
        count += 1;
    }

    out.flush()?;
    Ok(count)
}

/// Capture a trace of `workers` simulated threads into `config.output_file`
///
/// Each worker registers itself, cycles through scripted states for
/// `duration`, then ends. Returns the session's final counters.
pub fn simulate(config: WatchConfig, workers: u64, duration: Duration) -> Result<ShutdownReport> {
    let output = config.output_file.clone();
    let host = Arc::new(SimulatedHost::new());
    let watcher = ThreadWatcher::start_with_file(config, Arc::clone(&host))
        .with_context(|| format!("failed to start capture into {}", output.display()))?;

    info!(workers, duration_ms = duration.as_millis() as u64, "Starting simulated workers");

    let mut joins = Vec::with_capacity(workers as usize);
    for index in 0..workers {
        let handle = index + 1;
        let host = Arc::clone(&host);
        let handlers = watcher.handlers();
        let name = format!("worker-{}", handle);

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                host.set_state(handle, StateCode::ALIVE.union(StateCode::RUNNABLE));
                handlers.on_thread_created(handle, &name, false);

                let deadline = Instant::now() + duration;
                let mut step = index as usize;
                while Instant::now() < deadline {
                    let state = WORKER_STATES[step % WORKER_STATES.len()];
                    host.set_state(handle, StateCode::ALIVE.union(state));
                    thread::sleep(Duration::from_millis(10 + 7 * (handle % 5)));
                    step += 1;
                }

                handlers.on_thread_terminated(&handle);
            })
            .context("failed to spawn worker thread")?;
        joins.push(join);
    }

    for join in joins {
        if join.join().is_err() {
            error!("Worker thread panicked");
        }
    }

    Ok(watcher.shutdown())
}

/// Print a shutdown report, pretty JSON or aligned text
pub fn write_report<W: Write>(report: &ShutdownReport, output: &Path, json: bool, out: &mut W) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "trace:    {}", output.display())?;
        writeln!(out, "written:  {}", report.buffer.written)?;
        writeln!(out, "appended: {}", report.writer.appended)?;
        writeln!(out, "dropped:  {}", report.buffer.dropped)?;
        writeln!(out, "passes:   {}", report.sampling_passes)?;
    }
    Ok(())
}
