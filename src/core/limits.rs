/*!
 * System Limits and Constants
 *
 * Centralized location for capture limits, tuning thresholds, and wire constants.
 * Organized by concern so the pipeline and the trace codec agree on one set of values.
 */

use std::time::Duration;

// =============================================================================
// RECORD LIMITS
// =============================================================================

/// Maximum thread name length stored in a start record (50 bytes)
/// Longer names are truncated at the last char boundary that fits
pub const MAX_THREAD_NAME_LENGTH: usize = 50;

/// On-disk width of the thread name field (name plus NUL terminator)
pub const THREAD_NAME_FIELD_WIDTH: usize = MAX_THREAD_NAME_LENGTH + 1;

// =============================================================================
// BUFFER LIMITS
// =============================================================================

/// Default ring buffer capacity (16,384 slots)
/// One slot is always kept free, so 16,383 records can be pending
pub const DEFAULT_RING_CAPACITY: usize = 16 * 1024;

/// Smallest usable ring capacity
/// A capacity of 2 holds exactly one pending record
pub const MIN_RING_CAPACITY: usize = 2;

// =============================================================================
// SAMPLING
// =============================================================================

/// Default ceiling for the delay between sampling passes (1s)
pub const DEFAULT_MAX_SAMPLING_DELAY: Duration = Duration::from_millis(1000);

/// Floor for the delay between sampling passes (1ms)
/// [PERF] Keeps an active system from turning the sampler into a spin loop
pub const MIN_SAMPLING_DELAY: Duration = Duration::from_millis(1);

/// Number of idle steps needed to climb from the floor to the ceiling
pub const DELAY_STEP_DIVISOR: u32 = 16;

/// Target sampler overhead as percentage of wall time (2%)
pub const TARGET_OVERHEAD_PCT: u32 = 2;

/// Name given to the sampling thread (also filtered out of lifecycle events)
pub const SAMPLING_THREAD_NAME: &str = "threadwatch-sampler";

// =============================================================================
// WRITER
// =============================================================================

/// Sleep between polls when the buffer is empty (5ms)
pub const WRITER_IDLE_DELAY: Duration = Duration::from_millis(5);

/// Name given to the writer thread (also filtered out of lifecycle events)
pub const WRITER_THREAD_NAME: &str = "threadwatch-writer";

/// Buffered writer capacity for trace files (64KB)
pub const TRACE_WRITE_BUFFER: usize = 64 * 1024;

// =============================================================================
// TRACE FORMAT
// =============================================================================

/// Magic number at the start of every trace file
pub const TRACE_MAGIC: u32 = 0xDEAD_BEEF;

/// Fixed record prefix: kind, thread id, seconds, nanoseconds
pub const RECORD_HEADER_LEN: usize = 4 + 4 + 8 + 8;
