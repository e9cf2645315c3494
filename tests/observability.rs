/*!
 * Capture Pipeline Integration Tests
 */

#[path = "monitoring/buffer_test.rs"]
mod buffer_test;

#[path = "monitoring/sampling_test.rs"]
mod sampling_test;

#[path = "monitoring/watcher_test.rs"]
mod watcher_test;
