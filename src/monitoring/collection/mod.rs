/*!
 * Collection
 * Thread tracking, lifecycle producers and session orchestration
 */

mod context;
mod handlers;
mod registry;
mod watcher;

pub use context::WatchContext;
pub use handlers::LifecycleHandlers;
pub use registry::{ThreadNode, ThreadRegistry, ThreadTable};
pub use watcher::{ShutdownReport, ThreadWatcher};
