use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

/// Runtime that drives HTTP and subprocess I/O behind the blocking API.
pub static POOL: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});
