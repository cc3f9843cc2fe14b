//! Integration tests: the completion client against a scripted in-process
//! transport, and the reqwest transport against a mock HTTP server.

mod caching;
mod scripted;
mod streaming;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
