//! Platform-level infrastructure: graceful shutdown signal handling. Every
//! listener this service binds (the tokeninfo server and the metrics
//! server) is a single plain `TcpListener` per address — no multi-process
//! port coordination, so the teacher's port-leasing machinery is not
//! carried over.

pub mod shutdown;

pub use shutdown::shutdown_signal;
