//! Liveness heartbeats while a run is polled. Used by the supervisor every 60th
//! poll; the CLI or tests consume them via a sink.

use std::sync::Arc;

/// One heartbeat: which poll iteration the supervisor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub tick: u64,
}

/// Sink for heartbeats. Losing one is harmless.
pub type HeartbeatSink = Arc<dyn Fn(Heartbeat) + Send + Sync>;
