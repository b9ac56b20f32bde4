//! Delta-streaming desktop mirroring pipeline: tiling, fingerprint-driven
//! change detection, wire framing, sequence tracking, canvas reconstruction,
//! and the reconnecting connection driver. Transport-, codec-, and
//! capture-agnostic — concrete collaborators come from `mirror-platform`
//! implementations (`mirror-codec-jpeg`, `mirror-transport-ws`, a real
//! `FrameSource`, or the test doubles in `mirror-fixtures`).

pub mod canvas;
pub mod connection;
pub mod error;
pub mod fingerprint;
pub mod planner;
pub mod receiver;
pub mod sender;
pub mod sequence;
pub mod tile;
pub mod wire;

pub use canvas::Canvas;
pub use connection::{BackoffConfig, ConnectionEvent, ConnectionHandle, DEFAULT_OUTBOUND_HIGH_WATER};
pub use error::{CoreError, CoreResult};
pub use fingerprint::{Fingerprint, FingerprintCache};
pub use planner::{DeltaPlanner, Decision, DEFAULT_FALLBACK_THRESHOLD};
pub use receiver::{FrameReceiver, ReceiveOutcome};
pub use sender::FrameSender;
pub use sequence::{SeqOutcome, SequenceMonitor};
pub use tile::{TileGrid, TileRect};
pub use wire::{latency_ms, Frame, TileRecord};
