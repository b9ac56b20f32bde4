//! Test doubles for the `mirror-platform` collaborator traits, mirroring
//! the `tempfile`-backed fixture pattern the pack's contract-test crates
//! use to isolate pipeline tests from real I/O: no disk, no socket, no
//! codec library here, just enough behavior to drive `mirror-core`
//! deterministically.

pub mod codec;
pub mod source;
pub mod transport;

pub use codec::IdentityCodec;
pub use source::ScriptedFrameSource;
pub use transport::LoopbackTransport;
