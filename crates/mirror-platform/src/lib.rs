//! External collaborator interfaces consumed by `mirror-core`.
//!
//! Everything in this crate is a trait: frame acquisition, tile/frame codecs,
//! and the wire transport. Concrete implementations live in their own crates
//! (`mirror-codec-jpeg`, `mirror-transport-ws`) or in `mirror-fixtures` for
//! tests and demos, the same split the teacher agent keeps between
//! `agent-platform` (traits) and `agent-linux`/`agent-windows` (impls).

pub mod codec;
pub mod source;
pub mod transport;

pub use codec::{FrameCodec, TileCodec};
pub use source::{FrameSource, SourceError};
pub use transport::{Connector, Transport, TransportError};
