use thiserror::Error;

use mirror_platform::TransportError;

/// The closed error taxonomy for one mirroring connection.
///
/// Frame-processing variants (`FrameMalformed`, `Codec`, `Source`,
/// `GeometryMismatch`) are returned directly by `sender`/`receiver`/`canvas`.
/// The transport-lifecycle variants mirror [`TransportError`] for callers
/// that fold connection failures into this taxonomy; `connection::spawn_connection`
/// itself never returns a `CoreError` — it runs as a background task and
/// reports the same lifecycle events as [`crate::connection::ConnectionEvent`]
/// instead, since there is no caller left to hand a `Result` back to once a
/// reconnect loop is spawned.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("transport closed")]
    TransportClosed,

    #[error("frame malformed: {0}")]
    FrameMalformed(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("frame source error: {0}")]
    Source(String),

    #[error("geometry mismatch: expected {expected:?}, got {got:?}")]
    GeometryMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("connect refused: {0}")]
    ConnectRefused(String),
}

impl From<TransportError> for CoreError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed => CoreError::TransportClosed,
            TransportError::ConnectTimeout => CoreError::ConnectTimeout,
            TransportError::ConnectFailed(msg) | TransportError::Io(msg) => {
                CoreError::ConnectRefused(msg)
            }
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_maps_onto_connection_variants() {
        assert!(matches!(CoreError::from(TransportError::Closed), CoreError::TransportClosed));
        assert!(matches!(
            CoreError::from(TransportError::ConnectTimeout),
            CoreError::ConnectTimeout
        ));
        assert!(matches!(
            CoreError::from(TransportError::ConnectFailed("refused".into())),
            CoreError::ConnectRefused(_)
        ));
    }
}
