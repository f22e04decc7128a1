//! Pluggable transport construction.
//!
//! In production the pool always builds a [`LocalTransport`] or
//! [`RemoteTransport`] depending on a team's configuration. Tests substitute
//! a factory that returns a [`MockTransport`](iris_transport::MockTransport)
//! instead, the same way [`iris_session`](../iris_session/index.html)'s
//! `SessionInitRunner` lets tests skip shelling out to a real agent binary.

use std::sync::Arc;

use iris_core::{SessionId, TeamConfig};
use iris_transport::{LocalTransport, RemoteTransport, Transport};

/// Builds the transport for a newly spawned `(fromTeam, toTeam)` entry.
pub trait TransportFactory: Send + Sync {
    /// Construct (but do not spawn) a transport for `config`/`session_id`.
    fn create(&self, config: TeamConfig, session_id: SessionId) -> Arc<dyn Transport>;
}

/// The production factory: local or remote transport, chosen by
/// [`TeamConfig::is_remote`].
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, config: TeamConfig, session_id: SessionId) -> Arc<dyn Transport> {
        if config.is_remote() {
            Arc::new(RemoteTransport::new(config, session_id))
        } else {
            Arc::new(LocalTransport::new(config, session_id))
        }
    }
}
