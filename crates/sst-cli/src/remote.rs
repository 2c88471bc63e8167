//! HTTP transport for the remote snapshot resource.
//!
//! `GET <endpoint>` returns the snapshot body and `PUT <endpoint>` replaces
//! it. Both carry the `X-API-Key` header.

use sst_core::config::RemoteTarget;
use sst_core::sync::{Direction, SnapshotTransport, TransportError};
use std::io::Read;

const API_KEY_HEADER: &str = "X-API-Key";

pub struct HttpTransport {
    agent: ureq::Agent,
    target: RemoteTarget,
}

impl HttpTransport {
    pub fn new(target: RemoteTarget) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(target.timeout)
            .user_agent(concat!("sst/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent, target }
    }
}

impl SnapshotTransport for HttpTransport {
    fn pull(&mut self) -> Result<String, TransportError> {
        let response = self
            .agent
            .get(&self.target.endpoint)
            .set(API_KEY_HEADER, &self.target.api_key)
            .call()
            .map_err(|err| transport_error(Direction::Pull, err))?;

        // Unbounded read; `into_string` stops at 10 MB.
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|err| TransportError::Body {
                direction: Direction::Pull,
                message: err.to_string(),
            })?;
        Ok(body)
    }

    fn push(&mut self, body: &str) -> Result<(), TransportError> {
        self.agent
            .put(&self.target.endpoint)
            .set(API_KEY_HEADER, &self.target.api_key)
            .set("Content-Type", "application/json")
            .send_string(body)
            .map_err(|err| transport_error(Direction::Push, err))?;
        Ok(())
    }
}

fn transport_error(direction: Direction, err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(status, _) => TransportError::Status { direction, status },
        ureq::Error::Transport(transport) => TransportError::Network {
            direction,
            message: transport.to_string(),
        },
    }
}
