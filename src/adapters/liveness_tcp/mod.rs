// TCP liveness adapter - Reachability by opening a connection

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::domain::model::HostKey;
use crate::ports::LivenessPort;

/// Treats a host as alive when a TCP connection opens within the timeout
#[derive(Debug, Clone)]
pub struct TcpLiveness {
    timeout: Duration,
}

impl TcpLiveness {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LivenessPort for TcpLiveness {
    async fn is_alive(&self, host: &HostKey) -> bool {
        let (name, port) = match host {
            HostKey::Local => return true,
            HostKey::Remote { host, port: Some(port) } => (host.as_str(), *port),
            HostKey::Remote { host, port: None } => {
                debug!(host = %host, "no known port, assuming reachable");
                return true;
            }
        };
        match tokio::time::timeout(self.timeout, TcpStream::connect((name, port))).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(host = %host, error = %e, "host refused connection");
                false
            }
            Err(_) => {
                warn!(host = %host, timeout = ?self.timeout, "host did not answer");
                false
            }
        }
    }
}
