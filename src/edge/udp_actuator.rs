use super::{ActuatorLink, Directive};
use crate::link::{Connector, LinkError};
use async_trait::async_trait;
use regex::Regex;
use std::{net::SocketAddr, sync::LazyLock};
use tokio::net::UdpSocket;

/// Connection strings of the form `udp:<host>:<port>` (also `udpin:`) or
/// `udpout:<host>:<port>`. IPv6 hosts go in brackets.
static CONN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(udp|udpin|udpout):(\[[0-9A-Fa-f:.]+\]|[^:\[\]]+):(\d{1,5})$")
        .expect("connection string pattern is valid")
});

/// Largest datagram accepted while waiting for the heartbeat.
const HEARTBEAT_BUF_LEN: usize = 512;
/// Sent by an outbound link to make the flight controller answer.
const HEARTBEAT_PROBE: &[u8] = b"HEARTBEAT\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum UdpMode {
    /// Bind locally and learn the peer from the first datagram it sends.
    Listen(String),
    /// Send to a fixed peer.
    Target(String),
}

/// Opens UDP links to the flight controller.
///
/// A link counts as connected once a heartbeat datagram has been received from
/// the peer; the connect attempt is bounded by the caller.
#[derive(Debug, Clone)]
pub struct UdpConnector {
    mode: UdpMode,
}

impl UdpConnector {
    /// Parses a connection string.
    ///
    /// # Errors
    /// [`LinkError::InvalidAddress`] if the string does not match the supported forms.
    pub fn parse(conn: &str) -> Result<Self, LinkError> {
        let invalid = || LinkError::InvalidAddress(conn.to_string());
        let captures = CONN_REGEX.captures(conn.trim()).ok_or_else(invalid)?;
        let port: u16 = captures[3].parse().map_err(|_| invalid())?;
        let addr = format!("{}:{port}", &captures[2]);
        let mode = match &captures[1] {
            "udpout" => UdpMode::Target(addr),
            _ => UdpMode::Listen(addr),
        };
        Ok(Self { mode })
    }
}

#[async_trait]
impl Connector for UdpConnector {
    type Link = UdpActuatorLink;

    fn name(&self) -> &str { "flight controller" }

    async fn connect(&mut self) -> Result<UdpActuatorLink, LinkError> {
        let mut buf = [0u8; HEARTBEAT_BUF_LEN];
        match &self.mode {
            UdpMode::Listen(addr) => {
                let socket = UdpSocket::bind(addr.as_str()).await?;
                let (_, peer) = socket.recv_from(&mut buf).await?;
                Ok(UdpActuatorLink { socket, peer })
            }
            UdpMode::Target(addr) => {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.connect(addr.as_str()).await?;
                let peer = socket.peer_addr()?;
                socket.send(HEARTBEAT_PROBE).await?;
                socket.recv(&mut buf).await?;
                Ok(UdpActuatorLink { socket, peer })
            }
        }
    }
}

pub struct UdpActuatorLink {
    socket: UdpSocket,
    peer: SocketAddr,
}

#[async_trait]
impl ActuatorLink for UdpActuatorLink {
    async fn send(&mut self, directive: &Directive) -> Result<(), LinkError> {
        let frame = format!("{}\n", directive.encode());
        self.socket.send_to(frame.as_bytes(), self.peer).await?;
        Ok(())
    }
}
