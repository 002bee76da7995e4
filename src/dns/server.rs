use crate::dns::engine::QueryEngine;
use crate::error::Error;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use trust_dns_proto::error::ProtoError;
use trust_dns_proto::op::Message;

const MAX_DATAGRAM_LEN: usize = 4096;

// Largest reply a client that sent no EDNS record is guaranteed to accept over UDP.
const MIN_UDP_PAYLOAD: usize = 512;

/// The UDP listener. Every inbound datagram is handled on its own task, so a slow forward only
/// delays the request that caused it.
pub struct DnsServer {
    socket: Arc<UdpSocket>,
    engine: Arc<QueryEngine>,
}

/// Bind the DNS socket at `server_addr`. An address without a host (`:53`) binds all IPv4
/// interfaces.
///
/// # Errors
///
/// Returns [`Error::Listen`] if the socket can't be bound.
pub async fn new(server_addr: &str, engine: Arc<QueryEngine>) -> Result<DnsServer, Error> {
    let bind_addr = match server_addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => server_addr.to_string(),
    };
    let socket = match UdpSocket::bind(&bind_addr).await {
        Ok(socket) => socket,
        Err(source) => {
            return Err(Error::Listen {
                addr: bind_addr,
                source,
            })
        }
    };
    Ok(DnsServer {
        socket: Arc::new(socket),
        engine,
    })
}

impl DnsServer {
    /// The address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the socket's address can't be read.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve requests until the socket fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if receiving on the socket fails.
    pub async fn block_until_done(self) -> Result<(), Error> {
        loop {
            let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
            let (len, src) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                // ICMP errors from earlier sends surface here on some platforms.
                Err(err) if err.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(err) => return Err(err.into()),
            };
            buf.truncate(len);

            let socket = self.socket.clone();
            let engine = self.engine.clone();
            tokio::spawn(async move {
                handle_datagram(&engine, &socket, &buf, src).await;
            });
        }
    }
}

async fn handle_datagram(engine: &QueryEngine, socket: &UdpSocket, buf: &[u8], src: SocketAddr) {
    let request = match Message::from_vec(buf) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!("dropping unparsable datagram from {src}: {err}");
            return;
        }
    };

    let Some(reply) = engine.handle(&request, src).await else {
        return;
    };
    let bytes = match encode_reply(&request, reply) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("failed to encode reply to {src}: {err}");
            return;
        }
    };
    if let Err(err) = socket.send_to(&bytes, src).await {
        tracing::warn!("failed to send reply to {src}: {err}");
    }
}

/// The largest UDP reply `request`'s sender accepts.
fn payload_limit(request: &Message) -> usize {
    request.extensions().as_ref().map_or(MIN_UDP_PAYLOAD, |edns| {
        usize::from(edns.max_payload()).max(MIN_UDP_PAYLOAD)
    })
}

/// Encode `reply`, dropping its records and setting TC when it doesn't fit the sender's limit.
fn encode_reply(request: &Message, mut reply: Message) -> Result<Vec<u8>, ProtoError> {
    let bytes = reply.to_vec()?;
    if bytes.len() <= payload_limit(request) {
        return Ok(bytes);
    }
    reply.take_answers();
    reply.take_name_servers();
    reply.take_additionals();
    reply.set_truncated(true);
    reply.to_vec()
}
