use crate::error::Error;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time;
use trust_dns_proto::op::{Message, MessageType, Query};
use trust_dns_proto::rr::Record;

/// Large enough for any EDNS-sized UDP reply we'd accept.
const MAX_REPLY_LEN: usize = 4096;

/// `DynForwarder` is a type alias for a [`Forwarder`] shared by concurrently running queries.
pub type DynForwarder = Arc<dyn Forwarder + Send + Sync>;

/// Relays a single question that matched no configured zone to the external resolver.
#[async_trait::async_trait]
pub trait Forwarder {
    /// Ask `upstream` the `query` from `request` and return its answer section.
    async fn forward(
        &self,
        request: &Message,
        query: &Query,
        upstream: SocketAddr,
    ) -> Result<Vec<Record>, Error>;
}

/// Single-hop UDP forwarding, bounded by a timeout. No retries and no caching.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct UdpForwarder {
    timeout: Duration,
}

impl UdpForwarder {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        UdpForwarder { timeout }
    }

    fn upstream_request(request: &Message, query: &Query) -> Message {
        let mut message = Message::new();
        message
            .set_id(request.id())
            .set_message_type(MessageType::Query)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .add_query(query.clone());
        message
    }
}

#[async_trait::async_trait]
impl Forwarder for UdpForwarder {
    async fn forward(
        &self,
        request: &Message,
        query: &Query,
        upstream: SocketAddr,
    ) -> Result<Vec<Record>, Error> {
        let message = Self::upstream_request(request, query);
        let bytes = message.to_vec()?;
        let io_error = |source: std::io::Error| Error::Forward {
            upstream: upstream.to_string(),
            source,
        };

        let local: SocketAddr = match upstream {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await.map_err(io_error)?;
        socket.connect(upstream).await.map_err(io_error)?;
        socket.send(&bytes).await.map_err(io_error)?;

        let mut buf = vec![0u8; MAX_REPLY_LEN];
        let len = time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::ForwardTimeout(upstream.to_string()))?
            .map_err(io_error)?;

        let mut reply =
            Message::from_vec(&buf[..len]).map_err(|err| Error::MalformedUpstreamReply {
                upstream: upstream.to_string(),
                reason: err.to_string(),
            })?;
        if reply.id() != message.id() || reply.message_type() != MessageType::Response {
            return Err(Error::MalformedUpstreamReply {
                upstream: upstream.to_string(),
                reason: format!("reply does not match request id {}", message.id()),
            });
        }
        Ok(reply.take_answers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use trust_dns_proto::op::OpCode;
    use trust_dns_proto::rr::{Name, RData, RecordType};

    enum Upstream {
        Answer(Ipv4Addr),
        WrongId,
        Garbage,
        Silent,
    }

    async fn fake_upstream(behaviour: Upstream) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_REPLY_LEN];
            let (len, src) = socket.recv_from(&mut buf).await.unwrap();
            let request = Message::from_vec(&buf[..len]).unwrap();
            let mut reply = Message::new();
            reply
                .set_id(request.id())
                .set_message_type(MessageType::Response)
                .set_op_code(OpCode::Query)
                .add_queries(request.queries().to_vec());
            let bytes = match behaviour {
                Upstream::Answer(ip) => {
                    let owner = request.queries()[0].name().clone();
                    reply.add_answer(Record::from_rdata(owner, 60, RData::A(ip)));
                    reply.to_vec().unwrap()
                }
                Upstream::WrongId => {
                    reply.set_id(request.id().wrapping_add(1));
                    reply.to_vec().unwrap()
                }
                Upstream::Garbage => vec![0xde, 0xad],
                Upstream::Silent => {
                    time::sleep(Duration::from_secs(5)).await;
                    return;
                }
            };
            socket.send_to(&bytes, src).await.unwrap();
        });
        addr
    }

    fn request() -> (Message, Query) {
        let query = Query::query(Name::from_str("unknown.org.").unwrap(), RecordType::A);
        let mut request = Message::new();
        request
            .set_id(4242)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(query.clone());
        (request, query)
    }

    #[tokio::test]
    async fn relays_upstream_answers() {
        let upstream = fake_upstream(Upstream::Answer(Ipv4Addr::new(192, 0, 2, 1))).await;
        let (request, query) = request();
        let answers = UdpForwarder::new(Duration::from_secs(2))
            .forward(&request, &query, upstream)
            .await
            .unwrap();
        assert_eq!(
            answers,
            vec![Record::from_rdata(
                Name::from_str("unknown.org.").unwrap(),
                60,
                RData::A(Ipv4Addr::new(192, 0, 2, 1))
            )]
        );
    }

    #[tokio::test]
    async fn times_out() {
        let upstream = fake_upstream(Upstream::Silent).await;
        let (request, query) = request();
        let res = UdpForwarder::new(Duration::from_millis(100))
            .forward(&request, &query, upstream)
            .await;
        assert!(matches!(res, Err(Error::ForwardTimeout(_))));
    }

    #[tokio::test]
    async fn rejects_mismatched_reply() {
        let upstream = fake_upstream(Upstream::WrongId).await;
        let (request, query) = request();
        let res = UdpForwarder::new(Duration::from_secs(2))
            .forward(&request, &query, upstream)
            .await;
        assert!(matches!(res, Err(Error::MalformedUpstreamReply { .. })));
    }

    #[tokio::test]
    async fn rejects_garbage_reply() {
        let upstream = fake_upstream(Upstream::Garbage).await;
        let (request, query) = request();
        let res = UdpForwarder::new(Duration::from_secs(2))
            .forward(&request, &query, upstream)
            .await;
        assert!(matches!(res, Err(Error::MalformedUpstreamReply { .. })));
    }
}
