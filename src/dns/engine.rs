use crate::config::{fqdn_lower, Config};
use crate::config_store::SharedStore;
use crate::dns::forwarder::DynForwarder;
use crate::dns::{synthesizer, zone_matcher};
use crate::error::Error;
use crate::notify::{Notifier, Outcome, QueryEvent};
use std::net::SocketAddr;
use tracing::{debug, warn};
use trust_dns_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_proto::rr::Record;

/// Resolves every question of an inbound message against one configuration snapshot.
///
/// Questions under a configured zone are answered from that zone, everything else is
/// forwarded. A failing question contributes no answers and never affects its siblings; the
/// reply is always a NOERROR response carrying whatever answers were produced.
pub struct QueryEngine {
    store: SharedStore,
    forwarder: DynForwarder,
    notifier: Notifier,
}

impl QueryEngine {
    #[must_use]
    pub fn new(store: SharedStore, forwarder: DynForwarder, notifier: Notifier) -> Self {
        QueryEngine {
            store,
            forwarder,
            notifier,
        }
    }

    /// Build the reply to `request`, received from `source`. Emits one [`QueryEvent`] per
    /// question once the reply is assembled.
    ///
    /// Returns `None` for a message that is itself a response; answering it could start a reply
    /// loop with the peer.
    pub async fn handle(&self, request: &Message, source: SocketAddr) -> Option<Message> {
        if request.message_type() == MessageType::Response {
            debug!("dropping unsolicited response from {source}");
            return None;
        }
        let mut reply = Self::reply_to(request);
        if request.op_code() != OpCode::Query {
            reply.set_response_code(ResponseCode::NotImp);
            return Some(reply);
        }

        let config = self.store.get();
        let mut events = Vec::with_capacity(request.queries().len());
        for query in request.queries() {
            debug!(
                source_ip = %source.ip(),
                query_name = %query.name(),
                query_type = %query.query_type(),
                "received DNS request"
            );
            let outcome = match self.resolve(&config, request, query).await {
                Ok(answers) if answers.is_empty() => Outcome::NoAnswer,
                Ok(answers) => {
                    let count = answers.len();
                    reply.add_answers(answers);
                    Outcome::Answered(count)
                }
                Err(err) => {
                    warn!("no answer for {} {}: {err}", query.name(), query.query_type());
                    Outcome::Failed(err.to_string())
                }
            };
            events.push(QueryEvent {
                source: source.ip(),
                name: query.name().to_string(),
                query_type: query.query_type(),
                outcome,
            });
        }

        for event in events {
            self.notifier.notify(event);
        }
        Some(reply)
    }

    async fn resolve(
        &self,
        config: &Config,
        request: &Message,
        query: &Query,
    ) -> Result<Vec<Record>, Error> {
        let name = fqdn_lower(&query.name().to_string());
        if let Some(zone) = zone_matcher::match_zone(config, &name) {
            let answer = synthesizer::synthesize(zone, query.name(), query.query_type())?;
            return Ok(answer.into_iter().collect());
        }

        let upstream = config
            .upstream_addr()
            .ok_or_else(|| Error::InvalidUpstreamAddr(config.external_addr.clone()))?;
        self.forwarder.forward(request, query, upstream).await
    }

    fn reply_to(request: &Message) -> Message {
        let mut reply = Message::new();
        reply
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true)
            .add_queries(request.queries().to_vec());
        reply
    }
}
