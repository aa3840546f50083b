//! Reply construction and the sink replies are written to.

use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record};

/// Destination for the single reply to a request.
#[async_trait]
pub trait ReplySink: Send {
    /// Address of the peer that sent the request.
    fn remote_addr(&self) -> SocketAddr;

    async fn write(&mut self, message: &Message) -> io::Result<()>;
}

/// Empty response header mirroring `request`, with its question echoed.
pub fn reply_to(request: &Message) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(ResponseCode::NoError);
    for query in request.queries() {
        reply.add_query(query.clone());
    }
    reply
}

/// SERVFAIL reply for a request that could not be resolved.
pub fn server_failure(request: &Message) -> Message {
    let mut reply = reply_to(request);
    reply.set_response_code(ResponseCode::ServFail);
    reply
}

/// FORMERR reply for a request without a question.
pub fn format_error(request: &Message) -> Message {
    let mut reply = reply_to(request);
    reply.set_response_code(ResponseCode::FormErr);
    reply
}

/// Reply with one address record per entry of `addrs`.
pub fn address_reply(request: &Message, name: &Name, addrs: &[IpAddr], ttl: u32) -> Message {
    let mut reply = reply_to(request);
    for addr in addrs {
        let rdata = match *addr {
            IpAddr::V4(v4) => RData::A(A(v4)),
            IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
        };
        reply.add_answer(Record::from_rdata(name.clone(), ttl, rdata));
    }
    reply
}

/// Private copy of a cached message carrying the live transaction id.
///
/// The cached message itself is shared between readers and never touched.
pub fn cached_reply(cached: &Message, id: u16) -> Message {
    let mut reply = cached.clone();
    reply.set_id(id);
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;
    use hickory_proto::rr::RecordType;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn request(id: u16) -> Message {
        let mut request = Message::new();
        request
            .set_id(id)
            .set_recursion_desired(true)
            .add_query(Query::query(Name::from_str("nas.lan.").unwrap(), RecordType::A));
        request
    }

    #[test]
    fn reply_to_mirrors_request() {
        let reply = reply_to(&request(42));

        assert_eq!(reply.id(), 42);
        assert_eq!(reply.message_type(), MessageType::Response);
        assert!(reply.recursion_desired());
        assert_eq!(reply.queries(), request(42).queries());
        assert!(reply.answers().is_empty());
    }

    #[test]
    fn server_failure_sets_rcode() {
        let reply = server_failure(&request(1));

        assert_eq!(reply.response_code(), ResponseCode::ServFail);
        assert_eq!(reply.id(), 1);
    }

    #[test]
    fn address_reply_builds_one_record_per_address() {
        let name = Name::from_str("nas.lan.").unwrap();
        let addrs: Vec<IpAddr> = vec!["10.0.0.5".parse().unwrap(), "10.0.0.6".parse().unwrap()];

        let reply = address_reply(&request(3), &name, &addrs, 600);

        assert_eq!(reply.answers().len(), 2);
        assert_eq!(
            reply.answers()[0],
            Record::from_rdata(name.clone(), 600, RData::A(A(Ipv4Addr::new(10, 0, 0, 5))))
        );
        assert_eq!(reply.answers()[1].ttl(), 600);
    }

    #[test]
    fn cached_reply_leaves_original_untouched() {
        let cached = request(10);

        let reply = cached_reply(&cached, 99);

        assert_eq!(reply.id(), 99);
        assert_eq!(cached.id(), 10);
        assert_eq!(reply.queries(), cached.queries());
    }
}
