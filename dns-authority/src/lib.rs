use dns_message::{Message, ResponseParams};
use dns_net::{Handler, HandlerError};
use dns_zone::Zone;

/// §4.4 AuthoritativeServer: answers a single loaded [`Zone`] by
/// longest-suffix match, plugged into [`dns_net::RequestServer`] as a
/// [`Handler`].
pub struct AuthoritativeServer {
    zone: Zone,
}

impl AuthoritativeServer {
    pub fn new(zone: Zone) -> Self {
        Self { zone }
    }
}

#[async_trait::async_trait]
impl Handler for AuthoritativeServer {
    #[tracing::instrument(skip(self, request))]
    async fn handle(&self, request: Vec<u8>) -> Result<Vec<u8>, HandlerError> {
        let parsed = Message::parse(&request);
        let mut response = match parsed {
            // parse failure: empty response, NXDOMAIN default, no FORMERR (§4.4 step 1, §9).
            Err(error) => {
                tracing::debug!(%error, "malformed request, replying nxdomain");
                let mut response = Message::new_response(None);
                response.set_empty_resp(true);
                response
            }
            Ok(request) => self.answer(&request),
        };
        // every reply that actually goes on the wire is marked as such.
        response.response = Some(true);
        Ok(response.build())
    }
}

impl AuthoritativeServer {
    fn answer(&self, request: &Message) -> Message {
        let mut response = Message::new_response(None);
        let Some(name) = request.requested_name() else {
            response.set_empty_resp(true);
            return response;
        };

        match self.zone.longest_suffix_match(name) {
            None => response.set_empty_resp(true),
            Some(record) => {
                let ns = if record.rr_type == "NS" {
                    Some(record.name.clone())
                } else {
                    None
                };
                response.set_resp(
                    &record.value,
                    ResponseParams {
                        answers: 1,
                        authoritative: true,
                        positive_rcode: true,
                        ttl: record.ttl,
                        ns,
                    },
                );
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_ZONE: &str = "fuberlin\tIN\tNS\t127.0.0.15\ntelematik\tIN\tNS\t127.0.0.12\n";

    fn request_for(name: &str) -> Vec<u8> {
        let mut req = Message::new_request(None);
        req.set_req(name, true, Some(false));
        req.build()
    }

    #[tokio::test]
    async fn s1_authoritative_ns_match_is_a_referral() {
        let server = AuthoritativeServer::new(Zone::load_str(ROOT_ZONE).unwrap());
        let reply = server.handle(request_for("fuberlin")).await.unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.address(), Some("127.0.0.15"));
        assert_eq!(response.ns_name(), Some("fuberlin"));
        assert_eq!(response.authoritative, Some(true));
        assert_eq!(response.rcode, Some(dns_message::ResponseCode::NoError));
    }

    #[tokio::test]
    async fn s2_no_match_is_empty_nxdomain() {
        let server = AuthoritativeServer::new(Zone::load_str(ROOT_ZONE).unwrap());
        let reply = server.handle(request_for("unknown.tld")).await.unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.count_answers, Some(0));
        assert_eq!(response.authoritative, Some(true));
        assert_eq!(response.rcode, Some(dns_message::ResponseCode::NxDomain));
    }

    #[tokio::test]
    async fn a_type_match_has_no_referral() {
        let zone = Zone::load_str("fuberlin IN A 127.0.0.15\n").unwrap();
        let server = AuthoritativeServer::new(zone);
        let reply = server.handle(request_for("fuberlin")).await.unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.address(), Some("127.0.0.15"));
        assert_eq!(response.ns_name(), None);
    }

    #[tokio::test]
    async fn malformed_request_replies_empty_nxdomain() {
        let server = AuthoritativeServer::new(Zone::load_str(ROOT_ZONE).unwrap());
        let reply = server.handle(b"not json".to_vec()).await.unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.count_answers, Some(0));
        assert_eq!(response.rcode, Some(dns_message::ResponseCode::NxDomain));
    }

    #[tokio::test]
    async fn match_ignores_requested_qry_type() {
        // §4.4: "the server does not consult dns.qry.type for matching"
        let server = AuthoritativeServer::new(Zone::load_str(ROOT_ZONE).unwrap());
        let mut req = Message::new_request(None);
        req.set_req("fuberlin", false, Some(false));
        let reply = server.handle(req.build()).await.unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.ns_name(), Some("fuberlin"));
    }
}
