use crate::dns::resolver::Resolver;
use crate::error::Error;
use std::slice;
use std::sync::Arc;
use tracing::{debug, error};
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

/// Adapts a [`Resolver`] to the trust-dns server. One handler serves one transport.
#[derive(Clone)]
pub struct Handler {
    resolver: Arc<Resolver>,
}

impl Handler {
    pub(super) fn new(resolver: Arc<Resolver>) -> Self {
        Handler { resolver }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }
        self.handle_query(request, response).await
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        debug!(
            "{:?} from {}: not implemented",
            request.op_code(),
            request.src()
        );
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    async fn handle_query<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let resolution = self
            .resolver
            .resolve(slice::from_ref(request.query()), request.edns())
            .await;

        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(resolution.authoritative);
        header.set_response_code(resolution.response_code);
        let mut builder = MessageResponseBuilder::from_message_request(request);
        if let Some(edns) = resolution.edns {
            builder.edns(edns);
        }
        let response = builder.build(
            header,
            resolution.answers.iter(),
            resolution.name_servers.iter(),
            &[],
            &[],
        );
        Ok(response_handle.send_response(response).await?)
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
