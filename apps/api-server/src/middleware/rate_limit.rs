//! Rate limiting middleware, keyed by client address.
//!
//! The key is the socket peer's IP. `Forwarded` / `X-Forwarded-For` are
//! only honoured when the server sits behind a proxy that sets them.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures::future::{LocalBoxFuture, Ready, ready};

use shutter_core::ports::RateLimiter;
use shutter_shared::ErrorResponse;

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    trust_forwarded: bool,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            limiter,
            trust_forwarded: false,
        }
    }

    /// Key on the proxy-reported client address instead of the peer.
    pub fn trust_forwarded(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }
}

/// The limiter key for a request.
fn client_key(req: &ServiceRequest, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trust_forwarded: self.trust_forwarded,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    trust_forwarded: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = Arc::clone(&self.limiter);
        let key = client_key(&req, self.trust_forwarded);

        Box::pin(async move {

            match limiter.check(&key).await {
                Ok(result) if !result.allowed => {
                    // Whole seconds, rounded up so clients never retry early.
                    let retry_after = result.reset_after.as_secs_f64().ceil().max(1.0) as u64;
                    tracing::warn!(client = %key, retry_after, "Rate limit exceeded");

                    let error = ErrorResponse::new(429, "Too Many Requests")
                        .with_detail(format!(
                            "Too many attempts. Try again in {retry_after} seconds."
                        ))
                        .with_reason("rate_limited");
                    let response = HttpResponse::TooManyRequests()
                        .insert_header((header::RETRY_AFTER, retry_after.to_string()))
                        .json(error);

                    return Ok(req.into_response(response).map_into_right_body());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Rate limiter error, failing open"),
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn spoofed() -> ServiceRequest {
        TestRequest::default()
            .peer_addr("10.0.0.1:40123".parse().unwrap())
            .insert_header(("x-forwarded-for", "203.0.113.9"))
            .to_srv_request()
    }

    #[test]
    fn test_key_ignores_forwarded_headers_by_default() {
        assert_eq!(client_key(&spoofed(), false), "10.0.0.1");
    }

    #[test]
    fn test_key_uses_forwarded_headers_behind_proxy() {
        assert_eq!(client_key(&spoofed(), true), "203.0.113.9");
    }

    #[test]
    fn test_key_drops_peer_port() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.1:50000".parse().unwrap())
            .to_srv_request();

        assert_eq!(client_key(&req, false), client_key(&spoofed(), false));
    }
}
