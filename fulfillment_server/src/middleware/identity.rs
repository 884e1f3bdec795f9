//! Identity middleware.
//!
//! Authentication happens upstream. The identity provider forwards who the caller is in three headers:
//!
//! * `X-Actor-Id`: the numeric id of the caller,
//! * `X-Actor-Role`: one of `customer`, `vendor`, `delivery_partner` or `admin`,
//! * `X-Actor-Signature`: the base64 HMAC-SHA256 of `"{id}:{role}"` under the shared identity secret.
//!
//! This middleware checks the signature and stores the resulting [`Actor`] in the request extensions, where the
//! [`AclMiddlewareFactory`](super::AclMiddlewareFactory) and the [`Caller`] extractor pick it up.
use std::{
    future::{ready, Ready},
    rc::Rc,
    str::FromStr,
};

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    FromRequest,
    HttpMessage,
    HttpRequest,
};
use fulfillment_common::Secret;
use fulfillment_engine::db_types::{Actor, Role};
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::verify_identity,
};

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";
pub const ACTOR_SIGNATURE_HEADER: &str = "X-Actor-Signature";

pub struct IdentityMiddlewareFactory {
    key: Secret<String>,
    // If false, the signature is not checked and the headers are trusted as-is
    enabled: bool,
}

impl IdentityMiddlewareFactory {
    pub fn new(key: Secret<String>, enabled: bool) -> Self {
        IdentityMiddlewareFactory { key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService { key: self.key.clone(), enabled: self.enabled, service: Rc::new(service) }))
    }
}

pub struct IdentityMiddlewareService<S> {
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let enabled = self.enabled;
        Box::pin(async move {
            let actor = actor_from_headers(&req, &secret, enabled).map_err(|e| {
                warn!("🔑️ Rejected request to {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            trace!("🔑️ Request to {} from {actor}", req.path());
            req.extensions_mut().insert(actor);
            service.call(req).await
        })
    }
}

fn header<'a>(req: &'a ServiceRequest, name: &'static str) -> Result<&'a str, AuthError> {
    let value = req.headers().get(name).ok_or(AuthError::MissingHeader(name))?;
    value.to_str().map_err(|e| AuthError::MalformedHeader(name, e.to_string()))
}

fn actor_from_headers(req: &ServiceRequest, secret: &str, enabled: bool) -> Result<Actor, AuthError> {
    let id = header(req, ACTOR_ID_HEADER)?
        .trim()
        .parse::<i64>()
        .map_err(|e| AuthError::MalformedHeader(ACTOR_ID_HEADER, e.to_string()))?;
    let role = Role::from_str(header(req, ACTOR_ROLE_HEADER)?.trim())
        .map_err(|e| AuthError::MalformedHeader(ACTOR_ROLE_HEADER, e.to_string()))?;
    let actor = Actor::new(id, role);
    if !enabled {
        trace!("🔑️ Identity checks are disabled. Trusting {actor}");
        return Ok(actor);
    }
    let signature = header(req, ACTOR_SIGNATURE_HEADER)?;
    if verify_identity(secret, &actor, signature) {
        Ok(actor)
    } else {
        Err(AuthError::InvalidSignature)
    }
}

/// The verified caller of a request. Only available on routes behind the [`IdentityMiddlewareFactory`].
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let actor = req.extensions().get::<Actor>().copied();
        ready(actor.map(Caller).ok_or_else(|| {
            warn!("🔑️ No verified identity found for {}. Is the identity middleware installed?", req.path());
            ServerError::AuthenticationError(AuthError::MissingHeader(ACTOR_ID_HEADER))
        }))
    }
}
