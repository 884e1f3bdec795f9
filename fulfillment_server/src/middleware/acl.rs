//! Access control list middleware.
//!
//! Place it on any route or service behind the identity middleware. The verified [`Actor`] in the request extensions
//! must hold one of the roles the route allows, otherwise the request is refused with 403 Forbidden. Ownership rules
//! (which vendor owns an item, which partner is assigned) are checked by the engine, not here.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use fulfillment_engine::db_types::{Actor, Role};
use futures::future::LocalBoxFuture;
use log::{debug, warn};

use crate::errors::{AuthError, ServerError};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) }))
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let actor = req.extensions().get::<Actor>().copied().ok_or_else(|| {
                warn!("💻️ No verified identity found in request extensions for {}", req.path());
                ServerError::AuthenticationError(AuthError::MissingHeader("X-Actor-Id"))
            })?;
            if allowed_roles.contains(&actor.role) {
                service.call(req).await
            } else {
                debug!("💻️ {actor} may not call {}", req.path());
                Err(ServerError::InsufficientPermissions(format!("{} may not access this resource", actor.role)).into())
            }
        })
    }
}
