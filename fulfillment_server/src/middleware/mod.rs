mod acl;
mod identity;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use identity::{
    Caller,
    IdentityMiddlewareFactory,
    IdentityMiddlewareService,
    ACTOR_ID_HEADER,
    ACTOR_ROLE_HEADER,
    ACTOR_SIGNATURE_HEADER,
};
