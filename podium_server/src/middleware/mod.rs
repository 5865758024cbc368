mod acl;
mod signature;

pub use acl::AclMiddlewareFactory;
pub use signature::SignatureMiddlewareFactory;
