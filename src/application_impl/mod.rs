mod key_material;
mod signing;
mod token_issuer;
mod token_service_impl;
mod token_validator;

pub use key_material::*;
pub use signing::*;
pub use token_issuer::*;
pub use token_service_impl::*;
pub use token_validator::*;
