mod clock;
mod revocation_store;

pub use clock::*;
pub use revocation_store::*;
