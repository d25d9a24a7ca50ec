pub mod duplex;
pub mod ed25519_identity;
