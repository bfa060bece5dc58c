pub mod admin_api;
pub mod admin_client;
pub mod collector;
pub mod signer;
pub mod snapshot;

#[cfg(test)]
pub mod testing;
