//! Key material and certificate construction, through openssl.
pub mod cert;
pub mod keys;
