//! Common types used by the various simpleca components.
pub mod error;
pub mod file;

//------------ Response Aliases ----------------------------------------------

pub type CaResult<T> = std::result::Result<T, self::error::Error>;
pub type CaEmptyResult = std::result::Result<(), self::error::Error>;
