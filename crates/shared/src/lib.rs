pub mod domain;
pub mod error;
pub mod numeric;
pub mod persisted;
