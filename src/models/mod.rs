pub mod account;
pub mod strategy;
pub mod trade;
pub mod withdrawal;

pub use account::*;
pub use strategy::*;
pub use trade::*;
pub use withdrawal::*;
