pub mod archive;
pub mod common;
pub mod dispatch;
pub mod run;
pub mod unit;
pub mod upload;
pub mod verdict;

pub use dispatch::dispatch;
