pub mod action;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod server;
pub mod session;
pub mod sheet;
pub mod translate;
