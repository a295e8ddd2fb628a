pub mod core;
pub mod cryptocompare;
pub mod persistence;
