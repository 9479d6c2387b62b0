//! Support library for the `polyrate` command line tool

pub mod output;
pub mod pipeline;
pub mod wav;
