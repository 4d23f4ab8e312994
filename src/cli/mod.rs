pub mod args;

pub use args::{Arguments, Reference};
use clap::Parser;

pub fn parse() -> Arguments {
    Arguments::parse()
}
