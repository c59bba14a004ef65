//! Text scanning of source files.

pub mod scanner;
