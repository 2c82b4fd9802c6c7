#![allow(dead_code)]

pub mod fakes;
pub mod stack;
pub mod test_postgres;
