pub mod merkle;
pub mod paths;
pub mod storage;
pub mod xml;
