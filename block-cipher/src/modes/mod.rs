//! Modes of operation built on [`BlockCipher`](crate::BlockCipher)

pub mod cbc;

pub use cbc::CbcBlockCipher;
