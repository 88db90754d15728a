//! The encrypted container: pbkdf2-derived key, AES-128-CBC, two magic-byte
//! guards (spec §4.5). `FileContainerStorage` is the one concrete
//! `std::fs`-backed implementation of the `ContainerStorage` seam (the file
//! I/O driver is an external collaborator per spec §1).

pub mod codec;
pub mod snapshot;
pub mod storage;

pub use codec::ContainerCodec;
pub use snapshot::WalletSnapshot;
pub use storage::{atomic_write, ContainerStorage, FileContainerStorage};
