// # Address Store Implementations
//
// This module provides implementations of the AddressStore trait.

pub mod file;
pub mod memory;

pub use file::{FileAddressStore, storage_key};
pub use memory::MemoryAddressStore;
