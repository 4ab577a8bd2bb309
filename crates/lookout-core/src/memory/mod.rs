pub mod layout;
mod process;
mod reader;

#[cfg(test)]
pub mod mock;

pub use process::*;
pub use reader::{AddressRange, MemoryReader, ReadMemory, WriteMemory, decode_name};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
