//! Paged fake address space for tests.
//!
//! Memory is mapped in 4 KiB pages. A read touching any unmapped page faults,
//! writes map pages on demand. Interior mutability lets tests change memory
//! between ticks while a resolver or monitor holds a shared reference.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::memory::{ReadMemory, WriteMemory};

const PAGE_SIZE: u64 = 0x1000;

pub struct MockMemoryReader {
    pages: RwLock<HashMap<u64, Box<[u8]>>>,
    base: u64,
}

impl MockMemoryReader {
    pub fn new(base: u64) -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            base,
        }
    }

    /// Map a zero-filled range
    pub fn map(&self, start: u64, len: u64) {
        if len == 0 {
            return;
        }
        let mut pages = self.pages.write();
        let first = start / PAGE_SIZE;
        let last = (start + len - 1) / PAGE_SIZE;
        for page in first..=last {
            pages
                .entry(page)
                .or_insert_with(|| vec![0u8; PAGE_SIZE as usize].into_boxed_slice());
        }
    }

    /// Remove every page overlapping the range
    pub fn unmap(&self, start: u64, len: u64) {
        if len == 0 {
            return;
        }
        let mut pages = self.pages.write();
        let first = start / PAGE_SIZE;
        let last = (start + len - 1) / PAGE_SIZE;
        for page in first..=last {
            pages.remove(&page);
        }
    }

    pub fn set_bytes(&self, address: u64, bytes: &[u8]) {
        self.map(address, bytes.len() as u64);
        let mut pages = self.pages.write();
        for (i, byte) in bytes.iter().enumerate() {
            let addr = address + i as u64;
            if let Some(page) = pages.get_mut(&(addr / PAGE_SIZE)) {
                page[(addr % PAGE_SIZE) as usize] = *byte;
            }
        }
    }

    pub fn set_u32(&self, address: u64, value: u32) {
        self.set_bytes(address, &value.to_le_bytes());
    }

    pub fn set_f32(&self, address: u64, value: f32) {
        self.set_bytes(address, &value.to_le_bytes());
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let pages = self.pages.read();
        let mut out = Vec::with_capacity(size);
        let mut addr = address;
        let end = address
            .checked_add(size as u64)
            .ok_or(Error::MemoryReadFailed { address, size })?;

        while addr < end {
            let page = pages
                .get(&(addr / PAGE_SIZE))
                .ok_or(Error::MemoryReadFailed { address, size })?;
            let offset = (addr % PAGE_SIZE) as usize;
            let take = ((PAGE_SIZE as usize) - offset).min((end - addr) as usize);
            out.extend_from_slice(&page[offset..offset + take]);
            addr += take as u64;
        }
        Ok(out)
    }

    fn base_address(&self) -> u64 {
        self.base
    }
}

impl WriteMemory for MockMemoryReader {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.set_bytes(address, bytes);
        Ok(())
    }
}

/// Fluent construction of a [`MockMemoryReader`]
#[derive(Default)]
pub struct MockMemoryBuilder {
    base: u64,
    maps: Vec<(u64, u64)>,
    writes: Vec<(u64, Vec<u8>)>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn map(mut self, start: u64, len: u64) -> Self {
        self.maps.push((start, len));
        self
    }

    pub fn bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        self.writes.push((address, bytes.to_vec()));
        self
    }

    pub fn u32(self, address: u64, value: u32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn f32(self, address: u64, value: f32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn cstring(self, address: u64, value: &str) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.bytes(address, &bytes)
    }

    pub fn build(self) -> MockMemoryReader {
        let mock = MockMemoryReader::new(self.base);
        for (start, len) in self.maps {
            mock.map(start, len);
        }
        for (address, bytes) in self.writes {
            mock.set_bytes(address, &bytes);
        }
        mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_across_page_boundary() {
        let mock = MockMemoryBuilder::new()
            .bytes(0x1FFE, &[1, 2, 3, 4])
            .build();
        assert_eq!(mock.read_bytes(0x1FFE, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_unmapped_faults() {
        let mock = MockMemoryBuilder::new().map(0x1000, 0x1000).build();
        assert!(mock.read_bytes(0x1FFC, 4).is_ok());
        assert!(mock.read_bytes(0x1FFE, 4).is_err());
    }

    #[test]
    fn test_unmap_removes_pages() {
        let mock = MockMemoryBuilder::new().u32(0x5000, 7).build();
        mock.unmap(0x5000, 4);
        assert!(mock.read_bytes(0x5000, 4).is_err());
    }
}
