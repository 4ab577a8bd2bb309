//! Memory access gateway.
//!
//! `ReadMemory` is the only seam through which the rest of the crate touches
//! the foreign process. Typed reads (`read_u32`, `read_f32`, `read_cstring`)
//! never fail loudly: a fault yields zero/empty and callers validate the value
//! with [`AddressRange`] or a plausibility check instead of propagating errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::memory::ProcessHandle;

/// Half-open range of plausible user-space pointers in the foreign process.
///
/// Anything outside (null, low guard pages, kernel space) is treated as
/// "no object".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, address: u64) -> bool {
        address != 0 && address >= self.start && address < self.end
    }
}

impl Default for AddressRange {
    fn default() -> Self {
        Self::new(0x1000_0000, 0xF000_0000)
    }
}

/// Read access to a foreign address space
pub trait ReadMemory {
    /// Read exactly `size` bytes. A short read is a fault.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Base address of the module holding the static offsets
    fn base_address(&self) -> u64;

    /// Read a little-endian u32, or 0 on fault
    fn read_u32(&self, address: u64) -> u32 {
        self.read_bytes(address, 4)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .map(u32::from_le_bytes)
            .unwrap_or(0)
    }

    /// Read a little-endian f32, or 0.0 on fault
    fn read_f32(&self, address: u64) -> f32 {
        f32::from_bits(self.read_u32(address))
    }

    /// Read up to `max_len` bytes and cut at the first NUL.
    ///
    /// Returns an empty vector on fault.
    fn read_cstring(&self, address: u64, max_len: usize) -> Vec<u8> {
        match self.read_bytes(address, max_len) {
            Ok(mut bytes) => {
                if let Some(end) = memchr::memchr(0, &bytes) {
                    bytes.truncate(end);
                }
                bytes
            }
            Err(_) => Vec::new(),
        }
    }
}

/// Write access to a foreign address space
pub trait WriteMemory {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()>;

    fn write_u32(&self, address: u64, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }
}

/// Decode raw name bytes read from the foreign process.
///
/// Invalid sequences are replaced rather than rejected; the name filter
/// decides plausibility afterwards.
pub fn decode_name(bytes: &[u8]) -> String {
    let len = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    let (decoded, _) = encoding_rs::UTF_8.decode_without_bom_handling(&bytes[..len]);
    decoded.into_owned()
}

/// Gateway backed by a live process handle
#[derive(Clone)]
pub struct MemoryReader {
    process: Arc<ProcessHandle>,
}

impl MemoryReader {
    pub fn new(process: Arc<ProcessHandle>) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }
}

#[cfg(target_os = "windows")]
impl ReadMemory for MemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        use std::ffi::c_void;
        use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0usize;

        // SAFETY: the buffer is sized to `size` and outlives the call; the
        // remote address is only dereferenced by the kernel.
        unsafe {
            ReadProcessMemory(
                self.process.handle(),
                address as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                size,
                Some(&mut bytes_read),
            )
        }
        .map_err(|_| Error::MemoryReadFailed { address, size })?;

        if bytes_read != size {
            return Err(Error::MemoryReadFailed { address, size });
        }
        Ok(buffer)
    }

    fn base_address(&self) -> u64 {
        self.process.base_address
    }
}

#[cfg(not(target_os = "windows"))]
impl ReadMemory for MemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        Err(Error::MemoryReadFailed { address, size })
    }

    fn base_address(&self) -> u64 {
        self.process.base_address
    }
}

#[cfg(target_os = "windows")]
impl WriteMemory for MemoryReader {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        use std::ffi::c_void;
        use windows::Win32::System::Diagnostics::Debug::WriteProcessMemory;

        let mut written = 0usize;
        // SAFETY: `bytes` is valid for `bytes.len()` reads for the duration
        // of the call.
        unsafe {
            WriteProcessMemory(
                self.process.handle(),
                address as *const c_void,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
                Some(&mut written),
            )
        }
        .map_err(|_| Error::MemoryWriteFailed { address })?;

        if written != bytes.len() {
            return Err(Error::MemoryWriteFailed { address });
        }
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl WriteMemory for MemoryReader {
    fn write_bytes(&self, address: u64, _bytes: &[u8]) -> Result<()> {
        Err(Error::MemoryWriteFailed { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn test_address_range_rejects_null_and_kernel() {
        let range = AddressRange::default();
        assert!(!range.contains(0));
        assert!(!range.contains(0x0040_0000));
        assert!(range.contains(0x1000_0000));
        assert!(range.contains(0x2000_0000));
        assert!(!range.contains(0xF000_0000));
        assert!(!range.contains(0xFFFF_FFFF));
    }

    #[test]
    fn test_typed_reads_return_zero_on_fault() {
        let mock = MockMemoryBuilder::new().build();
        assert_eq!(mock.read_u32(0x2000_0000), 0);
        assert_eq!(mock.read_f32(0x2000_0000), 0.0);
        assert!(mock.read_cstring(0x2000_0000, 32).is_empty());
    }

    #[test]
    fn test_typed_reads_decode_little_endian() {
        let mock = MockMemoryBuilder::new()
            .u32(0x2000_0000, 0xDEAD_BEEF)
            .f32(0x2000_0004, 12.5)
            .build();
        assert_eq!(mock.read_u32(0x2000_0000), 0xDEAD_BEEF);
        assert_eq!(mock.read_f32(0x2000_0004), 12.5);
    }

    #[test]
    fn test_read_cstring_stops_at_nul() {
        let mock = MockMemoryBuilder::new()
            .cstring(0x2000_0000, "Goblin Scout")
            .build();
        let bytes = mock.read_cstring(0x2000_0000, 32);
        assert_eq!(bytes, b"Goblin Scout");
    }

    #[test]
    fn test_write_u32_then_read() {
        let mock = MockMemoryBuilder::new().build();
        mock.write_u32(0x3000_0010, 42).unwrap();
        assert_eq!(mock.read_u32(0x3000_0010), 42);
    }

    #[test]
    fn test_decode_name_replaces_invalid_bytes() {
        assert_eq!(decode_name(b"Kyrios\0junk"), "Kyrios");
        assert_eq!(decode_name(&[b'A', 0xFF, b'B']), "A\u{FFFD}B");
    }
}
