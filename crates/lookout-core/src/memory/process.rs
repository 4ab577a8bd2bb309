//! Process and module locator.
//!
//! Hands the rest of the crate a live handle plus the base address of the
//! module holding the static offsets. Failure here is the only fatal
//! condition: the tracker does not sample until attached.

use crate::error::{Error, Result};

#[cfg(target_os = "windows")]
use windows::Win32::Foundation::HANDLE;

/// A loaded module inside the foreign process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub base_address: u64,
    pub size: u32,
}

/// Live handle to the foreign process
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: u32,
    /// Base of the main module (the one static offsets are relative to)
    pub base_address: u64,
    pub module_name: String,
    #[cfg(target_os = "windows")]
    handle: HANDLE,
}

// SAFETY: a process HANDLE is a kernel object reference; ReadProcessMemory and
// WriteProcessMemory may be called on it from any thread.
#[cfg(target_os = "windows")]
unsafe impl Send for ProcessHandle {}
#[cfg(target_os = "windows")]
unsafe impl Sync for ProcessHandle {}

#[cfg(target_os = "windows")]
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

#[cfg(target_os = "windows")]
impl ProcessHandle {
    /// Locate `process_name`, open it and resolve `module_name`'s base
    pub fn find_and_open(process_name: &str, module_name: &str) -> Result<Self> {
        let pid = find_process_id(process_name)?;
        Self::open(pid, module_name)
    }

    pub fn open(pid: u32, module_name: &str) -> Result<Self> {
        use windows::Win32::Foundation::BOOL;
        use windows::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
            PROCESS_VM_WRITE,
        };

        let access =
            PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;
        // SAFETY: OpenProcess has no pointer arguments.
        let handle = unsafe { OpenProcess(access, BOOL::from(false), pid) }
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;

        let mut process = Self {
            pid,
            base_address: 0,
            module_name: module_name.to_string(),
            handle,
        };
        process.base_address = process.module(module_name)?.base_address;
        Ok(process)
    }

    pub(crate) fn handle(&self) -> HANDLE {
        self.handle
    }

    /// Find a loaded module by name (case-insensitive)
    pub fn module(&self, name: &str) -> Result<ModuleInfo> {
        self.modules()?
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::ModuleNotFound(name.to_string()))
    }

    /// Enumerate loaded modules via a Toolhelp snapshot
    pub fn modules(&self) -> Result<Vec<ModuleInfo>> {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Diagnostics::ToolHelp::{
            CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW,
            TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        };

        // SAFETY: the snapshot handle is closed below; the entry struct is
        // initialised with its size as the API requires.
        unsafe {
            let snapshot =
                CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, self.pid)
                    .map_err(|e| Error::ProcessOpenFailed(format!("module snapshot: {}", e)))?;

            let mut entry = MODULEENTRY32W {
                dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
                ..Default::default()
            };

            let mut modules = Vec::new();
            let mut ok = Module32FirstW(snapshot, &mut entry).is_ok();
            while ok {
                modules.push(ModuleInfo {
                    name: wide_to_string(&entry.szModule),
                    base_address: entry.modBaseAddr as usize as u64,
                    size: entry.modBaseSize,
                });
                ok = Module32NextW(snapshot, &mut entry).is_ok();
            }

            let _ = CloseHandle(snapshot);
            Ok(modules)
        }
    }
}

#[cfg(target_os = "windows")]
fn find_process_id(process_name: &str) -> Result<u32> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };

    // SAFETY: as in `modules`.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot: {}", e)))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        let mut ok = Process32FirstW(snapshot, &mut entry).is_ok();
        while ok {
            if wide_to_string(&entry.szExeFile).eq_ignore_ascii_case(process_name) {
                found = Some(entry.th32ProcessID);
                break;
            }
            ok = Process32NextW(snapshot, &mut entry).is_ok();
        }

        let _ = CloseHandle(snapshot);
        found.ok_or_else(|| Error::ProcessNotFound(process_name.to_string()))
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;
        // SAFETY: the handle was returned by OpenProcess and is closed once.
        let _ = unsafe { CloseHandle(self.handle) };
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessHandle {
    pub fn find_and_open(process_name: &str, _module_name: &str) -> Result<Self> {
        Err(Error::ProcessNotFound(format!(
            "{} (process attach is only supported on Windows)",
            process_name
        )))
    }

    pub fn open(pid: u32, _module_name: &str) -> Result<Self> {
        Err(Error::ProcessOpenFailed(format!(
            "pid {} (process attach is only supported on Windows)",
            pid
        )))
    }

    pub fn module(&self, name: &str) -> Result<ModuleInfo> {
        Err(Error::ModuleNotFound(name.to_string()))
    }

    pub fn modules(&self) -> Result<Vec<ModuleInfo>> {
        Ok(Vec::new())
    }
}
