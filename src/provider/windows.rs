//! Live-process provider backed by the Win32 virtual memory API

use super::AddressSpaceProvider;
use crate::core::types::{Address, MemoryError, MemoryRange, MemoryResult, ProcessId};
use crate::memory::regions::{Protection, Region, RegionKind, RegionState};
use std::mem;
use std::ptr;
use winapi::shared::minwindef::{DWORD, FALSE, LPVOID};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{
    ReadProcessMemory, VirtualAllocEx, VirtualFreeEx, VirtualProtectEx, VirtualQueryEx,
    WriteProcessMemory,
};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::winnt::{
    HANDLE, MEMORY_BASIC_INFORMATION, MEM_COMMIT, MEM_IMAGE, MEM_MAPPED, MEM_RELEASE, MEM_RESERVE,
    PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// RAII wrapper around a Win32 process handle
pub struct ProcessHandle {
    handle: HANDLE,
    pid: ProcessId,
}

// The handle is only ever passed to reentrant Win32 calls.
unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

impl ProcessHandle {
    /// Opens a process with the access rights introspection needs
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let access =
            PROCESS_QUERY_INFORMATION | PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION;
        let handle = unsafe { OpenProcess(access, FALSE, pid) };
        if handle.is_null() {
            return Err(MemoryError::AddressSpace {
                operation: "open",
                address: Address::null(),
                code: unsafe { GetLastError() },
            });
        }
        Ok(ProcessHandle { handle, pid })
    }

    /// Raw handle value for Win32 calls
    pub fn raw(&self) -> HANDLE {
        self.handle
    }

    /// Process id the handle refers to
    pub fn pid(&self) -> ProcessId {
        self.pid
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                CloseHandle(self.handle);
            }
        }
    }
}

/// [`AddressSpaceProvider`] over a running Windows process
pub struct ProcessAddressSpace {
    handle: ProcessHandle,
}

impl ProcessAddressSpace {
    /// Opens the process identified by `pid`
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        Ok(ProcessAddressSpace {
            handle: ProcessHandle::open(pid)?,
        })
    }

    /// Wraps an already-opened handle
    pub fn from_handle(handle: ProcessHandle) -> Self {
        ProcessAddressSpace { handle }
    }

    fn region_from_mbi(mbi: &MEMORY_BASIC_INFORMATION) -> Region {
        let state = match mbi.State {
            MEM_COMMIT => RegionState::Committed,
            MEM_RESERVE => RegionState::Reserved,
            _ => RegionState::Free,
        };
        let kind = match mbi.Type {
            MEM_IMAGE => RegionKind::Image,
            MEM_MAPPED => RegionKind::Mapped,
            _ => RegionKind::Private,
        };
        Region {
            range: MemoryRange::new(
                Address::new(mbi.BaseAddress as u64),
                mbi.RegionSize as u64,
            ),
            state,
            kind,
            protection: Protection::from_bits_truncate(mbi.Protect),
        }
    }
}

impl AddressSpaceProvider for ProcessAddressSpace {
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        let mut bytes_read = 0;
        let ok = unsafe {
            ReadProcessMemory(
                self.handle.raw(),
                address.as_usize() as LPVOID,
                buffer.as_mut_ptr() as LPVOID,
                buffer.len(),
                &mut bytes_read,
            )
        };
        if ok == FALSE || bytes_read != buffer.len() {
            return Err(MemoryError::read_failed(address, unsafe { GetLastError() }));
        }
        Ok(())
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<usize> {
        let mut bytes_written = 0;
        let ok = unsafe {
            WriteProcessMemory(
                self.handle.raw(),
                address.as_usize() as LPVOID,
                data.as_ptr() as LPVOID,
                data.len(),
                &mut bytes_written,
            )
        };
        if ok == FALSE {
            return Err(MemoryError::write_failed(address, unsafe { GetLastError() }));
        }
        Ok(bytes_written)
    }

    fn query_region(&self, address: Address) -> MemoryResult<Region> {
        let mut mbi: MEMORY_BASIC_INFORMATION = unsafe { mem::zeroed() };
        let filled = unsafe {
            VirtualQueryEx(
                self.handle.raw(),
                address.as_usize() as LPVOID,
                &mut mbi,
                mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if filled == 0 {
            return Err(MemoryError::query_failed(address, unsafe { GetLastError() }));
        }
        Ok(Self::region_from_mbi(&mbi))
    }

    fn allocate(&self, size: u64, protection: Protection) -> MemoryResult<Address> {
        let base = unsafe {
            VirtualAllocEx(
                self.handle.raw(),
                ptr::null_mut(),
                size as usize,
                MEM_COMMIT | MEM_RESERVE,
                protection.bits() as DWORD,
            )
        };
        if base.is_null() {
            return Err(MemoryError::AddressSpace {
                operation: "allocate",
                address: Address::null(),
                code: unsafe { GetLastError() },
            });
        }
        Ok(Address::new(base as u64))
    }

    fn protect(
        &self,
        address: Address,
        size: u64,
        protection: Protection,
    ) -> MemoryResult<Protection> {
        let mut previous: DWORD = 0;
        let ok = unsafe {
            VirtualProtectEx(
                self.handle.raw(),
                address.as_usize() as LPVOID,
                size as usize,
                protection.bits() as DWORD,
                &mut previous,
            )
        };
        if ok == FALSE {
            return Err(MemoryError::AddressSpace {
                operation: "protect",
                address,
                code: unsafe { GetLastError() },
            });
        }
        Ok(Protection::from_bits_truncate(previous))
    }

    fn free(&self, address: Address) -> MemoryResult<()> {
        let ok = unsafe {
            VirtualFreeEx(
                self.handle.raw(),
                address.as_usize() as LPVOID,
                0,
                MEM_RELEASE,
            )
        };
        if ok == FALSE {
            return Err(MemoryError::AddressSpace {
                operation: "free",
                address,
                code: unsafe { GetLastError() },
            });
        }
        Ok(())
    }
}
