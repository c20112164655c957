use halcyon_abi::{Errno, SysResult};

halcyon_lib::define_service! {
    /// File descriptor operations. Paths and buffers are already validated.
    fs => FsServices (missing = Err(Errno::ENOSYS)) {
        open(path: &[u8], flags: u32, mode: u32) -> SysResult;
        read(fd: i32, buf: &mut [u8]) -> SysResult;
        write(fd: i32, bytes: &[u8]) -> SysResult;
        close(fd: i32) -> SysResult;
        dup(fd: i32) -> SysResult;
    }
}
