use halcyon_abi::{Errno, SysResult};

halcyon_lib::define_service! {
    /// Character output behind file descriptors 1 and 2.
    console => ConsoleServices (missing = Err(Errno::EIO)) {
        write(bytes: &[u8]) -> SysResult;
    }
}
