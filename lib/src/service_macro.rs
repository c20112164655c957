//! Declarative macro for late-bound kernel service interfaces.
//!
//! A service is a struct of function pointers that an implementing crate
//! registers at boot. Consumers call generated wrappers; when nothing is
//! registered the wrapper evaluates the service's `missing` expression
//! instead of faulting.
//!
//! ```rust,ignore
//! use halcyon_lib::define_service;
//!
//! define_service! {
//!     fs => FsServices (missing = Err(Errno::ENOSYS)) {
//!         close(fd: i32) -> SysResult;
//!         dup(fd: i32) -> SysResult;
//!     }
//! }
//! ```
//!
//! The macro generates:
//! - `pub struct FsServices { ... }` - the provider table
//! - `pub fn register_fs_services(&'static FsServices) -> bool`
//! - `pub fn is_fs_registered() -> bool`
//! - one wrapper per method with the method's own signature

#[macro_export]
macro_rules! define_service {
    (
        $(#[$svc_meta:meta])*
        $svc_name:ident => $struct_name:ident (missing = $missing:expr) {
            $(
                $(#[$method_meta:meta])*
                $method_name:ident($($arg_name:ident : $arg_ty:ty),* $(,)?) -> $ret_ty:ty
            );* $(;)?
        }
    ) => {
        $(#[$svc_meta])*
        pub struct $struct_name {
            $(
                $(#[$method_meta])*
                pub $method_name: fn($($arg_ty),*) -> $ret_ty,
            )*
        }

        $crate::define_service!(@storage $svc_name, $struct_name);

        $(
            $crate::define_service!(@wrapper
                $svc_name, $missing,
                $method_name($($arg_name : $arg_ty),*) -> $ret_ty
            );
        )*
    };

    (@storage $svc_name:ident, $struct_name:ident) => {
        $crate::paste::paste! {
            static [<$svc_name:upper _SERVICES>]: $crate::ServiceCell<$struct_name> =
                $crate::ServiceCell::new(stringify!($svc_name));

            /// Install the provider table. Only the first registration sticks.
            pub fn [<register_ $svc_name _services>](services: &'static $struct_name) -> bool {
                let installed = [<$svc_name:upper _SERVICES>].register(services);
                if !installed {
                    $crate::klog_warn!(
                        "services: {} already registered, keeping the first table",
                        stringify!($svc_name)
                    );
                }
                installed
            }

            #[inline]
            pub fn [<is_ $svc_name _registered>]() -> bool {
                [<$svc_name:upper _SERVICES>].is_registered()
            }
        }
    };

    (@wrapper $svc_name:ident, $missing:expr,
        $method_name:ident($($arg_name:ident : $arg_ty:ty),*) -> $ret_ty:ty) => {
        $crate::paste::paste! {
            #[inline]
            pub fn $method_name($($arg_name: $arg_ty),*) -> $ret_ty {
                match [<$svc_name:upper _SERVICES>].get() {
                    Some(services) => (services.$method_name)($($arg_name),*),
                    None => $missing,
                }
            }
        }
    };
}
