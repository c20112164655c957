fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    println!("cargo:rerun-if-changed={manifest_dir}/linker.ld");
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        println!("cargo:rustc-link-arg-bin=kernel=-T{manifest_dir}/linker.ld");
        println!("cargo:rustc-link-arg-bin=kernel=-no-pie");
    }
}
