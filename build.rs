use std::fs::copy;
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-env-changed=RAGUI_API_BASE");
    println!("cargo:rerun-if-changed=assets/config.toml");

    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/config.toml");
    let out_dir = std::env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let dest_path = PathBuf::from(out_dir).join("config.toml");

    copy(config_path, dest_path)?;

    Ok(())
}
