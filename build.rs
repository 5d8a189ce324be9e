// build.rs
//
// Stamps the binary with its build date and cargo profile, read back in
// main.rs through include!.

use chrono::Local;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

fn main() -> io::Result<()> {
    let out_dir = env::var_os("OUT_DIR").ok_or_else(|| io::Error::other("OUT_DIR not set"))?;
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let stamp = Local::now().format("%Y-%m-%d %H:%M %z");

    let body = format!(
        "pub const BUILD_DATE: &str = \"{}\";\npub const BUILD_PROFILE: &str = \"{}\";\n",
        stamp, profile
    );
    fs::write(PathBuf::from(out_dir).join("build_info.rs"), body)?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
