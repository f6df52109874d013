use std::env;

use anyhow::{Context, Result};
use grev::git_revision_auto;

fn main() -> Result<()> {
    let dir = env::var("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR is set by cargo")?;
    if let Some(git_rev) = git_revision_auto(dir)? {
        println!("cargo:rustc-env=VERSION={} ({})", env!("CARGO_PKG_VERSION"), git_rev);
    } else {
        println!("cargo:rustc-env=VERSION={}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
