use std::env;
use std::fs;
use std::path::Path;

use vergen::Config;
use vergen::vergen;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    *config.git_mut().skip_if_error_mut() = true;
    vergen(config)?;

    let out_dir = env::var("OUT_DIR")?;
    let pkg_version = env::var("CARGO_PKG_VERSION")?;
    let sha = env::var("VERGEN_GIT_SHA_SHORT").unwrap_or_else(|_| "unknown".to_string());
    let version = format!("{pkg_version} ({sha})");

    let dest = Path::new(&out_dir).join("version.rs");
    fs::write(&dest, format!("const VERSION: &str = \"{version}\";\n"))?;

    Ok(())
}
