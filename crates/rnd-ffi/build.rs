use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let output_file = PathBuf::from(&crate_dir).join("rnd.h");

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let config = cbindgen::Config::from_file(PathBuf::from(&crate_dir).join("cbindgen.toml"))
        .expect("failed to read cbindgen.toml");

    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&output_file);
        }
        Err(cbindgen::Error::ParseSyntaxError { .. }) => {
            // Test builds compile the rlib with cfg(test), which cbindgen
            // cannot always parse.
            eprintln!("cbindgen: skipping header generation (parse error, likely cfg(test))");
        }
        Err(e) => {
            panic!("cbindgen failed: {e:?}");
        }
    }
}
