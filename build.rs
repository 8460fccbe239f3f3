fn main() {
    if let Err(error) = built::write_built_file() {
        println!("cargo:warning=failed to collect build-time information: {error}");
    }
}
