fn main() {
    // Writes $OUT_DIR/built.rs, included by `crate::built_info`
    built::write_built_file().expect("Failed to generate build info");
}
