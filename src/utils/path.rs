pub fn basename(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some(p) => p,
        None => path,
    }
}
