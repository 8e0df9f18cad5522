use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Extensions that are always treated as binary without opening the file.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "svgz", "pdf", "zip", "tar", "gz",
    "bz2", "xz", "7z", "rar", "exe", "dll", "so", "dylib", "a", "o", "obj", "class", "jar", "war",
    "wasm", "bin", "dat", "db", "sqlite", "sqlite3", "woff", "woff2", "ttf", "otf", "eot", "mp3",
    "mp4", "wav", "avi", "mov", "mkv", "flac", "ogg", "pyc", "pyo", "lock",
];

const PROBE_SIZE: usize = 8192;

/// Heuristically determine whether a path refers to a binary (non-textual)
/// file without fully reading it.
///
/// Checks the extension first as a fast path, then falls back to probing
/// the first few KB of content for a NUL byte — the same heuristic `git`
/// and most code-search tools use, since NUL bytes essentially never
/// appear in legitimate UTF-8 or ASCII source text.
pub fn is_binary_file(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return true;
        }
    }

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buf = [0u8; PROBE_SIZE];
    let read = match file.read(&mut buf) {
        Ok(n) => n,
        Err(_) => return false,
    };

    buf[..read].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_binary_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.png");
        fs::write(&path, b"not actually a png but has the extension").unwrap();
        assert!(is_binary_file(&path));
    }

    #[test]
    fn detects_nul_byte_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mystery.dat2");
        fs::write(&path, [b'h', b'i', 0u8, b'x']).unwrap();
        assert!(is_binary_file(&path));
    }

    #[test]
    fn plain_text_is_not_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.rs");
        fs::write(&path, "fn main() {}\n").unwrap();
        assert!(!is_binary_file(&path));
    }
}
