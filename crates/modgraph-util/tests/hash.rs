use modgraph_util::hash::{md5_bytes, md5_file, sha1_bytes, sha1_file, sha256_bytes, sha256_file};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[test]
fn test_sha1_bytes_hello() {
    assert_eq!(sha1_bytes(b"hello"), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
}

#[test]
fn test_md5_bytes_hello_world() {
    assert_eq!(md5_bytes(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
}

#[test]
fn test_sha256_bytes_empty() {
    assert_eq!(
        sha256_bytes(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn test_file_hashes_match_bytes() {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(b"hello").unwrap();
    tmp.flush().unwrap();
    assert_eq!(sha1_file(tmp.path()).unwrap(), sha1_bytes(b"hello"));
    assert_eq!(md5_file(tmp.path()).unwrap(), md5_bytes(b"hello"));
    assert_eq!(sha256_file(tmp.path()).unwrap(), sha256_bytes(b"hello"));
}

#[test]
fn test_file_hash_empty() {
    let tmp = NamedTempFile::new().unwrap();
    assert_eq!(sha1_file(tmp.path()).unwrap(), sha1_bytes(b""));
}

#[test]
fn test_file_hash_not_found() {
    assert!(sha1_file(Path::new("/nonexistent/path/file.jar")).is_err());
}
