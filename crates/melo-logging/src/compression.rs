// File: src/compression.rs
// Purpose: Stream rotated log files through gzip and read them back

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::Path;

/// Compression level used for rotated logs (0-9)
pub const ROTATED_LOG_LEVEL: u32 = 6;

/// Whether a path names a gzip-compressed log
pub fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Gzip `source` into `target` without loading it into memory. Blocking.
///
/// `source` is left in place; the caller removes it once `target` is durable.
pub fn gzip_file(source: &Path, target: &Path, level: u32) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(source)?);
    let writer = BufWriter::new(File::create(target)?);
    let mut encoder = GzEncoder::new(writer, Compression::new(level.min(9)));

    let copied = io::copy(&mut reader, &mut encoder)?;

    let file = encoder.finish()?.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(copied)
}

/// Raw contents of a log file, gunzipped when the name ends in `.gz`. Blocking.
pub fn read_log_file(path: &Path) -> io::Result<Vec<u8>> {
    let reader = BufReader::new(File::open(path)?);
    let mut contents = Vec::new();

    if is_gzip(path) {
        GzDecoder::new(reader).read_to_end(&mut contents)?;
    } else {
        let mut reader = reader;
        reader.read_to_end(&mut contents)?;
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_file_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.20261016-120000.log");
        let target = dir.path().join("app.20261016-120000.log.gz");

        let data = br#"{"level":"info","message":"repeated line"}
"#
        .repeat(50);
        std::fs::write(&source, &data).unwrap();

        let copied = gzip_file(&source, &target, ROTATED_LOG_LEVEL).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert!(source.exists());

        let on_disk = std::fs::metadata(&target).unwrap().len();
        assert!(
            on_disk < data.len() as u64,
            "gzip output {} not smaller than {}",
            on_disk,
            data.len()
        );

        assert_eq!(read_log_file(&target).unwrap(), data);
    }

    #[test]
    fn test_read_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "line\n").unwrap();

        assert_eq!(read_log_file(&path).unwrap(), b"line\n");
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log.gz");
        std::fs::write(&path, "not gzip").unwrap();

        assert!(read_log_file(&path).is_err());
    }

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(Path::new("logs/app.20261016-120000.log.gz")));
        assert!(!is_gzip(Path::new("logs/app.log")));
    }
}
