use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::bufread::MultiGzDecoder as BufMultiGzDecoder;
use flate2::read::MultiGzDecoder;

use crate::errors::{CoreError, Result};

const READ_BUFFER_SIZE: usize = 65536;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)
        .map_err(|e| CoreError::FileReadError(format!("{}: {}", path.display(), e)))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    let reader = BufReader::new(file);

    Ok(reader)
}

///
/// Wrap any byte source in a line reader, transparently decompressing it when it
/// starts with the gzip magic number. Works for pipes where there is no extension to go by.
///
pub fn sniff_gzip_reader<R: Read + 'static>(input: R) -> Result<Box<dyn BufRead>> {
    let mut buf_input = BufReader::with_capacity(READ_BUFFER_SIZE, input);

    // Peek at first 2 bytes to detect gzip magic number
    let is_gzipped = {
        let peek = buf_input.fill_buf()?;
        peek.len() >= 2 && peek[0] == 0x1f && peek[1] == 0x8b
    };

    if is_gzipped {
        let gz = BufMultiGzDecoder::new(buf_input);
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, gz)))
    } else {
        Ok(Box::new(buf_input))
    }
}

/// Open a path (or `-` for stdin) with gzip sniffing.
pub fn open_sniffed(file_path_str: &str) -> Result<Box<dyn BufRead>> {
    if file_path_str == "-" {
        sniff_gzip_reader(io::stdin())
    } else {
        let path = Path::new(file_path_str);
        let file = File::open(path)
            .map_err(|e| CoreError::FileReadError(format!("{}: {}", path.display(), e)))?;
        sniff_gzip_reader(file)
    }
}

/// True for lines a BED-like reader should skip: blank, `#` comments, `track`/`browser` headers.
pub fn is_header_or_blank(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("track")
        || trimmed.starts_with("browser")
}
