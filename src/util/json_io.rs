use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Returns true if the path should be treated as gzip compressed
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().unwrap_or_default() == "gz"
}

/// Opens a file for reading, transparently decompressing `.gz` files
/// # Errors
/// * if the file cannot be opened
pub fn open_maybe_gzip(filename: &Path) -> anyhow::Result<Box<dyn Read>> {
    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let reader: Box<dyn Read> = if is_gzip_path(filename) {
        Box::new(flate2::read::MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Loads a JSON file (optionally gzipped) into some deserializable type, e.g. the run manifest
/// # Arguments
/// * `filename` - the file path to open and parse
/// # Errors
/// * if the file does not open properly
/// * if the deserialization throws errors
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> anyhow::Result<T> {
    let reader = open_maybe_gzip(filename)?;
    serde_json::from_reader(reader)
        .with_context(|| format!("Error while deserializing {filename:?}:"))
}

/// Saves any serializable value as pretty JSON, gzip compressed if the path ends in `.gz`
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - path to write to
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let file = File::create(out_filename)
        .with_context(|| format!("Error while creating {out_filename:?}:"))?;

    if is_gzip_path(out_filename) {
        let mut encoder = flate2::write::GzEncoder::new(BufWriter::new(file), flate2::Compression::default());
        serde_json::to_writer_pretty(&mut encoder, data)
            .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
        encoder.finish()
            .and_then(|mut inner| inner.flush())
            .with_context(|| format!("Error while finishing {out_filename:?}:"))?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)
            .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
        writer.flush()
            .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    }
    Ok(())
}
