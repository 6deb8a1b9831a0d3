/// Input/output resolution: where bytes come from and go to, and how they
/// are decoded and encoded on the way.
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::FormatRequest;
use super::errors::CliError;

const UTF_8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UTF_16LE_BOM: &[u8] = b"\xFF\xFE";
const UTF_16BE_BOM: &[u8] = b"\xFE\xFF";

/// Where the SQL is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

/// Where the result is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

/// Resolved I/O for one invocation. Built once, consumed once.
#[derive(Debug, Clone)]
pub struct IoResolution {
    pub source: Source,
    pub source_encoding: &'static Encoding,
    pub destination: Destination,
    pub destination_encoding: &'static Encoding,
    pub prepend_bom: bool,
}

impl IoResolution {
    /// Resolve paths and encoding labels. A file path always wins over
    /// standard input.
    ///
    /// # Errors
    ///
    /// Returns `CliError::UnknownEncoding` for an unrecognised label.
    pub fn from_request(request: &FormatRequest) -> Result<Self, CliError> {
        Ok(Self {
            source: request
                .input_path
                .clone()
                .map_or(Source::Stdin, Source::File),
            source_encoding: resolve_encoding(&request.input_encoding, "input")?,
            destination: request
                .output_path
                .clone()
                .map_or(Destination::Stdout, Destination::File),
            destination_encoding: resolve_encoding(&request.output_encoding, "output")?,
            prepend_bom: request.force_output_bom,
        })
    }

    /// Read and decode the whole input. `stdin` is only touched when no
    /// input file was given.
    ///
    /// # Errors
    ///
    /// Returns `CliError::ReadFile` or `CliError::ReadStdin`.
    pub fn read_input<R: Read>(&self, mut stdin: R) -> Result<String, CliError> {
        let bytes = match &self.source {
            Source::File(path) => fs::read(path).map_err(|source| CliError::ReadFile {
                path: path.clone(),
                source,
            })?,
            Source::Stdin => {
                let mut buf = Vec::new();
                stdin.read_to_end(&mut buf).map_err(CliError::ReadStdin)?;
                buf
            }
        };
        debug!(bytes = bytes.len(), encoding = self.source_encoding.name(), "read input");
        Ok(decode(&bytes, self.source_encoding))
    }

    /// Encode `text` and write it to the destination in one go.
    ///
    /// # Errors
    ///
    /// Returns `CliError::WriteFile` or `CliError::WriteStdout`. A failed file
    /// write leaves no file behind.
    pub fn write_output<W: Write>(&self, text: &str, mut stdout: W) -> Result<(), CliError> {
        let bytes = encode(text, self.destination_encoding, self.prepend_bom);
        match &self.destination {
            Destination::Stdout => stdout
                .write_all(&bytes)
                .and_then(|()| stdout.flush())
                .map_err(CliError::WriteStdout),
            Destination::File(path) => {
                write_atomically(path, &bytes).map_err(|source| CliError::WriteFile {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

/// Look up a WHATWG encoding label (`utf-8`, `utf-16le`, `latin1`, ...).
///
/// # Errors
///
/// Returns `CliError::UnknownEncoding` when no encoding has that label.
pub fn resolve_encoding(
    label: &str,
    direction: &'static str,
) -> Result<&'static Encoding, CliError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| CliError::UnknownEncoding {
        direction,
        label: label.to_owned(),
    })
}

/// Decode `bytes`, dropping a leading byte-order mark.
#[must_use]
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        warn!(
            encoding = encoding.name(),
            "input has malformed byte sequences; replaced with U+FFFD"
        );
    }
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_owned(),
        None => text.into_owned(),
    }
}

/// Encode `text`, optionally preceded by the encoding's byte-order mark.
#[must_use]
pub fn encode(text: &str, encoding: &'static Encoding, bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 3);

    if bom {
        match bom_for(encoding) {
            Some(mark) => out.extend_from_slice(mark),
            None => warn!(
                encoding = encoding.name(),
                "encoding has no byte-order mark; --forceOutputBOM ignored"
            ),
        }
    }

    if encoding == UTF_16LE {
        out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
    } else if encoding == UTF_16BE {
        out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    } else {
        let (bytes, _, unmappable) = encoding.encode(text);
        if unmappable {
            warn!(
                encoding = encoding.name(),
                "output has characters the encoding cannot represent; written as numeric character references"
            );
        }
        out.extend_from_slice(&bytes);
    }

    out
}

fn bom_for(encoding: &'static Encoding) -> Option<&'static [u8]> {
    if encoding == UTF_8 {
        Some(UTF_8_BOM)
    } else if encoding == UTF_16LE {
        Some(UTF_16LE_BOM)
    } else if encoding == UTF_16BE {
        Some(UTF_16BE_BOM)
    } else {
        None
    }
}

/// Write through a temp file in the target directory, then rename over the
/// target.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
