use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipRecord};

/// Upper bound on the output buffer reserved before inflating
const MAX_PREALLOC: u64 = 1 << 20;

/// What a full extraction wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
    pub skipped: usize,
}

/// Reads entry data and writes it out
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// All central directory records, in archive order
    pub async fn list_records(&self) -> Result<Vec<ZipRecord>> {
        self.parser.list_records().await
    }

    /// Decode an entry into memory, checking its size and CRC-32
    pub async fn read_entry(&self, record: &ZipRecord) -> Result<Vec<u8>> {
        if record.is_encrypted() {
            bail!("{} is encrypted", record.display_name());
        }

        let data_offset = self.parser.data_offset(record).await?;
        let archive_size = self.parser.reader().size();
        let data_end = data_offset.checked_add(record.compressed_size);
        if data_end.is_none_or(|end| end > archive_size) {
            bail!(
                "Data of {} ({} bytes at {}) runs past the end of the archive",
                record.display_name(),
                record.compressed_size,
                data_offset
            );
        }

        let mut compressed = vec![0u8; record.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut compressed)
            .await
            .with_context(|| format!("Failed to read data of {}", record.display_name()))?;

        let data = match record.compression_method {
            CompressionMethod::Stored => compressed,
            CompressionMethod::Deflate => {
                // One byte past the declared size exposes an overlong stream
                let limit = record.uncompressed_size.saturating_add(1);
                let capacity = record.uncompressed_size.min(MAX_PREALLOC) as usize;
                let mut out = Vec::with_capacity(capacity);
                DeflateDecoder::new(compressed.as_slice())
                    .take(limit)
                    .read_to_end(&mut out)
                    .with_context(|| format!("Failed to inflate {}", record.display_name()))?;
                if out.len() as u64 > record.uncompressed_size {
                    bail!(
                        "{} inflates past its declared {} bytes",
                        record.display_name(),
                        record.uncompressed_size
                    );
                }
                out
            }
            CompressionMethod::Unknown(method) => bail!(
                "Unsupported compression method {} for {} (only STORED and DEFLATE)",
                method,
                record.display_name()
            ),
        };

        if data.len() as u64 != record.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                record.display_name(),
                record.uncompressed_size,
                data.len()
            );
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != record.crc32 {
            bail!("CRC-32 mismatch for {}", record.display_name());
        }

        Ok(data)
    }

    /// Write one entry to `output_path`, replacing any existing file
    pub async fn extract_to_file(&self, record: &ZipRecord, output_path: &Path) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let data = self.read_entry(record).await?;

        let mut file = fs::File::create(output_path)
            .await
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(data.len() as u64)
    }

    /// Recreate every record under `dest`.
    ///
    /// `targets[i]` is the path of `records[i]` relative to `dest`, or
    /// `None` when the record's name is unusable and must be skipped. The
    /// first failure stops the run; anything already written stays.
    #[instrument(skip_all, fields(dest = %dest.display()))]
    pub async fn extract_all(
        &self,
        records: &[ZipRecord],
        targets: &[Option<PathBuf>],
        dest: &Path,
    ) -> Result<ExtractSummary> {
        if records.len() != targets.len() {
            bail!(
                "{} records but {} output paths",
                records.len(),
                targets.len()
            );
        }

        let mut summary = ExtractSummary::default();
        fs::create_dir_all(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        for (record, relative) in records.iter().zip(targets) {
            let Some(relative) = relative else {
                warn!(name = %record.display_name(), "skipping entry with unusable name");
                summary.skipped += 1;
                continue;
            };

            let output_path = dest.join(relative);
            if record.is_directory() {
                fs::create_dir_all(&output_path)
                    .await
                    .with_context(|| format!("Failed to create {}", output_path.display()))?;
                summary.directories += 1;
            } else {
                let written = self.extract_to_file(record, &output_path).await?;
                debug!(path = %output_path.display(), bytes = written, "extracted");
                summary.files += 1;
                summary.bytes += written;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::FLAG_ENCRYPTED;
    use std::io::{Cursor, Write};

    use ::zip::write::SimpleFileOptions;

    fn archive(name: &str, data: &[u8], method: ::zip::CompressionMethod) -> Vec<u8> {
        let mut zip = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(method);
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
        zip.finish().unwrap().into_inner()
    }

    async fn first_record(bytes: Vec<u8>) -> (ZipExtractor<MemoryReader>, ZipRecord) {
        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let record = extractor.list_records().await.unwrap().remove(0);
        (extractor, record)
    }

    #[tokio::test]
    async fn reads_stored_and_deflated_entries() {
        let text = b"the same line again and again\n".repeat(40);
        for method in [
            ::zip::CompressionMethod::Stored,
            ::zip::CompressionMethod::Deflated,
        ] {
            let (extractor, record) = first_record(archive("a.txt", &text, method)).await;
            assert_eq!(extractor.read_entry(&record).await.unwrap(), text);
        }
    }

    #[tokio::test]
    async fn compressed_size_past_end_of_archive_is_rejected() {
        let bytes = archive("a.txt", b"hello", ::zip::CompressionMethod::Stored);
        let (extractor, mut record) = first_record(bytes).await;

        for size in [u64::MAX / 2, u64::MAX, 1 << 20] {
            record.compressed_size = size;
            let err = extractor.read_entry(&record).await.unwrap_err();
            assert!(err.to_string().contains("runs past the end"), "{err}");
        }
    }

    #[tokio::test]
    async fn deflate_stream_longer_than_declared_stops_early() {
        let zeros = vec![0u8; 4 << 20];
        let bytes = archive("bomb.bin", &zeros, ::zip::CompressionMethod::Deflated);
        let (extractor, mut record) = first_record(bytes).await;
        record.uncompressed_size = 10;

        let err = extractor.read_entry(&record).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "bomb.bin inflates past its declared 10 bytes"
        );
    }

    #[tokio::test]
    async fn encrypted_entries_are_refused() {
        let bytes = archive("secret.txt", b"hidden", ::zip::CompressionMethod::Stored);
        let (extractor, mut record) = first_record(bytes).await;
        record.flags |= FLAG_ENCRYPTED;

        let err = extractor.read_entry(&record).await.unwrap_err();
        assert_eq!(err.to_string(), "secret.txt is encrypted");
    }

    #[tokio::test]
    async fn unknown_methods_are_refused() {
        let bytes = archive("a.bin", b"data", ::zip::CompressionMethod::Stored);
        let (extractor, mut record) = first_record(bytes).await;
        record.compression_method = CompressionMethod::Unknown(99);

        let err = extractor.read_entry(&record).await.unwrap_err();
        assert!(
            err.to_string().starts_with("Unsupported compression method 99"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn crc_mismatch_is_an_error() {
        let bytes = archive("a.txt", b"hello", ::zip::CompressionMethod::Stored);
        let (extractor, mut record) = first_record(bytes).await;
        record.crc32 ^= 1;

        let err = extractor.read_entry(&record).await.unwrap_err();
        assert_eq!(err.to_string(), "CRC-32 mismatch for a.txt");
    }
}
