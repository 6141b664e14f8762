mod local;
mod memory;

pub use local::LocalFileReader;
pub use memory::MemoryReader;

use anyhow::Result;
use async_trait::async_trait;

/// Random access to the bytes of an archive
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Total size of the data source in bytes
    fn size(&self) -> u64;

    /// Fill the whole buffer or fail
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                anyhow::bail!(
                    "Unexpected end of archive at offset {} ({} of {} bytes read)",
                    offset,
                    filled,
                    buf.len()
                );
            }
            filled += n;
        }
        Ok(())
    }
}
