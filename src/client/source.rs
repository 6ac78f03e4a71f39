use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::errors::Result;
use crate::plan::PartRange;

/// A byte source of known size that parts are read from.
#[async_trait]
pub trait PartSource: Send {
    fn size(&self) -> u64;

    /// Read exactly the bytes of `range`.
    async fn read_range(&mut self, range: &PartRange) -> Result<Bytes>;
}

#[async_trait]
impl PartSource for Bytes {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    async fn read_range(&mut self, range: &PartRange) -> Result<Bytes> {
        Ok(self.slice(range.start as usize..range.end as usize))
    }
}

/// A file on disk, read one part at a time.
pub struct FileSource {
    file: File,
    size: u64,
}

impl FileSource {
    pub async fn open(path: &Path) -> Result<FileSource> {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok(FileSource { file, size })
    }
}

#[async_trait]
impl PartSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&mut self, range: &PartRange) -> Result<Bytes> {
        self.file.seek(SeekFrom::Start(range.start)).await?;
        let mut buf = BytesMut::zeroed(range.len() as usize);
        self.file.read_exact(&mut buf).await?;
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;
    use crate::plan::PartPlan;

    #[tokio::test]
    async fn file_source_reads_planned_ranges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdefghij").unwrap();

        let mut source = FileSource::open(file.path()).await.unwrap();
        assert_eq!(source.size(), 10);

        let plan = PartPlan::new(source.size(), 4).unwrap();
        let mut chunks = Vec::new();
        // out of order on purpose: every range must be readable on its own
        for n in [3, 1, 2] {
            let range = plan.get(n).unwrap();
            chunks.push(source.read_range(range).await.unwrap());
        }
        assert_eq!(
            chunks,
            vec![Bytes::from("ij"), Bytes::from("abcd"), Bytes::from("efgh")]
        );
    }
}
