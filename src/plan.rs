//! Splitting a file into the byte ranges uploaded as parts.
use std::ops::Range;

use crate::errors::{Error, Result};

/// Upper bound on parts per upload imposed by S3-compatible stores.
pub const MAX_PARTS: usize = 10_000;

/// One part's byte range, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number.
    pub part_number: i32,
    pub start: u64,
    pub end: u64,
}

impl PartRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<u64> {
        self.start..self.end
    }
}

/// The ordered parts of a file of known size, cut at a fixed chunk size.
///
/// Computed once, before anything is sent, so any single range can be re-read
/// deterministically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartPlan {
    file_size: u64,
    chunk_size: u64,
    ranges: Vec<PartRange>,
}

impl PartPlan {
    pub fn new(file_size: u64, chunk_size: u64) -> Result<PartPlan> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput(String::from(
                "chunk size must be greater than zero",
            )));
        }
        let count = file_size.div_ceil(chunk_size);
        if count > MAX_PARTS as u64 {
            return Err(Error::InvalidInput(format!(
                "{file_size} bytes in chunks of {chunk_size} needs {count} parts, more than {MAX_PARTS}"
            )));
        }

        let ranges = (0..count)
            .map(|i| {
                let start = i * chunk_size;
                PartRange {
                    part_number: i as i32 + 1,
                    start,
                    end: (start + chunk_size).min(file_size),
                }
            })
            .collect();

        Ok(PartPlan {
            file_size,
            chunk_size,
            ranges,
        })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, part_number: i32) -> Option<&PartRange> {
        if part_number < 1 {
            return None;
        }
        self.ranges.get(part_number as usize - 1)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PartRange> {
        self.ranges.iter()
    }
}

impl<'a> IntoIterator for &'a PartPlan {
    type Item = &'a PartRange;
    type IntoIter = std::slice::Iter<'a, PartRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    const MB: u64 = 1024 * 1024;

    #[rstest]
    #[case::empty(0, 5, 0)]
    #[case::smaller_than_chunk(3, 5, 1)]
    #[case::exact_multiple(10, 5, 2)]
    #[case::remainder(11, 5, 3)]
    #[case::single_byte_chunks(7, 1, 7)]
    #[case::photo(120 * MB, 50 * MB, 3)]
    fn part_count_is_ceiling(#[case] size: u64, #[case] chunk: u64, #[case] expected: usize) {
        let plan = PartPlan::new(size, chunk).unwrap();
        assert_eq!(plan.len(), expected);
    }

    #[test]
    fn ranges_partition_the_file() {
        for size in 0..200u64 {
            for chunk in 1..20u64 {
                let plan = PartPlan::new(size, chunk).unwrap();
                let mut next = 0;
                for (i, range) in plan.iter().enumerate() {
                    assert_eq!(range.part_number, i as i32 + 1);
                    assert_eq!(range.start, next);
                    assert!(range.end > range.start);
                    assert!(range.len() <= chunk);
                    next = range.end;
                }
                assert_eq!(next, size);
            }
        }
    }

    #[test]
    fn last_part_carries_remainder() {
        let plan = PartPlan::new(120 * MB, 50 * MB).unwrap();
        let lens: Vec<u64> = plan.iter().map(PartRange::len).collect();
        assert_eq!(lens, vec![50 * MB, 50 * MB, 20 * MB]);
        assert_eq!(plan.get(3).unwrap().as_range(), 100 * MB..120 * MB);
        assert!(plan.get(0).is_none());
        assert!(plan.get(4).is_none());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(matches!(PartPlan::new(10, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn rejects_too_many_parts() {
        assert!(PartPlan::new(MAX_PARTS as u64, 1).is_ok());
        assert!(matches!(
            PartPlan::new(MAX_PARTS as u64 + 1, 1),
            Err(Error::InvalidInput(_))
        ));
    }
}
