use crate::layout::{SegmentEntry, read_u64, write_u64};

/// 溢出块视图：下一溢出块地址 u64，随后是条目数组
#[derive(Debug)]
pub struct ExtensionBlock<'a> {
    bytes: &'a mut [u8],
}

impl<'a> ExtensionBlock<'a> {
    const ENTRIES: usize = 8;

    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// 清空整块，链表在此终止
    #[inline]
    pub fn init(&mut self) {
        self.bytes.fill(0);
    }

    #[inline]
    pub fn next(&self) -> u64 {
        read_u64(self.bytes, 0)
    }

    #[inline]
    pub fn set_next(&mut self, next: u64) {
        write_u64(self.bytes, 0, next);
    }

    #[inline]
    pub fn capacity<E: SegmentEntry>(&self) -> u64 {
        ((self.bytes.len() - Self::ENTRIES) / E::SIZE) as u64
    }

    pub fn entry<E: SegmentEntry>(&self, slot: u64) -> E {
        let offset = Self::ENTRIES + slot as usize * E::SIZE;
        E::decode(&self.bytes[offset..offset + E::SIZE])
    }

    pub fn set_entry<E: SegmentEntry>(&mut self, slot: u64, entry: E) {
        let offset = Self::ENTRIES + slot as usize * E::SIZE;
        entry.encode(&mut self.bytes[offset..offset + E::SIZE]);
    }
}
