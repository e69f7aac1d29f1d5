use crate::config::{
    DESCRIPTOR_SIZE, MAX_FILENAME, MIN_BLOCK_SIZE, ROOT_DESCRIPTOR, SIGNATURE, VERSION,
};
use crate::layout::{DirEntry, PAYLOAD_SIZE, SegmentEntry};
use crate::layout::{read_u32, read_u64, write_u32, write_u64};
use crate::{Error, Result};

/// 文件系统头编码后的字节数
pub const HEADER_SIZE: usize = 136;

/// 文件系统头，位于第0块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// 魔数签名
    pub signature: [u8; 33],
    /// 布局版本
    pub version: u32,
    /// 名字最大长度
    pub filename_length: u32,
    pub block_size: u64,
    pub descriptor_size: u64,
    /// 根目录的描述符编号
    pub root: u64,
    /// 文件描述符内联的数据块地址数
    pub links_in_descriptor: u64,
    /// 溢出块中的数据块地址数
    pub links_in_block: u64,
    /// 目录描述符内联的目录项数
    pub entries_in_descriptor: u64,
    /// 溢出块中的目录项数
    pub entries_in_block: u64,
    pub bitmap_begin: u64,
    pub bitmap_end: u64,
    pub descriptors_end: u64,
    pub data_end: u64,
}

impl Header {
    /// 以给定块大小初始化，区域边界留待格式化时填写
    pub fn new(block_size: u64) -> Self {
        let inline = (PAYLOAD_SIZE - 8) as u64;
        let extension = block_size.saturating_sub(8);

        Self {
            signature: SIGNATURE,
            version: VERSION,
            filename_length: MAX_FILENAME as u32,
            block_size,
            descriptor_size: DESCRIPTOR_SIZE,
            root: ROOT_DESCRIPTOR,
            links_in_descriptor: inline / u64::SIZE as u64,
            links_in_block: extension / u64::SIZE as u64,
            entries_in_descriptor: inline / DirEntry::SIZE as u64,
            entries_in_block: extension / DirEntry::SIZE as u64,
            bitmap_begin: 0,
            bitmap_end: 0,
            descriptors_end: 0,
            data_end: 0,
        }
    }

    #[inline]
    pub fn has_signature(&self) -> bool {
        self.signature == SIGNATURE
    }

    #[inline]
    pub fn descriptors_begin(&self) -> u64 {
        self.bitmap_end + 1
    }

    #[inline]
    pub fn data_begin(&self) -> u64 {
        self.descriptors_end + 1
    }

    #[inline]
    pub fn descriptors_per_block(&self) -> u64 {
        self.block_size / self.descriptor_size
    }

    /// 每个位图块能表示的块数
    #[inline]
    pub fn bits_per_block(&self) -> u64 {
        self.block_size * 8
    }

    /// 校验从设备读入的文件系统头，`blocks`为按其块大小计算的设备块数。
    ///
    /// 派生的条目数必须与块大小重新计算的结果一致，区域须依次相接且落在设备之内，
    /// 位图须覆盖到数据区的末尾。
    pub fn validate(&self, blocks: u64) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE || self.block_size % DESCRIPTOR_SIZE != 0 || blocks == 0 {
            return Err(Error::Corrupted("block size does not fit the image"));
        }

        let expected = Self::new(self.block_size);
        let counts = |header: &Self| {
            (
                header.descriptor_size,
                header.filename_length,
                header.root,
                header.links_in_descriptor,
                header.links_in_block,
                header.entries_in_descriptor,
                header.entries_in_block,
            )
        };
        if counts(self) != counts(&expected) {
            return Err(Error::Corrupted("header counts do not match its block size"));
        }

        let ordered = self.bitmap_begin == 1
            && self.bitmap_begin <= self.bitmap_end
            && self.bitmap_end < self.descriptors_end
            && self.descriptors_end < self.data_end
            && self.data_end < blocks;
        if !ordered {
            return Err(Error::Corrupted("area boundaries are out of order"));
        }

        let covered = (self.bitmap_end - self.bitmap_begin + 1).saturating_mul(self.bits_per_block());
        if covered <= self.data_end {
            return Err(Error::Corrupted("bitmap does not cover the data area"));
        }

        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let mut signature = [0; 33];
        signature.copy_from_slice(&bytes[..33]);

        Self {
            signature,
            version: read_u32(bytes, 40),
            filename_length: read_u32(bytes, 44),
            block_size: read_u64(bytes, 48),
            descriptor_size: read_u64(bytes, 56),
            root: read_u64(bytes, 64),
            links_in_descriptor: read_u64(bytes, 72),
            links_in_block: read_u64(bytes, 80),
            entries_in_descriptor: read_u64(bytes, 88),
            entries_in_block: read_u64(bytes, 96),
            bitmap_begin: read_u64(bytes, 104),
            bitmap_end: read_u64(bytes, 112),
            descriptors_end: read_u64(bytes, 120),
            data_end: read_u64(bytes, 128),
        }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        bytes[..HEADER_SIZE].fill(0);
        bytes[..33].copy_from_slice(&self.signature);
        write_u32(bytes, 40, self.version);
        write_u32(bytes, 44, self.filename_length);
        write_u64(bytes, 48, self.block_size);
        write_u64(bytes, 56, self.descriptor_size);
        write_u64(bytes, 64, self.root);
        write_u64(bytes, 72, self.links_in_descriptor);
        write_u64(bytes, 80, self.links_in_block);
        write_u64(bytes, 88, self.entries_in_descriptor);
        write_u64(bytes, 96, self.entries_in_block);
        write_u64(bytes, 104, self.bitmap_begin);
        write_u64(bytes, 112, self.bitmap_end);
        write_u64(bytes, 120, self.descriptors_end);
        write_u64(bytes, 128, self.data_end);
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            signature: [0; 33],
            version: 0,
            filename_length: 0,
            block_size: 0,
            descriptor_size: 0,
            root: 0,
            links_in_descriptor: 0,
            links_in_block: 0,
            entries_in_descriptor: 0,
            entries_in_block: 0,
            bitmap_begin: 0,
            bitmap_end: 0,
            descriptors_end: 0,
            data_end: 0,
        }
    }
}
