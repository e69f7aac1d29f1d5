//! # 磁盘布局层
//!
//! 所有磁盘结构都是定长的，整数一律小端序，
//! 由各类型显式地在字节切片上编解码，不做指针重解释。
//!
//! 磁盘布局（单位：块）：
//!
//! | 文件系统头 | 位图区 | 描述符区 | 数据区 |
//! | 0          | [bitmap_begin, bitmap_end] | [bitmap_end + 1, descriptors_end] | [descriptors_end + 1, data_end] |

mod bitmap;
mod descriptor;
mod dir_entry;
mod extension;
mod header;

pub use self::{
    bitmap::BitmapBlock,
    descriptor::{Descriptor, DescriptorBlock, DescriptorKind, PAYLOAD_SIZE},
    dir_entry::DirEntry,
    extension::ExtensionBlock,
    header::{HEADER_SIZE, Header},
};

/// 块的解释方式，供 [`BufferHandle`](crate::BufferHandle) 生成带类型的视图
pub trait BlockKind {
    type View<'a>;

    fn view(bytes: &mut [u8]) -> Self::View<'_>;
}

/// 位图块
#[derive(Debug)]
pub enum Bitmap {}

/// 描述符容器块
#[derive(Debug)]
pub enum Descriptors {}

/// 溢出块
#[derive(Debug)]
pub enum Extension {}

/// 数据块，不附加任何结构
#[derive(Debug)]
pub enum Data {}

impl BlockKind for Bitmap {
    type View<'a> = BitmapBlock<'a>;

    #[inline]
    fn view(bytes: &mut [u8]) -> Self::View<'_> {
        BitmapBlock::new(bytes)
    }
}

impl BlockKind for Descriptors {
    type View<'a> = DescriptorBlock<'a>;

    #[inline]
    fn view(bytes: &mut [u8]) -> Self::View<'_> {
        DescriptorBlock::new(bytes)
    }
}

impl BlockKind for Extension {
    type View<'a> = ExtensionBlock<'a>;

    #[inline]
    fn view(bytes: &mut [u8]) -> Self::View<'_> {
        ExtensionBlock::new(bytes)
    }
}

impl BlockKind for Data {
    type View<'a> = &'a mut [u8];

    #[inline]
    fn view(bytes: &mut [u8]) -> Self::View<'_> {
        bytes
    }
}

/// 可以存放在描述符内联数组和溢出块中的定长条目：
/// 目录的目录项，或文件的数据块地址
pub trait SegmentEntry: Copy {
    /// 编码后的字节数
    const SIZE: usize;

    fn decode(bytes: &[u8]) -> Self;

    fn encode(&self, bytes: &mut [u8]);

    /// 描述符内联数组的容量
    fn inline_capacity(header: &Header) -> u64;

    /// 单个溢出块的容量
    fn block_capacity(header: &Header) -> u64;
}

/// 数据块地址
impl SegmentEntry for u64 {
    const SIZE: usize = 8;

    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        read_u64(bytes, 0)
    }

    #[inline]
    fn encode(&self, bytes: &mut [u8]) {
        write_u64(bytes, 0, *self);
    }

    #[inline]
    fn inline_capacity(header: &Header) -> u64 {
        header.links_in_descriptor
    }

    #[inline]
    fn block_capacity(header: &Header) -> u64 {
        header.links_in_block
    }
}

#[inline]
pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

#[inline]
pub(crate) fn write_u64(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
pub(crate) fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
