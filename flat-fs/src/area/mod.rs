//! # 区域层
//!
//! 区域是一段连续、用途固定的块地址：位图区、描述符区、数据区。
//! 每个区域都只借用 [`FormattedStore`] 的共享引用，边界每次从文件系统头读出，
//! 因此重新格式化后无需重建区域对象。

mod bitmap;
mod data;
mod descriptor;

use alloc::sync::Arc;

use enumflags2::BitFlags;

pub use self::{bitmap::BitmapArea, data::DataArea, descriptor::DescriptorArea};
use crate::buffer::{Access, BufferHandle};
use crate::layout::{BlockKind, Header};
use crate::store::FormattedStore;
use crate::{Error, Result};

pub trait Area {
    fn store(&self) -> &Arc<FormattedStore>;

    /// 区域在给定文件系统头下的闭区间边界
    fn bounds(header: &Header) -> (u64, u64);

    #[inline]
    fn begin(&self) -> Result<u64> {
        Ok(Self::bounds(&self.store().header()?).0)
    }

    #[inline]
    fn end(&self) -> Result<u64> {
        Ok(Self::bounds(&self.store().header()?).1)
    }

    fn contains(&self, address: u64) -> Result<bool> {
        let (begin, end) = Self::bounds(&self.store().header()?);
        Ok((begin..=end).contains(&address))
    }

    /// 打开区域内某块的句柄
    fn read<K: BlockKind>(&self, address: u64, access: BitFlags<Access>) -> Result<BufferHandle<K>> {
        if !self.contains(address)? {
            return Err(Error::BadAddress(address));
        }
        self.store().read(address, access)
    }

    /// 格式化时初始化区域内的块，默认清零
    fn init_blocks(&self) -> Result<()> {
        let (begin, end) = Self::bounds(&self.store().header()?);
        self.store().clear_range(begin, end)
    }
}
