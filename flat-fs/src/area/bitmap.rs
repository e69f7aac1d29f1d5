use alloc::sync::Arc;

use crate::area::Area;
use crate::buffer::Access;
use crate::config::HEADER_ADDRESS;
use crate::layout::{Bitmap, Header};
use crate::store::FormattedStore;
use crate::{Error, Result};

/// 位图区，每个块地址对应一位，1表示已占用。
/// 第`a`块的位位于第`bitmap_begin + a / bits`个位图块的第`a % bits`位。
#[derive(Clone)]
pub struct BitmapArea {
    store: Arc<FormattedStore>,
}

impl Area for BitmapArea {
    #[inline]
    fn store(&self) -> &Arc<FormattedStore> {
        &self.store
    }

    #[inline]
    fn bounds(header: &Header) -> (u64, u64) {
        (header.bitmap_begin, header.bitmap_end)
    }
}

impl BitmapArea {
    #[inline]
    pub fn new(store: Arc<FormattedStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, address: u64) -> Result<bool> {
        let (block, bit) = self.position(address)?;
        let mut handle = self.read::<Bitmap>(block, Access::Read.into())?;
        Ok(handle.block()?.get(bit))
    }

    pub fn set(&self, address: u64, occupied: bool) -> Result<()> {
        let (block, bit) = self.position(address)?;
        let mut handle = self.read::<Bitmap>(block, Access::Read | Access::Write)?;
        handle.block()?.set(bit, occupied);
        handle.close()
    }

    /// 在块地址闭区间`[begin, end]`内寻找第一个空闲块，找不到时返回0。
    ///
    /// 先扫描首个位图块从起始位开始的部分，再扫描中间的整块，
    /// 最后扫描末尾位图块到结束位为止，每个位图块只读一次。
    pub fn find_first_free(&self, begin: u64, end: u64) -> Result<u64> {
        if begin > end {
            return Err(Error::InvalidArgument(alloc::format!(
                "empty block range [{begin}, {end}]"
            )));
        }

        let bits = self.store.header()?.bits_per_block();
        let (first_block, first_bit) = self.position(begin)?;
        let (last_block, last_bit) = self.position(end)?;

        for block in first_block..=last_block {
            let from = if block == first_block { first_bit } else { 0 };
            let to = if block == last_block { last_bit } else { bits - 1 };

            let mut handle = self.read::<Bitmap>(block, Access::Read.into())?;
            if let Some(bit) = handle.block()?.find_first_free(from, to) {
                let (bitmap_begin, _) = Self::bounds(&self.store.header()?);
                return Ok((block - bitmap_begin) * bits + bit);
            }
        }

        Ok(HEADER_ADDRESS)
    }

    /// 块地址对应的（位图块地址，块内位号）
    fn position(&self, address: u64) -> Result<(u64, u64)> {
        let header = self.store.header()?;
        if address == HEADER_ADDRESS || address > header.data_end {
            return Err(Error::BadAddress(address));
        }

        let bits = header.bits_per_block();
        let block = header.bitmap_begin + address / bits;
        if block > header.bitmap_end {
            return Err(Error::BadAddress(address));
        }

        Ok((block, address % bits))
    }
}
