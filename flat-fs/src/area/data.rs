use alloc::sync::Arc;

use crate::area::Area;
use crate::buffer::Access;
use crate::layout::{Data, Header};
use crate::store::FormattedStore;
use crate::Result;

/// 数据区，块的解释由引用它的描述符决定
#[derive(Clone)]
pub struct DataArea {
    store: Arc<FormattedStore>,
}

impl Area for DataArea {
    #[inline]
    fn store(&self) -> &Arc<FormattedStore> {
        &self.store
    }

    #[inline]
    fn bounds(header: &Header) -> (u64, u64) {
        (header.data_begin(), header.data_end)
    }

    /// 数据块在分配时才清零
    fn init_blocks(&self) -> Result<()> {
        Ok(())
    }
}

impl DataArea {
    #[inline]
    pub fn new(store: Arc<FormattedStore>) -> Self {
        Self { store }
    }

    /// 清零一块
    pub fn clear(&self, address: u64) -> Result<()> {
        let mut handle = self.read::<Data>(address, Access::Write.into())?;
        handle.block()?.fill(0);
        handle.close()
    }

    /// 从块内`offset`处读出`buf.len()`字节
    pub fn read_at(&self, address: u64, offset: usize, buf: &mut [u8]) -> Result<()> {
        let mut handle = self.read::<Data>(address, Access::Read.into())?;
        buf.copy_from_slice(&handle.block()?[offset..offset + buf.len()]);
        Ok(())
    }

    /// 把`buf`写入块内`offset`处，块内其余字节保持不变
    pub fn write_at(&self, address: u64, offset: usize, buf: &[u8]) -> Result<()> {
        let mut handle = self.read::<Data>(address, Access::Read | Access::Write)?;
        handle.block()?[offset..offset + buf.len()].copy_from_slice(buf);
        handle.close()
    }
}
