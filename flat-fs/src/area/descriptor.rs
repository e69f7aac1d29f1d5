use alloc::sync::Arc;

use enumflags2::BitFlags;

use crate::area::Area;
use crate::buffer::Access;
use crate::config::INVALID_DESCRIPTOR;
use crate::layout::{Descriptor, DescriptorKind, Descriptors, Header};
use crate::store::FormattedStore;
use crate::{Error, Result};

/// 描述符区，描述符按编号密排在容器块中。
/// 0号描述符永久保留，因此第一个容器块从1号槽位开始分配。
#[derive(Clone)]
pub struct DescriptorArea {
    store: Arc<FormattedStore>,
}

impl Area for DescriptorArea {
    #[inline]
    fn store(&self) -> &Arc<FormattedStore> {
        &self.store
    }

    #[inline]
    fn bounds(header: &Header) -> (u64, u64) {
        (header.descriptors_begin(), header.descriptors_end)
    }
}

impl DescriptorArea {
    #[inline]
    pub fn new(store: Arc<FormattedStore>) -> Self {
        Self { store }
    }

    /// 描述符所在的容器块
    #[inline]
    pub fn block_of(&self, index: u64) -> Result<u64> {
        Ok(self.position(index)?.0)
    }

    /// 读出描述符；期望不为全集时校验种类
    pub fn get(&self, index: u64, expected: BitFlags<DescriptorKind>) -> Result<Descriptor> {
        let (block, slot) = self.position(index)?;
        let mut handle = self.read::<Descriptors>(block, Access::Read.into())?;
        let descriptor = handle.block()?.get(slot)?;
        if !descriptor.is(expected) {
            return Err(Error::KindMismatch {
                index,
                found: descriptor.kind,
            });
        }

        Ok(descriptor)
    }

    pub fn update(&self, index: u64, descriptor: &Descriptor) -> Result<()> {
        let (block, slot) = self.position(index)?;
        let mut handle = self.read::<Descriptors>(block, Access::Read | Access::Write)?;
        handle.block()?.set(slot, descriptor);
        handle.close()
    }

    /// 在容器块`block`的第一个空闲槽位写入描述符，
    /// 返回其编号以及这次写入是否占满了该块
    pub fn append(&self, block: u64, descriptor: &Descriptor) -> Result<(u64, bool)> {
        let header = self.store.header()?;
        let (begin, _) = Self::bounds(&header);
        let mut handle = self.read::<Descriptors>(block, Access::Read | Access::Write)?;
        let mut container = handle.block()?;

        let from = if block == begin { INVALID_DESCRIPTOR + 1 } else { 0 };
        let slot = container
            .first_free(from)
            .ok_or(Error::Corrupted("descriptor block marked free has no free slot"))?;
        container.set(slot, descriptor);
        let filled = container.first_free(slot + 1).is_none();
        handle.close()?;

        let index = (block - begin) * header.descriptors_per_block() + slot;
        log::debug!("descriptor {index} allocated in block {block}, filled: {filled}");
        Ok((index, filled))
    }

    pub fn increment_reference(&self, index: u64) -> Result<i64> {
        let mut descriptor = self.get(index, BitFlags::all())?;
        descriptor.references += 1;
        self.update(index, &descriptor)?;
        Ok(descriptor.references)
    }

    /// 引用计数减一并返回新值；非空目录拒绝减少。
    /// 计数归零后描述符保持原样，是否回收由调用者决定。
    pub fn decrement_reference(&self, index: u64) -> Result<i64> {
        let mut descriptor = self.get(index, BitFlags::all())?;
        if descriptor.kind == Some(DescriptorKind::Directory) && descriptor.used != 0 {
            return Err(Error::DirectoryNotEmpty(index));
        }

        descriptor.references -= 1;
        self.update(index, &descriptor)?;
        Ok(descriptor.references)
    }

    /// 描述符编号对应的（容器块地址，块内槽位）
    fn position(&self, index: u64) -> Result<(u64, u64)> {
        if index == INVALID_DESCRIPTOR {
            return Err(Error::BadDescriptor(index));
        }

        let header = self.store.header()?;
        let (begin, end) = Self::bounds(&header);
        let per_block = header.descriptors_per_block();
        let block = begin + index / per_block;
        if block > end {
            return Err(Error::BadDescriptor(index));
        }

        Ok((block, index % per_block))
    }
}
