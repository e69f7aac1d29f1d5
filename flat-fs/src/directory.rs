//! # 目录迭代器
//!
//! 在目录项链表之前合成`.`和`..`两项，它们由描述符编号和父目录字段生成，从不落盘。

use enumflags2::BitFlags;

use crate::buffer::Access;
use crate::chain::{self, Capacity, SegmentCursor, SegmentStore};
use crate::layout::{Descriptor, DirEntry};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    BeforeStart,
    Dot,
    DotDot,
    Entries,
}

/// 目录迭代器，依次产出`.`、`..`和所有目录项。
///
/// 迭代器停在最近一次产出的目录项上，[`DirectoryIter::remove`] 删除的就是它。
pub struct DirectoryIter<'s, S: ?Sized> {
    cursor: SegmentCursor<'s, DirEntry, S>,
    stage: Stage,
}

impl<'s, S: SegmentStore + ?Sized> DirectoryIter<'s, S> {
    pub fn new(
        store: &'s S,
        index: u64,
        descriptor: Descriptor,
        capacity: Capacity,
        access: BitFlags<Access>,
    ) -> Self {
        Self {
            cursor: SegmentCursor::new(store, index, descriptor, capacity, access),
            stage: Stage::BeforeStart,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &Descriptor {
        self.cursor.descriptor()
    }

    pub fn has_next(&self) -> bool {
        match self.stage {
            Stage::BeforeStart | Stage::Dot => true,
            Stage::DotDot | Stage::Entries => self.cursor.has_next(),
        }
    }

    pub fn advance(&mut self) -> Result<()> {
        self.stage = match self.stage {
            Stage::BeforeStart => Stage::Dot,
            Stage::Dot => Stage::DotDot,
            Stage::DotDot | Stage::Entries => {
                self.cursor.advance()?;
                Stage::Entries
            }
        };

        Ok(())
    }

    pub fn current(&mut self) -> Result<DirEntry> {
        match self.stage {
            Stage::BeforeStart => Err(Error::InvalidIterator),
            Stage::Dot => Ok(DirEntry::dot(self.cursor.descriptor_index())),
            Stage::DotDot => Ok(DirEntry::dot_dot(self.cursor.descriptor().parent())),
            Stage::Entries => self.cursor.current(),
        }
    }

    /// 当前项是否为合成的`.`或`..`
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        matches!(self.stage, Stage::Dot | Stage::DotDot)
    }

    /// 交换删除当前目录项，返回更新后的目录描述符
    pub fn remove(self) -> Result<Descriptor> {
        if self.stage != Stage::Entries {
            return Err(Error::InvalidIterator);
        }
        chain::remove(self.cursor)
    }
}

impl<S: SegmentStore + ?Sized> Iterator for DirectoryIter<'_, S> {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        Some(self.advance().and_then(|()| self.current()))
    }
}
