//! # 条目链表
//!
//! 目录的目录项和文件的数据块地址都按同一种方式存放：
//! 先填满描述符的内联数组，其余的放进溢出块，
//! 溢出块通过块首的“下一块”指针串成单链表，链表头记录在描述符中。
//! 描述符的已用条目数决定了链表中哪些槽位有效，链表长度恰好够放下这些条目。
//!
//! [`SegmentCursor`] 在这种结构上逐个移动，
//! [`append`] 在末尾追加，[`remove`] 以末尾条目覆盖被删条目后收缩一格。
//! 分配、释放、读溢出块、写描述符由 [`SegmentStore`] 提供。

use core::marker::PhantomData;
use core::mem;

use enumflags2::BitFlags;

use crate::buffer::{Access, BufferHandle};
use crate::config::HEADER_ADDRESS;
use crate::layout::{Descriptor, Extension, Header, SegmentEntry};
use crate::{Error, Result};

/// 链表算法依赖的外部能力，由文件系统实现
pub trait SegmentStore {
    /// 分配一个空闲数据块
    fn allocate_block(&self) -> Result<u64>;

    fn free_block(&self, address: u64) -> Result<()>;

    fn read_overflow(&self, address: u64, access: BitFlags<Access>)
    -> Result<BufferHandle<Extension>>;

    fn write_descriptor(&self, index: u64, descriptor: &Descriptor) -> Result<()>;
}

/// 内联数组与单个溢出块各能放下的条目数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub inline: u64,
    pub per_block: u64,
}

impl Capacity {
    #[inline]
    pub fn of<E: SegmentEntry>(header: &Header) -> Self {
        Self {
            inline: E::inline_capacity(header),
            per_block: E::block_capacity(header),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Position {
    /// 逻辑序号
    index: u64,
    /// 在当前容器（内联数组或溢出块）中的槽位
    offset: u64,
}

/// 链表上的游标。
///
/// 游标持有描述符的私有副本，对副本的修改只在 [`SegmentCursor::flush`] 时写回；
/// 同一时刻至多持有一个溢出块的句柄，离开该块时按访问模式写回。
pub struct SegmentCursor<'s, E, S: ?Sized> {
    store: &'s S,
    index: u64,
    descriptor: Descriptor,
    capacity: Capacity,
    access: BitFlags<Access>,
    /// 为空表示尚未移动到第一个条目
    position: Option<Position>,
    /// 当前溢出块，0表示仍在内联数组中
    block_address: u64,
    previous_address: u64,
    /// 内联数组中时为无效句柄
    block: BufferHandle<Extension>,
    _entry: PhantomData<E>,
}

impl<'s, E: SegmentEntry, S: SegmentStore + ?Sized> SegmentCursor<'s, E, S> {
    pub fn new(
        store: &'s S,
        index: u64,
        descriptor: Descriptor,
        capacity: Capacity,
        access: BitFlags<Access>,
    ) -> Self {
        debug_assert!(capacity.inline > 0 && capacity.per_block > 0);

        Self {
            store,
            index,
            descriptor,
            capacity,
            access,
            position: None,
            block_address: HEADER_ADDRESS,
            previous_address: HEADER_ADDRESS,
            block: BufferHandle::default(),
            _entry: PhantomData,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    #[inline]
    pub fn descriptor_index(&self) -> u64 {
        self.index
    }

    /// 当前条目的逻辑序号
    #[inline]
    pub fn position(&self) -> Option<u64> {
        self.position.map(|position| position.index)
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.next_index() < self.descriptor.used
    }

    /// 移动到下一个条目，越过容器末尾时载入下一个溢出块
    pub fn advance(&mut self) -> Result<()> {
        if !self.has_next() {
            return Err(Error::InvalidIterator);
        }

        let next = match self.position {
            None => Position {
                index: 0,
                offset: 0,
            },
            Some(position) if position.offset + 1 < self.limit() => Position {
                index: position.index + 1,
                offset: position.offset + 1,
            },
            Some(position) => {
                self.load_next()?;
                Position {
                    index: position.index + 1,
                    offset: 0,
                }
            }
        };
        self.position = Some(next);

        Ok(())
    }

    pub fn current(&mut self) -> Result<E> {
        let position = self.position.ok_or(Error::InvalidIterator)?;
        if self.in_descriptor() {
            Ok(self.descriptor.inline(position.offset))
        } else {
            Ok(self.block.block()?.entry(position.offset))
        }
    }

    pub fn set_current(&mut self, entry: E) -> Result<()> {
        let position = self.position.ok_or(Error::InvalidIterator)?;
        self.put(position.offset, entry)
    }

    /// 移动到最后一个条目；没有条目时保持不动
    pub fn to_last(&mut self) -> Result<()> {
        while self.has_next() {
            self.advance()?;
        }

        Ok(())
    }

    /// 向前移动到逻辑序号为`index`的条目
    pub fn seek(&mut self, index: u64) -> Result<()> {
        if index >= self.descriptor.used || self.position().is_some_and(|at| at > index) {
            return Err(Error::InvalidIterator);
        }
        while self.position() != Some(index) {
            self.advance()?;
        }

        Ok(())
    }

    /// 写回描述符副本与当前溢出块
    pub fn flush(&mut self) -> Result<()> {
        self.store.write_descriptor(self.index, &self.descriptor)?;
        self.block.flush()
    }

    /// 写回后释放游标
    pub fn close(mut self) -> Result<()> {
        self.store.write_descriptor(self.index, &self.descriptor)?;
        mem::take(&mut self.block).close()
    }
}

impl<'s, E: SegmentEntry, S: SegmentStore + ?Sized> SegmentCursor<'s, E, S> {
    #[inline]
    fn in_descriptor(&self) -> bool {
        self.block_address == HEADER_ADDRESS
    }

    #[inline]
    fn next_index(&self) -> u64 {
        self.position.map_or(0, |position| position.index + 1)
    }

    /// 当前容器的槽位数
    #[inline]
    fn limit(&self) -> u64 {
        if self.in_descriptor() {
            self.capacity.inline
        } else {
            self.capacity.per_block
        }
    }

    fn put(&mut self, offset: u64, entry: E) -> Result<()> {
        if self.in_descriptor() {
            self.descriptor.set_inline(offset, entry);
        } else {
            self.block.block()?.set_entry(offset, entry);
        }

        Ok(())
    }

    /// 当前容器的“下一块”指针
    fn next_pointer(&mut self) -> Result<u64> {
        if self.in_descriptor() {
            Ok(self.descriptor.next_segment)
        } else {
            Ok(self.block.block()?.next())
        }
    }

    fn set_next_pointer(&mut self, next: u64) -> Result<()> {
        if self.in_descriptor() {
            self.descriptor.next_segment = next;
        } else {
            self.block.block()?.set_next(next);
        }

        Ok(())
    }

    fn load_next(&mut self) -> Result<()> {
        let next = self.next_pointer()?;
        if next == HEADER_ADDRESS {
            return Err(Error::Corrupted("overflow chain is shorter than its entry count"));
        }

        let block = self.store.read_overflow(next, self.access)?;
        mem::replace(&mut self.block, block).close()?;
        self.previous_address = self.block_address;
        self.block_address = next;

        Ok(())
    }

    /// 只读的副本，停在同一位置
    fn fork(&self) -> Result<Self> {
        let block = if self.in_descriptor() {
            BufferHandle::default()
        } else {
            self.store
                .read_overflow(self.block_address, Access::Read.into())?
        };

        Ok(Self {
            store: self.store,
            index: self.index,
            descriptor: self.descriptor.clone(),
            capacity: self.capacity,
            access: Access::Read.into(),
            position: self.position,
            block_address: self.block_address,
            previous_address: self.previous_address,
            block,
            _entry: PhantomData,
        })
    }
}

/// 在末尾追加条目：末尾容器还有空位就放进去，
/// 否则分配新的溢出块挂到链表尾部。返回更新后的描述符。
pub fn append<E, S>(
    store: &S,
    index: u64,
    descriptor: Descriptor,
    capacity: Capacity,
    entry: E,
) -> Result<Descriptor>
where
    E: SegmentEntry,
    S: SegmentStore + ?Sized,
{
    let mut cursor = SegmentCursor::new(
        store,
        index,
        descriptor,
        capacity,
        Access::Read | Access::Write,
    );
    cursor.to_last()?;

    let slot = cursor.position.map_or(0, |position| position.offset + 1);
    if slot < cursor.limit() {
        cursor.put(slot, entry)?;
    } else {
        let address = store.allocate_block()?;
        if let Err(err) = init_overflow(store, address, entry) {
            if let Err(free_err) = store.free_block(address) {
                log::error!("failed to release overflow block {address}: {free_err}");
            }
            return Err(err);
        }
        cursor.set_next_pointer(address)?;
        log::debug!("descriptor {index} chained overflow block {address}");
    }

    cursor.descriptor.used += 1;
    let descriptor = cursor.descriptor.clone();
    cursor.close()?;

    Ok(descriptor)
}

/// 删除游标所在的条目：用最后一个条目覆盖它，再把条目数减一。
/// 若最后一个条目独占一个溢出块，释放该块并清空前驱的“下一块”指针。
/// 游标须可写，删除后即被消耗。返回更新后的描述符。
pub fn remove<E, S>(mut cursor: SegmentCursor<'_, E, S>) -> Result<Descriptor>
where
    E: SegmentEntry,
    S: SegmentStore + ?Sized,
{
    if !cursor.access.contains(Access::Write) {
        return Err(Error::InvalidArgument("cursor is read-only".into()));
    }
    let target = cursor.position.ok_or(Error::InvalidIterator)?;

    let mut last = cursor.fork()?;
    last.to_last()?;
    let tail = last.position.ok_or(Error::InvalidIterator)?;
    let value = last.current()?;
    let emptied = (tail.offset == 0 && !last.in_descriptor())
        .then_some((last.block_address, last.previous_address));
    drop(last);

    if target.index != tail.index {
        cursor.set_current(value)?;
    }
    cursor.descriptor.used -= 1;

    if let Some((address, previous)) = emptied {
        if previous == HEADER_ADDRESS {
            cursor.descriptor.next_segment = HEADER_ADDRESS;
        } else if previous == cursor.block_address {
            cursor.block.block()?.set_next(HEADER_ADDRESS);
        } else {
            let mut handle = cursor
                .store
                .read_overflow(previous, Access::Read | Access::Write)?;
            handle.block()?.set_next(HEADER_ADDRESS);
            handle.close()?;
        }

        // 被删的就是末尾条目，它所在的块不必写回
        if cursor.block_address == address {
            mem::take(&mut cursor.block).discard();
        }
        cursor.store.free_block(address)?;
        log::debug!(
            "descriptor {} released overflow block {address}",
            cursor.index
        );
    }

    let descriptor = cursor.descriptor.clone();
    cursor.close()?;

    Ok(descriptor)
}

fn init_overflow<E, S>(store: &S, address: u64, entry: E) -> Result<()>
where
    E: SegmentEntry,
    S: SegmentStore + ?Sized,
{
    let mut handle = store.read_overflow(address, Access::Write.into())?;
    let mut block = handle.block()?;
    block.init();
    block.set_entry(0, entry);
    handle.close()
}
