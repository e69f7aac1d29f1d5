//! # 块缓冲层
//!
//! 块读写都经过定长的字节缓冲区。[`BufferPool`] 维护空闲缓冲区链表，
//! 借出时优先复用空闲的缓冲区，否则新分配；归还后回到空闲链表。
//!
//! [`BufferHandle`] 独占一个缓冲区，并把它解释为某种块布局的视图。
//! 缓冲区在第一次访问时才被借出；句柄析构时，
//! 若访问模式允许写入，就把缓冲区的内容写回对应的块，再归还缓冲区。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use enumflags2::{BitFlags, bitflags};
use spin::Mutex;

use crate::config::HEADER_ADDRESS;
use crate::layout::BlockKind;
use crate::store::FormattedStore;
use crate::{Error, Result};

/// 句柄对块的访问模式，空集即不做任何读写
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// 打开时从块中读入
    Read = 0b01,
    /// 析构时写回块中
    Write = 0b10,
}

/// 缓冲区池
#[derive(Debug)]
pub struct BufferPool {
    inner: Mutex<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    /// 默认缓冲区大小，0表示尚未配置
    buffer_size: usize,
    /// 空闲的缓冲区，长度均为`buffer_size`
    free: Vec<Box<[u8]>>,
    /// 借出未还的缓冲区个数
    occupied: usize,
}

impl BufferPool {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                buffer_size: 0,
                free: Vec::new(),
                occupied: 0,
            }),
        }
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.inner.lock().buffer_size
    }

    /// 修改默认缓冲区大小。
    /// 有缓冲区借出时拒绝修改；大小变化时丢弃所有空闲缓冲区。
    pub fn set_buffer_size(&self, size: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.occupied != 0 {
            return Err(Error::BuffersOccupied(inner.occupied));
        }

        if inner.buffer_size != size {
            inner.free.clear();
            inner.buffer_size = size;
        }

        Ok(())
    }

    /// 借出一个长度为`size`的缓冲区
    pub fn acquire(&self, size: usize) -> Result<Box<[u8]>> {
        if size == 0 {
            return Err(Error::BlockSizeUnset);
        }

        let mut inner = self.inner.lock();
        let reused = if size == inner.buffer_size {
            inner.free.pop()
        } else {
            None
        };
        let buffer = reused.unwrap_or_else(|| vec![0; size].into_boxed_slice());
        inner.occupied += 1;
        log::trace!("buffer acquired, {} in use", inner.occupied);

        Ok(buffer)
    }

    /// 归还缓冲区，只有默认大小的缓冲区会被留下复用
    pub fn release(&self, buffer: Box<[u8]>) {
        let mut inner = self.inner.lock();
        inner.occupied = inner.occupied.saturating_sub(1);
        if buffer.len() == inner.buffer_size {
            inner.free.push(buffer);
        }
        log::trace!("buffer released, {} in use", inner.occupied);
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.inner.lock().occupied
    }

    #[inline]
    pub fn idle(&self) -> usize {
        self.inner.lock().free.len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// 独占一个缓冲区的块句柄，`K`决定缓冲区被解释成哪种块。
///
/// 默认构造的句柄是无效的，不做任何读写，访问其数据会失败。
pub struct BufferHandle<K: BlockKind> {
    slot: Option<Slot>,
    _kind: PhantomData<K>,
}

struct Slot {
    store: Arc<FormattedStore>,
    address: u64,
    access: BitFlags<Access>,
    /// 懒借出的缓冲区
    buffer: Option<Box<[u8]>>,
}

impl<K: BlockKind> BufferHandle<K> {
    /// 创建句柄但不读入块
    pub fn new(store: Arc<FormattedStore>, address: u64, access: BitFlags<Access>) -> Result<Self> {
        if address == HEADER_ADDRESS {
            return Err(Error::BadAddress(address));
        }

        Ok(Self {
            slot: Some(Slot {
                store,
                address,
                access,
                buffer: None,
            }),
            _kind: PhantomData,
        })
    }

    /// 创建句柄，访问模式含读时立即读入块
    pub fn open(store: Arc<FormattedStore>, address: u64, access: BitFlags<Access>) -> Result<Self> {
        let mut handle = Self::new(store, address, access)?;
        if access.contains(Access::Read) {
            handle.fill()?;
        }

        Ok(handle)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.slot.is_some()
    }

    pub fn address(&self) -> Result<u64> {
        self.slot
            .as_ref()
            .map(|slot| slot.address)
            .ok_or(Error::InvalidHandle)
    }

    pub fn access(&self) -> BitFlags<Access> {
        self.slot
            .as_ref()
            .map_or(BitFlags::empty(), |slot| slot.access)
    }

    /// 缓冲区长度，即存储的块大小
    pub fn len(&self) -> Result<usize> {
        let slot = self.slot.as_ref().ok_or(Error::InvalidHandle)?;
        Ok(slot.store.block_size()? as usize)
    }

    /// 原始字节，第一次访问时借出缓冲区
    pub fn data(&mut self) -> Result<&mut [u8]> {
        let slot = self.slot.as_mut().ok_or(Error::InvalidHandle)?;
        slot.ensure_buffer()?;
        slot.buffer.as_deref_mut().ok_or(Error::InvalidHandle)
    }

    /// 带类型的块视图，写入视图即写入缓冲区
    #[inline]
    pub fn block(&mut self) -> Result<K::View<'_>> {
        Ok(K::view(self.data()?))
    }

    /// 访问模式允许写入时，立即把缓冲区写回块
    pub fn flush(&mut self) -> Result<()> {
        let Some(slot) = &self.slot else {
            return Ok(());
        };

        if slot.access.contains(Access::Write) {
            if let Some(buffer) = &slot.buffer {
                slot.store.write_block(slot.address, buffer)?;
            }
        }

        Ok(())
    }

    /// 写回并归还缓冲区，写回失败时返回错误
    pub fn close(mut self) -> Result<()> {
        let result = self.flush();
        if let Some(slot) = self.slot.take() {
            slot.release();
        }
        result
    }

    /// 放弃句柄，不写回，只归还缓冲区
    pub fn discard(mut self) {
        if let Some(slot) = self.slot.take() {
            slot.release();
        }
    }

    fn fill(&mut self) -> Result<()> {
        let slot = self.slot.as_mut().ok_or(Error::InvalidHandle)?;
        slot.ensure_buffer()?;
        let Slot {
            store,
            address,
            buffer,
            ..
        } = slot;
        match buffer {
            Some(buffer) => store.read_block(*address, buffer),
            None => Err(Error::InvalidHandle),
        }
    }
}

impl Slot {
    fn ensure_buffer(&mut self) -> Result<()> {
        if self.buffer.is_none() {
            let size = self.store.block_size()? as usize;
            self.buffer = Some(self.store.raw().pool().acquire(size)?);
        }

        Ok(())
    }

    fn release(self) {
        if let Some(buffer) = self.buffer {
            self.store.raw().pool().release(buffer);
        }
    }
}

impl<K: BlockKind> Default for BufferHandle<K> {
    fn default() -> Self {
        Self {
            slot: None,
            _kind: PhantomData,
        }
    }
}

impl<K: BlockKind> fmt::Debug for BufferHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Some(slot) => f
                .debug_struct("BufferHandle")
                .field("address", &slot.address)
                .field("access", &slot.access)
                .field("loaded", &slot.buffer.is_some())
                .finish(),
            None => f.write_str("BufferHandle(invalid)"),
        }
    }
}

impl<K: BlockKind> Drop for BufferHandle<K> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::error!("failed to write back block: {err}");
        }
        if let Some(slot) = self.slot.take() {
            slot.release();
        }
    }
}
