//! # 块存储层
//!
//! [`RawStore`] 只知道块：打开设备、按块读写、批量清零；
//! 块大小为0表示尚未配置，此时除文件系统头以外的读写都会失败。
//!
//! [`FormattedStore`] 包装 [`RawStore`]，常驻一份文件系统头。
//! 它在放行任何块读写前校验签名与版本，并拒绝外部对第0块的访问，
//! 只有文件系统头的同步路径能读写第0块。

use alloc::sync::Arc;
use alloc::vec;

use block_dev::BlockDevice;
use enumflags2::BitFlags;
use spin::Mutex;

use crate::buffer::{Access, BufferHandle, BufferPool};
use crate::config::{HEADER_ADDRESS, SIGNATURE, VERSION};
use crate::layout::{BlockKind, HEADER_SIZE, Header};
use crate::{Error, Result};

/// 裸块存储
#[derive(Default)]
pub struct RawStore {
    state: Mutex<RawState>,
    pool: BufferPool,
}

#[derive(Default)]
struct RawState {
    device: Option<Arc<dyn BlockDevice>>,
    /// 0表示未配置
    block_size: u64,
    block_count: u64,
}

impl RawStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开设备，`block_size`为0时保持未配置
    pub fn open(&self, device: Arc<dyn BlockDevice>, block_size: u64) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.device = Some(device);
            state.block_size = 0;
            state.block_count = 0;
        }
        self.set_block_size(block_size)
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.device = None;
        state.block_size = 0;
        state.block_count = 0;
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state.lock().device.is_some()
    }

    /// 设备容量，单位为字节
    pub fn capacity(&self) -> Result<u64> {
        Ok(self.device()?.capacity())
    }

    pub fn block_size(&self) -> Result<u64> {
        let state = self.state.lock();
        if state.device.is_none() {
            return Err(Error::NotMounted);
        }
        match state.block_size {
            0 => Err(Error::BlockSizeUnset),
            size => Ok(size),
        }
    }

    /// 重新配置块大小，块数随之按设备容量重新计算，缓冲区池同步调整
    pub fn set_block_size(&self, block_size: u64) -> Result<()> {
        let capacity = self.capacity()?;
        self.pool.set_buffer_size(block_size as usize)?;

        let mut state = self.state.lock();
        state.block_size = block_size;
        state.block_count = capacity.checked_div(block_size).unwrap_or(0);
        log::debug!(
            "block size set to {block_size}, {} block(s)",
            state.block_count
        );

        Ok(())
    }

    pub fn block_count(&self) -> Result<u64> {
        self.block_size()?;
        Ok(self.state.lock().block_count)
    }

    #[inline]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// 读入一整块，`buf`的长度须等于块大小
    pub fn read_block(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let device = self.checked_device(address, buf.len())?;
        log::trace!("read block {address}");
        Ok(device.read_block(address, buf)?)
    }

    /// 写入一整块，`buf`的长度须等于块大小
    pub fn write_block(&self, address: u64, buf: &[u8]) -> Result<()> {
        let device = self.checked_device(address, buf.len())?;
        log::trace!("write block {address}");
        Ok(device.write_block(address, buf)?)
    }

    /// 清零`[begin, end]`内的所有块
    pub fn clear_range(&self, begin: u64, end: u64) -> Result<()> {
        let zeros = vec![0; self.block_size()? as usize];
        for address in begin..=end {
            self.write_block(address, &zeros)?;
        }

        Ok(())
    }
}

impl RawStore {
    fn device(&self) -> Result<Arc<dyn BlockDevice>> {
        self.state.lock().device.clone().ok_or(Error::NotMounted)
    }

    fn checked_device(&self, address: u64, len: usize) -> Result<Arc<dyn BlockDevice>> {
        let state = self.state.lock();
        let device = state.device.clone().ok_or(Error::NotMounted)?;
        if state.block_size == 0 {
            return Err(Error::BlockSizeUnset);
        }
        if len as u64 != state.block_size {
            return Err(Error::InvalidArgument(alloc::format!(
                "buffer of {len} bytes for a {}-byte block",
                state.block_size
            )));
        }
        if address >= state.block_count {
            return Err(Error::BadAddress(address));
        }

        Ok(device)
    }

    /// 文件系统头的读写不依赖块大小，偏移总是0
    fn read_header_bytes(&self, buf: &mut [u8]) -> Result<()> {
        Ok(self.device()?.read_block(HEADER_ADDRESS, buf)?)
    }

    fn write_header_bytes(&self, buf: &[u8]) -> Result<()> {
        Ok(self.device()?.write_block(HEADER_ADDRESS, buf)?)
    }
}

/// 已格式化的块存储
#[derive(Default)]
pub struct FormattedStore {
    raw: RawStore,
    /// 常驻的文件系统头，与第0块同步
    header: Mutex<Header>,
}

impl FormattedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 打开设备并同步文件系统头；已格式化时按头中的块大小配置。
    /// 文件系统头读不出来或已损坏时，设备不会保持打开。
    pub fn open(&self, device: Arc<dyn BlockDevice>) -> Result<()> {
        self.raw.open(device, 0)?;
        if let Err(err) = self.load_header() {
            self.close();
            return Err(err);
        }
        log::info!("image opened, formatted: {}", self.is_formatted());

        Ok(())
    }

    pub fn close(&self) {
        self.raw.close();
        *self.header.lock() = Header::default();
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.raw.is_open()
    }

    /// 只检查签名
    pub fn is_formatted(&self) -> bool {
        self.raw.is_open() && self.header.lock().has_signature()
    }

    /// 返回文件系统头的副本，未格式化或版本不符时失败
    pub fn header(&self) -> Result<Header> {
        if !self.raw.is_open() {
            return Err(Error::NotMounted);
        }
        let header = *self.header.lock();
        if !header.has_signature() {
            return Err(Error::NotFormatted);
        }
        if header.version != VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }
        header.validate(self.raw.block_count().unwrap_or(0))?;

        Ok(header)
    }

    /// 写入新的文件系统头，并按其块大小重新配置
    pub fn format(&self, header: Header) -> Result<()> {
        if header.signature != SIGNATURE {
            return Err(Error::InvalidArgument("header signature mismatch".into()));
        }

        let mut bytes = [0; HEADER_SIZE];
        header.encode(&mut bytes);
        self.raw.write_header_bytes(&bytes)?;
        *self.header.lock() = header;
        self.raw.set_block_size(header.block_size)?;
        log::info!("image formatted: {header:?}");

        Ok(())
    }

    /// 从第0块重新读入文件系统头
    pub fn sync_header_from_device(&self) -> Result<()> {
        let mut bytes = [0; HEADER_SIZE];
        self.raw.read_header_bytes(&mut bytes)?;
        *self.header.lock() = Header::decode(&bytes);

        Ok(())
    }

    #[inline]
    pub fn raw(&self) -> &RawStore {
        &self.raw
    }

    #[inline]
    pub fn block_size(&self) -> Result<u64> {
        self.raw.block_size()
    }

    /// 打开某块的句柄，访问模式含读时立即读入
    #[inline]
    pub fn read<K: BlockKind>(
        self: &Arc<Self>,
        address: u64,
        access: BitFlags<Access>,
    ) -> Result<BufferHandle<K>> {
        BufferHandle::open(self.clone(), address, access)
    }

    pub fn read_block(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.ensure_accessible(address)?;
        self.raw.read_block(address, buf)
    }

    pub fn write_block(&self, address: u64, buf: &[u8]) -> Result<()> {
        self.ensure_accessible(address)?;
        self.raw.write_block(address, buf)
    }

    /// 清零`[begin, end]`内的所有块，范围不得包含第0块
    pub fn clear_range(&self, begin: u64, end: u64) -> Result<()> {
        self.ensure_accessible(begin)?;
        self.raw.clear_range(begin, end)
    }
}

impl FormattedStore {
    fn load_header(&self) -> Result<()> {
        self.sync_header_from_device()?;

        let header = *self.header.lock();
        if header.has_signature() {
            self.raw.set_block_size(header.block_size)?;
            if header.version == VERSION {
                self.header()?;
            }
        }

        Ok(())
    }

    fn ensure_accessible(&self, address: u64) -> Result<()> {
        if address == HEADER_ADDRESS {
            return Err(Error::BadAddress(address));
        }
        self.header().map(|_| ())
    }
}
