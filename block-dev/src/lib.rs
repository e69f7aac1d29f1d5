//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、U盘，
//! 或者宿主机上的一个扁平二进制文件；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 块的大小由调用者决定：每次读写的块大小即缓冲区的长度，
//! 因此第`block_id`块位于字节偏移`block_id * buf.len()`处，
//! 第0块总是位于偏移0。

#![no_std]

use core::any::Any;
use core::fmt;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 以`buf.len()`为块大小，读取第`block_id`块
    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 以`buf.len()`为块大小，写入第`block_id`块
    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<(), DeviceError>;

    /// 设备容量，单位为字节
    fn capacity(&self) -> u64;
}

/// 块设备驱动报告的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 访问越过了设备末尾
    OutOfRange { offset: u64, len: usize },
    /// 底层读写失败
    Io,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { offset, len } => {
                write!(f, "access of {len} bytes at offset {offset} is out of range")
            }
            Self::Io => f.write_str("device I/O failure"),
        }
    }
}

impl core::error::Error for DeviceError {}
