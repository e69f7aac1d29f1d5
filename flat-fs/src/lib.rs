//! # flat-fs
//!
//! 存放在单个扁平二进制文件中的小型文件系统，自底向上分为：
//!
//! - 存储层：[`RawStore`] 按块读写设备，[`FormattedStore`] 守护第0块的文件系统头；
//! - 缓冲层：[`BufferPool`] 复用定长缓冲区，[`BufferHandle`] 为块提供带类型的视图，
//!   析构时按访问模式写回；
//! - 布局层：文件系统头、描述符、目录项、扩展块的字节级编解码；
//! - 区域层：位图区、描述符区、数据区；
//! - 链表算法：描述符内联数组加溢出块链表上的追加、交换删除与遍历；
//! - 文件系统：组合以上各层，实现 mount、format、create、mkdir 等操作。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod area;
pub mod buffer;
pub mod chain;
pub mod command;
pub mod config;
pub mod directory;
mod error;
pub mod fs;
pub mod layout;
pub mod path;
pub mod store;

pub use self::{
    buffer::{Access, BufferHandle, BufferPool},
    command::Command,
    error::{Error, ErrorClass, Result},
    fs::{FileSystem, Stat},
    store::{FormattedStore, RawStore},
};
pub use block_dev::{BlockDevice, DeviceError};
