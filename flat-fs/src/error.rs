use alloc::string::String;

use block_dev::DeviceError;
use thiserror::Error;

use crate::layout::DescriptorKind;

pub type Result<T> = core::result::Result<T, Error>;

/// 错误的大类，决定命令边界如何报告它
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 参数或前置条件错误，调用者可立即修正
    Argument,
    /// 接口调用顺序有误
    State,
    /// 文件系统层面的预期错误，报告给用户
    Domain,
    /// 块设备失败
    Device,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /* 参数错误 */
    #[error("invalid block address {0}")]
    BadAddress(u64),
    #[error("invalid descriptor index {0}")]
    BadDescriptor(u64),
    #[error("`{command}` expects {expected} argument(s), got {given}")]
    ArgumentCount {
        command: &'static str,
        expected: &'static str,
        given: usize,
    },
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("buffer handle is not initialized")]
    InvalidHandle,
    #[error("iterator is not positioned on an entry")]
    InvalidIterator,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /* 状态错误 */
    #[error("no image is mounted")]
    NotMounted,
    #[error("block size is not configured")]
    BlockSizeUnset,
    #[error("cannot resize buffers while {0} of them are in use")]
    BuffersOccupied(usize),
    #[error("image holds {blocks} block(s), too small to format")]
    TooSmall { blocks: u64 },

    /* 文件系统错误 */
    #[error("image is not formatted")]
    NotFormatted,
    #[error("unsupported layout version {0}")]
    UnsupportedVersion(u32),
    #[error("descriptor {index} has kind {found:?}, which is not expected here")]
    KindMismatch {
        index: u64,
        found: Option<DescriptorKind>,
    },
    #[error("directory {0} is not empty")]
    DirectoryNotEmpty(u64),
    #[error("name `{0}` is too long")]
    NameTooLong(String),
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("`{0}` already exists")]
    AlreadyExists(String),
    #[error("`{0}` is not a directory")]
    NotADirectory(String),
    #[error("out of space: no free {0}")]
    OutOfSpace(&'static str),
    #[error("too many levels of symbolic links resolving `{0}`")]
    SymlinkLoop(String),
    #[error("bad file handle {0}")]
    BadFileDescriptor(u64),
    #[error("corrupted image: {0}")]
    Corrupted(&'static str),

    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("failed to write output")]
    Output(#[from] core::fmt::Error),
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BadAddress(_)
            | Self::BadDescriptor(_)
            | Self::ArgumentCount { .. }
            | Self::UnknownCommand(_)
            | Self::InvalidHandle
            | Self::InvalidIterator
            | Self::InvalidArgument(_) => ErrorClass::Argument,
            Self::NotMounted
            | Self::BlockSizeUnset
            | Self::BuffersOccupied(_)
            | Self::TooSmall { .. } => ErrorClass::State,
            Self::Device(_) | Self::Output(_) => ErrorClass::Device,
            _ => ErrorClass::Domain,
        }
    }
}
