use alloc::borrow::Cow;
use alloc::string::String;

use crate::config::MAX_FILENAME;
use crate::layout::{Header, SegmentEntry, read_u64, write_u64};
use crate::{Error, Result};

/// 目录项：目标描述符编号加定长名字。
/// 名字恰好填满时没有结尾的 NUL；名字首字节为0表示空目录项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub descriptor: u64,
    name: [u8; MAX_FILENAME],
}

impl DirEntry {
    pub fn new(descriptor: u64, name: &str) -> Result<Self> {
        Self::check_name(name)?;

        let mut bytes = [0; MAX_FILENAME];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            descriptor,
            name: bytes,
        })
    }

    /// 空目录项
    pub const fn empty() -> Self {
        Self {
            descriptor: 0,
            name: [0; MAX_FILENAME],
        }
    }

    /// 指向自身的`.`
    pub(crate) const fn dot(descriptor: u64) -> Self {
        let mut name = [0; MAX_FILENAME];
        name[0] = b'.';
        Self { descriptor, name }
    }

    /// 指向父目录的`..`
    pub(crate) const fn dot_dot(descriptor: u64) -> Self {
        let mut name = [0; MAX_FILENAME];
        name[0] = b'.';
        name[1] = b'.';
        Self { descriptor, name }
    }

    /// 名字不能为空，不能含`/`或 NUL，长度不超过 [`MAX_FILENAME`]
    pub fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\0']) {
            return Err(Error::InvalidArgument(alloc::format!(
                "`{name}` is not a valid name"
            )));
        }
        if name.len() > MAX_FILENAME {
            return Err(Error::NameTooLong(String::from(name)));
        }

        Ok(())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name(&self) -> Cow<'_, str> {
        let len = self
            .name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(MAX_FILENAME);
        String::from_utf8_lossy(&self.name[..len])
    }

    #[inline]
    pub fn name_is(&self, name: &str) -> bool {
        self.name() == name
    }
}

impl SegmentEntry for DirEntry {
    const SIZE: usize = 8 + MAX_FILENAME;

    fn decode(bytes: &[u8]) -> Self {
        let mut name = [0; MAX_FILENAME];
        name.copy_from_slice(&bytes[8..Self::SIZE]);
        Self {
            descriptor: read_u64(bytes, 0),
            name,
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        write_u64(bytes, 0, self.descriptor);
        bytes[8..Self::SIZE].copy_from_slice(&self.name);
    }

    #[inline]
    fn inline_capacity(header: &Header) -> u64 {
        header.entries_in_descriptor
    }

    #[inline]
    fn block_capacity(header: &Header) -> u64 {
        header.entries_in_block
    }
}
