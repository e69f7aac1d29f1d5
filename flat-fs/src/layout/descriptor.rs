use alloc::string::String;

use enumflags2::{BitFlags, bitflags};

use crate::config::DESCRIPTOR_SIZE;
use crate::layout::{SegmentEntry, read_u64, write_u64};
use crate::{Error, Result};

/// 描述符中联合体的字节数
pub const PAYLOAD_SIZE: usize = 96;

/// 描述符的种类；空闲的描述符没有种类
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    File = 1,
    SymLink = 2,
    Directory = 4,
}

/// 磁盘上的描述符，相当于 inode
///
/// 字节布局：种类 u8 @0，引用计数 i64 @8，首个溢出块 @16，已用条目数 @24，联合体 @32。
/// 联合体按种类解释：
/// - 文件：大小 u64，随后是数据块地址；
/// - 目录：父目录编号 u64，随后是目录项；
/// - 符号链接：目标路径，未填满时以 NUL 结尾。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: Option<DescriptorKind>,
    pub references: i64,
    /// 溢出块链表的头，0表示没有
    pub next_segment: u64,
    /// 内联数组与溢出块中已用的条目总数
    pub used: u64,
    payload: [u8; PAYLOAD_SIZE],
}

impl Descriptor {
    pub const SIZE: usize = DESCRIPTOR_SIZE as usize;
    /// 内联条目数组在联合体中的起始偏移
    const ENTRIES: usize = 8;

    /// 空闲槽位
    pub fn free() -> Self {
        Self {
            kind: None,
            references: 0,
            next_segment: 0,
            used: 0,
            payload: [0; PAYLOAD_SIZE],
        }
    }

    pub fn file() -> Self {
        Self {
            kind: Some(DescriptorKind::File),
            references: 1,
            ..Self::free()
        }
    }

    pub fn directory(parent: u64) -> Self {
        let mut descriptor = Self {
            kind: Some(DescriptorKind::Directory),
            references: 1,
            ..Self::free()
        };
        descriptor.set_parent(parent);
        descriptor
    }

    pub fn symlink(target: &str) -> Result<Self> {
        if target.is_empty() {
            return Err(Error::InvalidArgument("empty symlink target".into()));
        }
        if target.len() > PAYLOAD_SIZE {
            return Err(Error::NameTooLong(target.into()));
        }

        let mut descriptor = Self {
            kind: Some(DescriptorKind::SymLink),
            references: 1,
            ..Self::free()
        };
        descriptor.payload[..target.len()].copy_from_slice(target.as_bytes());
        Ok(descriptor)
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.kind.is_none()
    }

    /// 种类是否符合期望；期望为全集时连空闲槽位也符合
    pub fn is(&self, expected: BitFlags<DescriptorKind>) -> bool {
        match self.kind {
            Some(kind) => expected.contains(kind),
            None => expected == BitFlags::all(),
        }
    }

    /// 文件大小
    #[inline]
    pub fn size(&self) -> u64 {
        read_u64(&self.payload, 0)
    }

    #[inline]
    pub fn set_size(&mut self, size: u64) {
        write_u64(&mut self.payload, 0, size);
    }

    /// 父目录编号，与文件大小共用同一字段
    #[inline]
    pub fn parent(&self) -> u64 {
        read_u64(&self.payload, 0)
    }

    #[inline]
    pub fn set_parent(&mut self, parent: u64) {
        write_u64(&mut self.payload, 0, parent);
    }

    pub fn symlink_target(&self) -> String {
        let len = self
            .payload
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(PAYLOAD_SIZE);
        String::from_utf8_lossy(&self.payload[..len]).into_owned()
    }

    /// 内联数组的第`slot`个条目
    pub fn inline<E: SegmentEntry>(&self, slot: u64) -> E {
        let offset = Self::ENTRIES + slot as usize * E::SIZE;
        E::decode(&self.payload[offset..offset + E::SIZE])
    }

    pub fn set_inline<E: SegmentEntry>(&mut self, slot: u64, entry: E) {
        let offset = Self::ENTRIES + slot as usize * E::SIZE;
        entry.encode(&mut self.payload[offset..offset + E::SIZE]);
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let kind = match bytes[0] {
            0 => None,
            bits => Some(
                BitFlags::<DescriptorKind>::from_bits(bits)
                    .ok()
                    .and_then(|flags| flags.exactly_one())
                    .ok_or(Error::Corrupted("unknown descriptor kind"))?,
            ),
        };
        let mut payload = [0; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[32..32 + PAYLOAD_SIZE]);

        Ok(Self {
            kind,
            references: read_u64(bytes, 8) as i64,
            next_segment: read_u64(bytes, 16),
            used: read_u64(bytes, 24),
            payload,
        })
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        bytes[..32].fill(0);
        bytes[0] = self.kind.map_or(0, |kind| kind as u8);
        write_u64(bytes, 8, self.references as u64);
        write_u64(bytes, 16, self.next_segment);
        write_u64(bytes, 24, self.used);
        bytes[32..32 + PAYLOAD_SIZE].copy_from_slice(&self.payload);
    }
}

/// 描述符容器块视图
#[derive(Debug)]
pub struct DescriptorBlock<'a> {
    bytes: &'a mut [u8],
}

impl<'a> DescriptorBlock<'a> {
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn slots(&self) -> u64 {
        (self.bytes.len() / Descriptor::SIZE) as u64
    }

    pub fn get(&self, slot: u64) -> Result<Descriptor> {
        Descriptor::decode(self.slot_bytes(slot))
    }

    pub fn set(&mut self, slot: u64, descriptor: &Descriptor) {
        let offset = slot as usize * Descriptor::SIZE;
        descriptor.encode(&mut self.bytes[offset..offset + Descriptor::SIZE]);
    }

    /// 从`from`开始寻找第一个空闲槽位
    pub fn first_free(&self, from: u64) -> Option<u64> {
        (from..self.slots()).find(|&slot| self.slot_bytes(slot)[0] == 0)
    }

    fn slot_bytes(&self, slot: u64) -> &[u8] {
        let offset = slot as usize * Descriptor::SIZE;
        &self.bytes[offset..offset + Descriptor::SIZE]
    }
}
