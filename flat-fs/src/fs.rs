//! # 文件系统层
//!
//! 组合存储、区域与链表算法，对外提供 mount、format、create、mkdir、link、
//! unlink、rmdir、cd、pwd 等操作，以及文件内容的读写。
//!
//! 位图区为描述符区与数据区共用：
//! - 数据区内的位表示该数据块已被占用；
//! - 描述符区内的位表示该容器块已经没有空闲槽位。
//!
//! 两个区域的地址区间不相交，因此两种含义互不干扰。

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp;

use block_dev::BlockDevice;
use enumflags2::BitFlags;

use crate::area::{Area, BitmapArea, DataArea, DescriptorArea};
use crate::buffer::{Access, BufferHandle};
use crate::chain::{self, Capacity, SegmentCursor, SegmentStore};
use crate::config::{
    DESCRIPTOR_SIZE, HEADER_ADDRESS, INVALID_DESCRIPTOR, MAX_SYMLINK_HOPS, MIN_BLOCK_SIZE,
    MIN_BLOCKS,
};
use crate::directory::DirectoryIter;
use crate::layout::{Descriptor, DescriptorKind, DirEntry, Extension, Header};
use crate::path::Path;
use crate::store::FormattedStore;
use crate::{Error, Result};

/// 描述符的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub index: u64,
    pub kind: DescriptorKind,
    pub references: i64,
    /// 文件的字节数，其他种类为0
    pub size: u64,
    /// 已用条目数：目录项数或数据块数
    pub entries: u64,
    /// 是否挂有溢出块
    pub extended: bool,
}

pub struct FileSystem {
    store: Arc<FormattedStore>,
    bitmap: BitmapArea,
    descriptors: DescriptorArea,
    data: DataArea,
    /// 当前目录的描述符编号
    current: u64,
    /// 打开的文件：句柄 -> 描述符编号
    open_files: BTreeMap<u64, u64>,
    next_handle: u64,
}

impl FileSystem {
    pub fn new() -> Self {
        Self::with_store(FormattedStore::new())
    }

    pub fn with_store(store: Arc<FormattedStore>) -> Self {
        Self {
            bitmap: BitmapArea::new(store.clone()),
            descriptors: DescriptorArea::new(store.clone()),
            data: DataArea::new(store.clone()),
            store,
            current: INVALID_DESCRIPTOR,
            open_files: BTreeMap::new(),
            next_handle: 1,
        }
    }

    #[inline]
    pub fn store(&self) -> &Arc<FormattedStore> {
        &self.store
    }

    #[inline]
    pub fn bitmap(&self) -> &BitmapArea {
        &self.bitmap
    }

    #[inline]
    pub fn descriptors(&self) -> &DescriptorArea {
        &self.descriptors
    }

    #[inline]
    pub fn data(&self) -> &DataArea {
        &self.data
    }

    #[inline]
    pub fn header(&self) -> Result<Header> {
        self.store.header()
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.store.is_open()
    }

    /// 当前目录的描述符编号
    #[inline]
    pub fn current_directory(&self) -> u64 {
        self.current
    }

    /// 挂载设备；已格式化时当前目录回到根目录
    pub fn mount(&mut self, device: Arc<dyn BlockDevice>) -> Result<()> {
        self.open_files.clear();
        self.current = INVALID_DESCRIPTOR;
        self.store.open(device)?;
        if let Ok(header) = self.store.header() {
            self.current = header.root;
        }

        Ok(())
    }

    pub fn umount(&mut self) {
        self.open_files.clear();
        self.current = INVALID_DESCRIPTOR;
        self.store.close();
        log::info!("image unmounted");
    }

    /// 按设备容量划分区域并写入空的根目录。
    ///
    /// 位图覆盖所有块地址，描述符区占剩余块的四分之一，其余都是数据区。
    pub fn format(&mut self, block_size: u64) -> Result<Header> {
        if block_size < MIN_BLOCK_SIZE || block_size % DESCRIPTOR_SIZE != 0 {
            return Err(Error::InvalidArgument(alloc::format!(
                "block size {block_size} must be a multiple of {DESCRIPTOR_SIZE} and at least {MIN_BLOCK_SIZE}"
            )));
        }

        let blocks = self.store.raw().capacity()? / block_size;
        if blocks < MIN_BLOCKS {
            return Err(Error::TooSmall { blocks });
        }

        let mut header = Header::new(block_size);
        header.bitmap_begin = 1;
        header.bitmap_end = header.bitmap_begin + blocks / header.bits_per_block();
        let remaining = blocks - header.bitmap_end - 1;
        let descriptor_blocks = remaining / 4 / header.descriptors_per_block();
        header.descriptors_end = header.bitmap_end + 1 + descriptor_blocks;
        header.data_end = blocks - 1;
        if header.data_begin() > header.data_end {
            return Err(Error::TooSmall { blocks });
        }

        self.open_files.clear();
        self.store.format(header)?;
        self.bitmap.init_blocks()?;
        self.descriptors.init_blocks()?;
        self.data.init_blocks()?;

        let root = Descriptor::directory(header.root);
        self.descriptors.update(header.root, &root)?;
        // 小块时根目录可能已占满第一个容器块
        if header.descriptors_per_block() <= header.root + 1 {
            self.bitmap.set(header.descriptors_begin(), true)?;
        }
        self.current = header.root;
        log::info!(
            "formatted {blocks} blocks: bitmap [{}, {}], descriptors [{}, {}], data [{}, {}]",
            header.bitmap_begin,
            header.bitmap_end,
            header.descriptors_begin(),
            header.descriptors_end,
            header.data_begin(),
            header.data_end
        );

        Ok(header)
    }

    /// 创建空文件，返回其描述符编号
    pub fn create(&mut self, path: &str) -> Result<u64> {
        self.create_entry(path, Descriptor::file())
    }

    /// 创建空目录，返回其描述符编号
    pub fn mkdir(&mut self, path: &str) -> Result<u64> {
        let (parent, name) = self.parent_and_name(path)?;
        self.insert(parent, name, Descriptor::directory(parent))
    }

    /// 创建指向`target`的符号链接，目标在创建时不做检查
    pub fn symlink(&mut self, target: &str, path: &str) -> Result<u64> {
        self.create_entry(path, Descriptor::symlink(target)?)
    }

    /// 为已有的文件或符号链接再起一个名字，引用计数加一
    pub fn link(&mut self, source: &str, path: &str) -> Result<()> {
        let target = self.resolve(source, false)?;
        let descriptor = self.descriptors.get(target, BitFlags::all())?;
        if !descriptor.is(DescriptorKind::File | DescriptorKind::SymLink) {
            return Err(Error::KindMismatch {
                index: target,
                found: descriptor.kind,
            });
        }

        let (parent, name) = self.parent_and_name(path)?;
        self.ensure_absent(parent, name)?;
        self.descriptors.increment_reference(target)?;
        if let Err(err) = self.add_entry(parent, target, name) {
            self.descriptors.decrement_reference(target)?;
            return Err(err);
        }
        log::debug!("linked descriptor {target} as `{name}`");

        Ok(())
    }

    /// 删除文件或符号链接的一个名字
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.parent_and_name(path)?;
        self.remove_entry(parent, name, DescriptorKind::File | DescriptorKind::SymLink)
    }

    /// 删除空目录
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.parent_and_name(path)?;
        self.remove_entry(parent, name, DescriptorKind::Directory.into())
    }

    pub fn cd(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path, true)?;
        if !self.descriptors.get(target, BitFlags::all())?.is(DescriptorKind::Directory.into()) {
            return Err(Error::NotADirectory(path.into()));
        }
        self.current = target;

        Ok(())
    }

    /// 从当前目录沿父目录走到根，在每一层父目录中找回子目录的名字
    pub fn pwd(&self) -> Result<String> {
        let header = self.header()?;
        let mut names = Vec::new();
        let mut child = self.current_checked()?;

        while child != header.root {
            let parent = self.directory(child)?.parent();
            let name = self
                .name_in(parent, child)?
                .ok_or(Error::Corrupted("directory is missing from its parent"))?;
            names.push(name);
            if names.len() as u64 > self.descriptor_slots(&header) {
                return Err(Error::Corrupted("parent chain does not reach the root"));
            }
            child = parent;
        }

        if names.is_empty() {
            return Ok(String::from("/"));
        }
        Ok(names.iter().rev().fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(name);
            path
        }))
    }

    /// 列出当前目录，含`.`与`..`
    pub fn list(&self) -> Result<Vec<DirEntry>> {
        self.list_at(self.current_checked()?)
    }

    pub fn list_at(&self, directory: u64) -> Result<Vec<DirEntry>> {
        self.entries(directory, Access::Read.into())?.collect()
    }

    /// 描述符的状态，空闲槽位返回空
    pub fn stat(&self, index: u64) -> Result<Option<Stat>> {
        let descriptor = self.descriptors.get(index, BitFlags::all())?;
        let Some(kind) = descriptor.kind else {
            return Ok(None);
        };

        Ok(Some(Stat {
            index,
            kind,
            references: descriptor.references,
            size: match kind {
                DescriptorKind::File => descriptor.size(),
                _ => 0,
            },
            entries: descriptor.used,
            extended: descriptor.next_segment != HEADER_ADDRESS,
        }))
    }

    /// 解析路径，最后一个分量若是符号链接则跟随
    #[inline]
    pub fn lookup(&self, path: &str) -> Result<u64> {
        self.resolve(path, true)
    }

    /// 打开文件，返回句柄
    pub fn open(&mut self, path: &str) -> Result<u64> {
        let index = self.resolve(path, true)?;
        self.descriptors.get(index, DescriptorKind::File.into())?;

        let handle = self.next_handle;
        self.next_handle += 1;
        self.open_files.insert(handle, index);
        log::debug!("`{path}` opened as handle {handle}");

        Ok(handle)
    }

    pub fn close(&mut self, handle: u64) -> Result<()> {
        self.open_files
            .remove(&handle)
            .map(|_| ())
            .ok_or(Error::BadFileDescriptor(handle))
    }

    pub fn read(&self, handle: u64, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.read_file(self.opened(handle)?, offset, len)
    }

    pub fn write(&mut self, handle: u64, offset: u64, data: &[u8]) -> Result<usize> {
        self.write_file(self.opened(handle)?, offset, data)
    }

    /// 把文件截断或扩展到`size`字节
    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let index = self.resolve(path, true)?;
        self.resize_file(index, size)
    }

    /// 从文件`offset`处最多读`len`字节，越过文件末尾的部分被截掉
    pub fn read_file(&self, index: u64, offset: u64, len: u64) -> Result<Vec<u8>> {
        let header = self.header()?;
        let descriptor = self.descriptors.get(index, DescriptorKind::File.into())?;
        let size = descriptor.size();
        if offset >= size {
            return Ok(Vec::new());
        }

        let end = cmp::min(size, offset.saturating_add(len));
        let mut buf = vec![0; (end - offset) as usize];
        let mut links = self.links(index, descriptor, &header, Access::Read.into());
        let mut position = offset;
        while position < end {
            let within = position % header.block_size;
            let chunk = cmp::min(header.block_size - within, end - position);
            links.seek(position / header.block_size)?;
            let address = links.current()?;

            let from = (position - offset) as usize;
            self.data
                .read_at(address, within as usize, &mut buf[from..from + chunk as usize])?;
            position += chunk;
        }

        Ok(buf)
    }

    /// 把`data`写到文件`offset`处，必要时扩展文件
    pub fn write_file(&mut self, index: u64, offset: u64, data: &[u8]) -> Result<usize> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| Error::InvalidArgument("write past the largest offset".into()))?;
        self.grow_file(index, end)?;

        let header = self.header()?;
        let descriptor = self.descriptors.get(index, DescriptorKind::File.into())?;
        let mut links = self.links(index, descriptor, &header, Access::Read.into());
        let mut position = offset;
        while position < end {
            let within = position % header.block_size;
            let chunk = cmp::min(header.block_size - within, end - position);
            links.seek(position / header.block_size)?;
            let address = links.current()?;

            let from = (position - offset) as usize;
            self.data
                .write_at(address, within as usize, &data[from..from + chunk as usize])?;
            position += chunk;
        }

        Ok(data.len())
    }

    pub fn resize_file(&mut self, index: u64, size: u64) -> Result<()> {
        let descriptor = self.descriptors.get(index, DescriptorKind::File.into())?;
        if size >= descriptor.size() {
            self.grow_file(index, size)
        } else {
            self.shrink_file(index, size)
        }
    }
}

impl FileSystem {
    fn current_checked(&self) -> Result<u64> {
        self.header()?;
        match self.current {
            INVALID_DESCRIPTOR => Err(Error::NotFormatted),
            current => Ok(current),
        }
    }

    fn opened(&self, handle: u64) -> Result<u64> {
        self.open_files
            .get(&handle)
            .copied()
            .ok_or(Error::BadFileDescriptor(handle))
    }

    fn descriptor_slots(&self, header: &Header) -> u64 {
        (header.descriptors_end - header.descriptors_begin() + 1) * header.descriptors_per_block()
    }

    fn directory(&self, index: u64) -> Result<Descriptor> {
        self.descriptors
            .get(index, DescriptorKind::Directory.into())
    }

    fn entries(&self, directory: u64, access: BitFlags<Access>) -> Result<DirectoryIter<'_, Self>> {
        let header = self.header()?;
        let descriptor = self.directory(directory)?;
        Ok(DirectoryIter::new(
            self,
            directory,
            descriptor,
            Capacity::of::<DirEntry>(&header),
            access,
        ))
    }

    fn links(
        &self,
        index: u64,
        descriptor: Descriptor,
        header: &Header,
        access: BitFlags<Access>,
    ) -> SegmentCursor<'_, u64, Self> {
        SegmentCursor::new(self, index, descriptor, Capacity::of::<u64>(header), access)
    }

    /// 在目录中按名字查找，`.`与`..`也能找到
    fn find(&self, directory: u64, name: &str) -> Result<Option<u64>> {
        for entry in self.entries(directory, Access::Read.into())? {
            let entry = entry?;
            if entry.name_is(name) {
                return Ok(Some(entry.descriptor));
            }
        }

        Ok(None)
    }

    /// 在目录中找回指向`child`的目录项名字
    fn name_in(&self, directory: u64, child: u64) -> Result<Option<String>> {
        let mut entries = self.entries(directory, Access::Read.into())?;
        while let Some(entry) = entries.next() {
            let entry = entry?;
            if !entries.is_synthetic() && entry.descriptor == child {
                return Ok(Some(entry.name().into_owned()));
            }
        }

        Ok(None)
    }

    fn ensure_absent(&self, directory: u64, name: &str) -> Result<()> {
        match self.find(directory, name)? {
            Some(_) => Err(Error::AlreadyExists(name.into())),
            None => Ok(()),
        }
    }

    fn resolve(&self, path: &str, follow_last: bool) -> Result<u64> {
        let current = self.current_checked()?;
        let mut hops = 0;
        self.walk(current, path, follow_last, &mut hops)
    }

    /// 从`start`出发逐个分量解析路径，符号链接相对其所在目录展开
    fn walk(&self, start: u64, path: &str, follow_last: bool, hops: &mut usize) -> Result<u64> {
        let parsed = Path::parse(path);
        let mut at = if parsed.absolute {
            self.header()?.root
        } else {
            start
        };

        let last = parsed.components.len().saturating_sub(1);
        for (i, name) in parsed.components.iter().enumerate() {
            DirEntry::check_name(name)?;
            if !self.descriptors.get(at, BitFlags::all())?.is(DescriptorKind::Directory.into()) {
                return Err(Error::NotADirectory(path.into()));
            }

            let target = self
                .find(at, name)?
                .ok_or_else(|| Error::NotFound((*name).into()))?;
            let descriptor = self.descriptors.get(target, BitFlags::all())?;
            at = if descriptor.kind == Some(DescriptorKind::SymLink) && (i < last || follow_last) {
                *hops += 1;
                if *hops > MAX_SYMLINK_HOPS {
                    return Err(Error::SymlinkLoop(path.into()));
                }
                self.walk(at, &descriptor.symlink_target(), true, hops)?
            } else {
                target
            };
        }

        Ok(at)
    }

    /// 路径的父目录编号与最后一个分量
    fn parent_and_name<'p>(&self, path: &'p str) -> Result<(u64, &'p str)> {
        let parsed = Path::parse(path);
        let (name, rest) = parsed
            .split_last()
            .ok_or_else(|| Error::InvalidArgument(alloc::format!("`{path}` names no entry")))?;
        DirEntry::check_name(name)?;

        let current = self.current_checked()?;
        let mut parent = if parsed.absolute {
            self.header()?.root
        } else {
            current
        };
        let mut hops = 0;
        for component in rest {
            parent = self.walk(parent, component, true, &mut hops)?;
        }
        match self.directory(parent) {
            Err(Error::KindMismatch { .. }) => return Err(Error::NotADirectory(path.into())),
            other => other?,
        };

        Ok((parent, name))
    }

    fn create_entry(&mut self, path: &str, descriptor: Descriptor) -> Result<u64> {
        let (parent, name) = self.parent_and_name(path)?;
        self.insert(parent, name, descriptor)
    }

    /// 分配描述符并挂进目录，挂入失败时回收描述符
    fn insert(&mut self, parent: u64, name: &str, descriptor: Descriptor) -> Result<u64> {
        self.ensure_absent(parent, name)?;
        let index = self.allocate_descriptor(&descriptor)?;
        if let Err(err) = self.add_entry(parent, index, name) {
            if let Err(release_err) = self.release(index) {
                log::error!("failed to release descriptor {index}: {release_err}");
            }
            return Err(err);
        }
        log::debug!("`{name}` created as descriptor {index} in {parent}");

        Ok(index)
    }

    fn add_entry(&self, directory: u64, target: u64, name: &str) -> Result<()> {
        let header = self.header()?;
        let descriptor = self.directory(directory)?;
        chain::append(
            self,
            directory,
            descriptor,
            Capacity::of::<DirEntry>(&header),
            DirEntry::new(target, name)?,
        )
        .map(|_| ())
    }

    /// 删除目录项并减少目标的引用计数，计数归零时回收目标
    fn remove_entry(
        &mut self,
        directory: u64,
        name: &str,
        expected: BitFlags<DescriptorKind>,
    ) -> Result<()> {
        let mut entries = self.entries(directory, Access::Read | Access::Write)?;
        while let Some(entry) = entries.next() {
            let entry = entry?;
            if !entry.name_is(name) {
                continue;
            }
            if entries.is_synthetic() {
                return Err(Error::InvalidArgument(alloc::format!(
                    "cannot remove `{name}`"
                )));
            }

            if entry.descriptor == self.current {
                return Err(Error::InvalidArgument(alloc::format!(
                    "`{name}` is the current directory"
                )));
            }
            let target = self.descriptors.get(entry.descriptor, BitFlags::all())?;
            if !target.is(expected) {
                return Err(Error::KindMismatch {
                    index: entry.descriptor,
                    found: target.kind,
                });
            }
            let references = self.descriptors.decrement_reference(entry.descriptor)?;
            if let Err(err) = entries.remove() {
                self.descriptors.increment_reference(entry.descriptor)?;
                return Err(err);
            }
            log::debug!("`{name}` removed from {directory}, {references} reference(s) left");

            if references <= 0 {
                self.release(entry.descriptor)?;
            }
            return Ok(());
        }

        Err(Error::NotFound(name.into()))
    }

    /// 首次适配：在位图中找到第一个未满的描述符容器块
    fn allocate_descriptor(&self, descriptor: &Descriptor) -> Result<u64> {
        let header = self.header()?;
        let block = self
            .bitmap
            .find_first_free(header.descriptors_begin(), header.descriptors_end)?;
        if block == HEADER_ADDRESS {
            return Err(Error::OutOfSpace("descriptors"));
        }

        let (index, filled) = self.descriptors.append(block, descriptor)?;
        if filled {
            self.bitmap.set(block, true)?;
        }

        Ok(index)
    }

    /// 回收描述符：释放数据块与溢出块，清空槽位，所在容器块重新可用
    fn release(&mut self, index: u64) -> Result<()> {
        let header = self.header()?;
        let descriptor = self.descriptors.get(index, BitFlags::all())?;

        if descriptor.kind == Some(DescriptorKind::File) {
            let mut links = self.links(index, descriptor.clone(), &header, Access::Read.into());
            while links.has_next() {
                links.advance()?;
                let address = links.current()?;
                self.free_block(address)?;
            }
        }

        let mut next = descriptor.next_segment;
        while next != HEADER_ADDRESS {
            let mut handle = self.read_overflow(next, Access::Read.into())?;
            let following = handle.block()?.next();
            handle.discard();
            self.free_block(next)?;
            next = following;
        }

        self.descriptors.update(index, &Descriptor::free())?;
        self.bitmap.set(self.descriptors.block_of(index)?, false)?;
        self.open_files.retain(|_, opened| *opened != index);
        log::debug!("descriptor {index} released");

        Ok(())
    }

    /// 扩展文件到`size`字节；中途失败时弹出这次追加的所有数据块
    fn grow_file(&mut self, index: u64, size: u64) -> Result<()> {
        let header = self.header()?;
        let mut descriptor = self.descriptors.get(index, DescriptorKind::File.into())?;
        let needed = size.div_ceil(header.block_size);
        let kept = descriptor.used;

        while descriptor.used < needed {
            descriptor = match self.append_block(index, descriptor, &header) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    if let Err(rollback_err) = self.pop_blocks(index, kept) {
                        log::error!("failed to roll back descriptor {index}: {rollback_err}");
                    }
                    return Err(err);
                }
            };
        }

        if size > descriptor.size() {
            descriptor.set_size(size);
            self.descriptors.update(index, &descriptor)?;
        }

        Ok(())
    }

    fn shrink_file(&mut self, index: u64, size: u64) -> Result<()> {
        let header = self.header()?;
        let keep = size.div_ceil(header.block_size);
        let mut descriptor = self.pop_blocks(index, keep)?;

        // 保持“文件末尾之后的字节为0”，之后扩展文件时无需清理
        let within = size % header.block_size;
        if within != 0 {
            let mut links = self.links(index, descriptor.clone(), &header, Access::Read.into());
            links.seek(keep - 1)?;
            let address = links.current()?;
            let zeros = vec![0; (header.block_size - within) as usize];
            self.data.write_at(address, within as usize, &zeros)?;
        }

        descriptor.set_size(size);
        self.descriptors.update(index, &descriptor)
    }

    /// 分配一个清零的数据块并追加到文件末尾，追加失败时归还该块
    fn append_block(&self, index: u64, descriptor: Descriptor, header: &Header) -> Result<Descriptor> {
        let address = self.allocate_block()?;
        let appended = self.data.clear(address).and_then(|()| {
            chain::append(self, index, descriptor, Capacity::of::<u64>(header), address)
        });
        if appended.is_err() {
            if let Err(free_err) = self.free_block(address) {
                log::error!("failed to release data block {address}: {free_err}");
            }
        }

        appended
    }

    /// 从文件末尾逐个弹出并释放数据块，直到只剩`keep`块
    fn pop_blocks(&self, index: u64, keep: u64) -> Result<Descriptor> {
        let header = self.header()?;
        let mut descriptor = self.descriptors.get(index, DescriptorKind::File.into())?;

        while descriptor.used > keep {
            let mut links = self.links(index, descriptor, &header, Access::Read | Access::Write);
            links.to_last()?;
            let address = links.current()?;
            descriptor = chain::remove(links)?;
            self.free_block(address)?;
        }

        Ok(descriptor)
    }
}

impl SegmentStore for FileSystem {
    fn allocate_block(&self) -> Result<u64> {
        let header = self.header()?;
        let address = self
            .bitmap
            .find_first_free(header.data_begin(), header.data_end)?;
        if address == HEADER_ADDRESS {
            return Err(Error::OutOfSpace("data blocks"));
        }

        self.bitmap.set(address, true)?;
        log::trace!("data block {address} allocated");
        Ok(address)
    }

    fn free_block(&self, address: u64) -> Result<()> {
        if !self.data.contains(address)? {
            return Err(Error::BadAddress(address));
        }
        self.bitmap.set(address, false)?;
        log::trace!("data block {address} freed");
        Ok(())
    }

    fn read_overflow(
        &self,
        address: u64,
        access: BitFlags<Access>,
    ) -> Result<BufferHandle<Extension>> {
        self.data.read(address, access)
    }

    fn write_descriptor(&self, index: u64, descriptor: &Descriptor) -> Result<()> {
        self.descriptors.update(index, descriptor)
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}
