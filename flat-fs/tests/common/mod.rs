//! 测试共用的内存块设备

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use flat_fs::{BlockDevice, DeviceError, FileSystem};

/// 内存中的扁平镜像，克隆后共享同一份数据
#[derive(Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl RamDisk {
    pub fn new(bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vec![0; bytes])),
        }
    }

    pub fn with_blocks(blocks: usize, block_size: usize) -> Self {
        Self::new(blocks * block_size)
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let data = self.inner.lock().unwrap();
        let start = block_id as usize * buf.len();
        let end = start + buf.len();
        if end > data.len() {
            return Err(DeviceError::OutOfRange {
                offset: start as u64,
                len: buf.len(),
            });
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let mut data = self.inner.lock().unwrap();
        let start = block_id as usize * buf.len();
        let end = start + buf.len();
        if end > data.len() {
            return Err(DeviceError::OutOfRange {
                offset: start as u64,
                len: buf.len(),
            });
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn capacity(&self) -> u64 {
        self.inner.lock().unwrap().len() as u64
    }
}

/// 挂载并以1024字节的块格式化一块`blocks`块大的内存盘
pub fn formatted(blocks: usize) -> (FileSystem, RamDisk) {
    let disk = RamDisk::with_blocks(blocks, 1024);
    let mut fs = FileSystem::new();
    fs.mount(Arc::new(disk.clone())).unwrap();
    fs.format(1024).unwrap();
    (fs, disk)
}

/// 当前目录中除`.`与`..`外的名字，已排序
pub fn names(fs: &FileSystem) -> Vec<String> {
    let mut names: Vec<String> = fs
        .list()
        .unwrap()
        .iter()
        .map(|entry| entry.name().into_owned())
        .filter(|name| name != "." && name != "..")
        .collect();
    names.sort();
    names
}
