//! # 宿主机侧工具
//!
//! 把宿主机上的扁平二进制文件当作块设备，并提供交互式的命令行外壳。

#[cfg(test)]
mod tests;

pub mod shell;

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError};

pub use self::shell::{Shell, ShellError};

/// 以宿主机文件为介质的块设备
#[derive(Debug)]
pub struct BlockFile(Mutex<File>);

impl BlockFile {
    pub fn new(file: File) -> Self {
        Self(Mutex::new(file))
    }

    /// 以读写方式打开已存在的镜像
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(file))
    }

    /// 定位到第`block_id`块并执行`op`，越界与I/O失败都报告为设备错误
    fn access<T>(
        &self,
        block_id: u64,
        len: usize,
        op: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> Result<T, DeviceError> {
        let mut file = self.0.lock().map_err(|_| DeviceError::Io)?;
        let offset = block_id.saturating_mul(len as u64);
        let size = file.metadata().map_err(io_failure)?.len();
        let end = block_id
            .checked_mul(len as u64)
            .and_then(|offset| offset.checked_add(len as u64));
        if end.is_none_or(|end| end > size) {
            return Err(DeviceError::OutOfRange { offset, len });
        }

        file.seek(SeekFrom::Start(offset)).map_err(io_failure)?;
        op(&mut file).map_err(io_failure)
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.access(block_id, buf.len(), |file| file.read_exact(buf))
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<(), DeviceError> {
        self.access(block_id, buf.len(), |file| file.write_all(buf))
    }

    fn capacity(&self) -> u64 {
        self.0
            .lock()
            .ok()
            .and_then(|file| file.metadata().ok())
            .map_or(0, |metadata| metadata.len())
    }
}

fn io_failure(err: io::Error) -> DeviceError {
    log::error!("image I/O failed: {err}");
    DeviceError::Io
}

/// 创建`size`字节、内容全为0的镜像，已存在的文件会被覆盖
pub fn create_image(path: impl AsRef<Path>, size: u64) -> io::Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(size)?;

    Ok(())
}
