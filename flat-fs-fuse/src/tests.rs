use std::collections::BTreeSet;
use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;

use block_dev::{BlockDevice, DeviceError};

use super::*;

/// 测试结束时删除的临时镜像
struct TempImage(PathBuf);

impl TempImage {
    fn new(name: &str) -> Self {
        Self(std::env::temp_dir().join(format!("flat-fs-{}-{name}.img", std::process::id())))
    }

    fn path(&self) -> &str {
        self.0.to_str().unwrap()
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn execute(shell: &mut Shell, line: &str) -> String {
    let mut out = String::new();
    assert_eq!(shell.execute_line(line, &mut out), ControlFlow::Continue(()));
    out
}

fn listed(shell: &mut Shell) -> BTreeSet<String> {
    execute(shell, "ls")
        .lines()
        .skip(1)
        .filter_map(|line| line.split('\t').next())
        .filter(|name| !matches!(*name, "." | ".."))
        .map(String::from)
        .collect()
}

#[test]
fn block_file_io() {
    let image = TempImage::new("block-file");
    create_image(&image.0, 4 * 512).unwrap();
    let device = BlockFile::open(&image.0).unwrap();
    assert_eq!(device.capacity(), 2048);

    let block = [0xA5; 512];
    device.write_block(3, &block).unwrap();
    let mut buf = [0; 512];
    device.read_block(3, &mut buf).unwrap();
    assert_eq!(buf, block);

    // 块大小由缓冲区长度决定
    let mut half = [0; 256];
    device.read_block(6, &mut half).unwrap();
    assert_eq!(half, [0xA5; 256]);

    assert_eq!(
        device.read_block(4, &mut buf),
        Err(DeviceError::OutOfRange {
            offset: 2048,
            len: 512
        })
    );
    assert!(device.write_block(u64::MAX, &block).is_err());
    assert_eq!(fs::metadata(&image.0).unwrap().len(), 2048);
}

#[test]
fn shell_session() {
    let image = TempImage::new("session");
    let mut shell = Shell::new();

    let out = execute(&mut shell, &format!("createFile {} {}", image.path(), 64 * 1024));
    assert!(out.starts_with("created"));
    assert!(execute(&mut shell, &format!("mount {}", image.path())).is_empty());
    assert!(execute(&mut shell, "format").starts_with("formatted: 64 blocks of 1024 bytes"));

    for name in ["f0", "f1", "f2"] {
        assert!(execute(&mut shell, &format!("create {name}")).is_empty());
    }
    execute(&mut shell, "unlink f1");
    assert_eq!(listed(&mut shell), BTreeSet::from(["f0".into(), "f2".into()]));

    execute(&mut shell, "mkdir docs");
    execute(&mut shell, "cd docs");
    assert_eq!(execute(&mut shell, "pwd"), "/docs\n");
    assert_eq!(execute(&mut shell, "open ../f0"), "opened file descriptor: 1\n");
    assert_eq!(execute(&mut shell, "write 1 0 kept on disk"), "wrote 12 bytes\n");

    assert_eq!(shell.execute_line("exit", &mut String::new()), ControlFlow::Break(()));

    // 重新挂载后数据仍在
    let mut shell = Shell::new();
    execute(&mut shell, &format!("mount {}", image.path()));
    assert_eq!(execute(&mut shell, "pwd"), "/\n");
    assert_eq!(
        listed(&mut shell),
        BTreeSet::from(["f0".into(), "f2".into(), "docs".into()])
    );
    execute(&mut shell, "open f0");
    assert_eq!(execute(&mut shell, "read 1 0 100"), "kept on disk\n");
}

#[test]
fn errors_keep_the_session_alive() {
    let image = TempImage::new("errors");
    let mut shell = Shell::new();

    assert_eq!(execute(&mut shell, "ls"), "error: no image is mounted\n");
    assert_eq!(execute(&mut shell, "frobnicate"), "error: unknown command `frobnicate`\n");
    assert!(execute(&mut shell, "mount").starts_with("error: `mount` expects"));
    assert!(execute(&mut shell, &format!("mount {}", image.path())).starts_with("error: "));
    assert!(execute(&mut shell, "createFile x big").starts_with("error: invalid argument"));

    execute(&mut shell, &format!("createFile {} {}", image.path(), 8 * 1024));
    execute(&mut shell, &format!("mount {}", image.path()));
    assert_eq!(execute(&mut shell, "ls"), "error: image is not formatted\n");
    execute(&mut shell, "format");
    assert_eq!(execute(&mut shell, "rmdir nothing"), "error: `nothing` not found\n");
    assert_eq!(execute(&mut shell, "close 9"), "error: bad file handle 9\n");

    // 镜像在挂载期间被截短，读写越界属于设备错误
    execute(&mut shell, "create f");
    fs::OpenOptions::new()
        .write(true)
        .open(&image.0)
        .unwrap()
        .set_len(1024)
        .unwrap();
    assert!(execute(&mut shell, "ls").starts_with("unexpected failure: "));

    assert!(execute(&mut shell, "").is_empty());
    assert!(execute(&mut shell, "# comment").is_empty());
    assert!(execute(&mut shell, "help").contains("createFile <image> <size>"));
}
