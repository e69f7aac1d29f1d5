mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::RamDisk;
use flat_fs::area::Area;
use flat_fs::layout::DescriptorKind;
use flat_fs::{Error, ErrorClass, FileSystem};

fn used_data_blocks(fs: &FileSystem) -> usize {
    let (begin, end) = (fs.data().begin().unwrap(), fs.data().end().unwrap());
    (begin..=end)
        .filter(|&address| fs.bitmap().get(address).unwrap())
        .count()
}

#[test]
fn create_list_and_unlink() {
    let (mut fs, _) = common::formatted(4);
    let root = fs.stat(1).unwrap().unwrap();
    assert_eq!(root.kind, DescriptorKind::Directory);
    assert_eq!(root.entries, 0);

    let listed: Vec<String> = fs
        .list()
        .unwrap()
        .iter()
        .map(|entry| entry.name().into_owned())
        .collect();
    assert_eq!(listed, [".", ".."]);

    for name in ["f0", "f1", "f2"] {
        fs.create(name).unwrap();
    }
    assert_eq!(common::names(&fs), ["f0", "f1", "f2"]);

    fs.unlink("f1").unwrap();
    let listed: BTreeSet<String> = common::names(&fs).into_iter().collect();
    assert_eq!(listed, BTreeSet::from(["f0".into(), "f2".into()]));
}

#[test]
fn descriptors_run_out() {
    // 4块的镜像只有一个描述符容器块：8个槽位，去掉哨兵和根目录还剩6个
    let (mut fs, _) = common::formatted(4);
    for i in 0..6 {
        fs.create(&format!("f{i}")).unwrap();
    }
    assert!(matches!(
        fs.create("f6"),
        Err(Error::OutOfSpace("descriptors"))
    ));
    assert_eq!(common::names(&fs).len(), 6);

    // 回收后槽位可以复用
    let reused = fs.lookup("f3").unwrap();
    fs.unlink("f3").unwrap();
    assert!(fs.stat(reused).unwrap().is_none());
    assert_eq!(fs.create("f6").unwrap(), reused);
}

#[test]
fn data_blocks_run_out() {
    // 4块的镜像只有一个数据块
    let (mut fs, _) = common::formatted(4);
    let header = fs.header().unwrap();
    assert_eq!(header.data_begin(), header.data_end);

    fs.create("f0").unwrap();
    let handle = fs.open("f0").unwrap();
    fs.write(handle, 0, b"x").unwrap();

    fs.create("f1").unwrap();
    let handle = fs.open("f1").unwrap();
    assert!(matches!(
        fs.write(handle, 0, b"y"),
        Err(Error::OutOfSpace("data blocks"))
    ));
    assert_eq!(fs.stat(fs.lookup("f1").unwrap()).unwrap().unwrap().size, 0);
}

#[test]
fn file_fills_the_data_area_exactly() {
    // 64块：数据区60块，59个数据块加1个溢出块
    let (mut fs, _) = common::formatted(64);
    assert_eq!(
        fs.data().end().unwrap() - fs.data().begin().unwrap() + 1,
        60
    );

    fs.create("big").unwrap();
    let handle = fs.open("big").unwrap();
    let content: Vec<u8> = (0..59 * 1024).map(|i| (i % 251) as u8).collect();
    assert_eq!(fs.write(handle, 0, &content).unwrap(), content.len());
    assert_eq!(used_data_blocks(&fs), 60);

    assert!(matches!(
        fs.write(handle, content.len() as u64, b"!"),
        Err(Error::OutOfSpace("data blocks"))
    ));
    assert_eq!(used_data_blocks(&fs), 60);
    assert_eq!(
        fs.read(handle, 0, u64::MAX).unwrap(),
        content,
        "content survives the failed write"
    );

    fs.truncate("big", 0).unwrap();
    assert_eq!(used_data_blocks(&fs), 0);
    let stat = fs.stat(fs.lookup("big").unwrap()).unwrap().unwrap();
    assert_eq!((stat.size, stat.entries, stat.extended), (0, 0, false));
}

#[test]
fn read_write_and_truncate() {
    let (mut fs, _) = common::formatted(64);
    fs.create("notes").unwrap();
    let handle = fs.open("notes").unwrap();

    fs.write(handle, 0, b"hello").unwrap();
    assert_eq!(fs.read(handle, 0, 100).unwrap(), b"hello");
    assert_eq!(fs.read(handle, 1, 3).unwrap(), b"ell");
    assert!(fs.read(handle, 5, 10).unwrap().is_empty());

    // 跨越块边界并留下空洞
    fs.write(handle, 1020, b"boundary").unwrap();
    let bytes = fs.read(handle, 0, 2000).unwrap();
    assert_eq!(bytes.len(), 1028);
    assert_eq!(&bytes[..5], b"hello");
    assert!(bytes[5..1020].iter().all(|&byte| byte == 0));
    assert_eq!(&bytes[1020..], b"boundary");

    fs.truncate("notes", 2).unwrap();
    assert_eq!(fs.read(handle, 0, 100).unwrap(), b"he");
    fs.truncate("notes", 8).unwrap();
    assert_eq!(fs.read(handle, 0, 100).unwrap(), b"he\0\0\0\0\0\0");
    assert_eq!(used_data_blocks(&fs), 1);
}

#[test]
fn large_file_uses_overflow_links() {
    let (mut fs, _) = common::formatted(64);
    fs.create("big").unwrap();
    let handle = fs.open("big").unwrap();

    let content: Vec<u8> = (0..20 * 1024 + 17).map(|i| (i * 7 % 256) as u8).collect();
    fs.write(handle, 0, &content).unwrap();
    let stat = fs.stat(fs.lookup("big").unwrap()).unwrap().unwrap();
    assert_eq!(stat.size, content.len() as u64);
    assert_eq!(stat.entries, 21);
    assert!(stat.extended);
    assert_eq!(used_data_blocks(&fs), 22);
    assert_eq!(fs.read(handle, 0, u64::MAX).unwrap(), content);

    // 缩回内联范围后溢出块被释放
    fs.truncate("big", 5 * 1024).unwrap();
    let stat = fs.stat(fs.lookup("big").unwrap()).unwrap().unwrap();
    assert_eq!(stat.entries, 5);
    assert!(!stat.extended);
    assert_eq!(used_data_blocks(&fs), 5);
    assert_eq!(fs.read(handle, 0, u64::MAX).unwrap(), &content[..5 * 1024]);

    fs.close(handle).unwrap();
    fs.unlink("big").unwrap();
    assert_eq!(used_data_blocks(&fs), 0);
}

#[test]
fn handles() {
    let (mut fs, _) = common::formatted(16);
    fs.create("f").unwrap();
    fs.mkdir("d").unwrap();

    assert!(matches!(fs.open("d"), Err(Error::KindMismatch { .. })));
    assert!(matches!(fs.open("missing"), Err(Error::NotFound(_))));

    let first = fs.open("f").unwrap();
    let second = fs.open("f").unwrap();
    assert_ne!(first, second);
    fs.close(first).unwrap();
    assert!(matches!(fs.close(first), Err(Error::BadFileDescriptor(_))));
    assert!(matches!(fs.read(first, 0, 1), Err(Error::BadFileDescriptor(_))));

    // 最后一个名字消失后句柄随之失效
    fs.unlink("f").unwrap();
    assert!(matches!(fs.read(second, 0, 1), Err(Error::BadFileDescriptor(_))));
}

#[test]
fn directories_and_working_path() {
    let (mut fs, _) = common::formatted(64);
    assert_eq!(fs.pwd().unwrap(), "/");

    fs.mkdir("a").unwrap();
    fs.cd("a").unwrap();
    fs.mkdir("b").unwrap();
    fs.cd("b").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/a/b");

    fs.cd("..").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/a");
    fs.cd("/").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/");
    fs.cd("a/b").unwrap();
    fs.cd("../..").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/");
    fs.cd("/a/./b").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/a/b");

    // 根目录的父目录是它自己
    fs.cd("/..").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/");

    fs.create("a/file").unwrap();
    assert!(matches!(fs.cd("a/file"), Err(Error::NotADirectory(_))));
    assert!(matches!(fs.cd("nowhere"), Err(Error::NotFound(_))));
    assert!(matches!(fs.cd("a/file/x"), Err(Error::NotADirectory(_))));
}

#[test]
fn rmdir_rules() {
    let (mut fs, _) = common::formatted(64);
    let a = fs.mkdir("a").unwrap();
    fs.create("a/f").unwrap();
    fs.create("g").unwrap();

    assert!(matches!(fs.rmdir("a"), Err(Error::DirectoryNotEmpty(index)) if index == a));
    assert!(matches!(fs.rmdir("g"), Err(Error::KindMismatch { .. })));
    assert!(matches!(fs.unlink("a"), Err(Error::KindMismatch { .. })));
    assert!(matches!(fs.rmdir("."), Err(Error::InvalidArgument(_))));
    assert!(matches!(fs.rmdir("missing"), Err(Error::NotFound(_))));

    // 不能删除当前目录
    fs.cd("a").unwrap();
    fs.unlink("f").unwrap();
    assert!(matches!(fs.rmdir("../a"), Err(Error::InvalidArgument(_))));
    fs.cd("..").unwrap();

    fs.rmdir("a").unwrap();
    assert!(fs.stat(a).unwrap().is_none());
    assert_eq!(common::names(&fs), ["g"]);
}

#[test]
fn names_are_checked() {
    let (mut fs, _) = common::formatted(16);
    assert!(matches!(
        fs.create("fifteen-chars!!"),
        Err(Error::NameTooLong(_))
    ));
    fs.create("fourteen-chars").unwrap();
    assert!(matches!(
        fs.create("fourteen-chars"),
        Err(Error::AlreadyExists(_))
    ));
    assert!(matches!(fs.mkdir("."), Err(Error::AlreadyExists(_))));
    assert!(matches!(fs.create("/"), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        fs.cd("fifteen-chars!!"),
        Err(Error::NameTooLong(_))
    ));
}

#[test]
fn hard_links_share_a_descriptor() {
    let (mut fs, _) = common::formatted(16);
    let file = fs.create("f").unwrap();
    fs.mkdir("d").unwrap();
    fs.link("f", "d/g").unwrap();
    assert_eq!(fs.lookup("d/g").unwrap(), file);
    assert_eq!(fs.stat(file).unwrap().unwrap().references, 2);

    assert!(matches!(fs.link("d", "e"), Err(Error::KindMismatch { .. })));
    assert!(matches!(fs.link("f", "d/g"), Err(Error::AlreadyExists(_))));

    fs.unlink("f").unwrap();
    assert_eq!(fs.stat(file).unwrap().unwrap().references, 1);
    fs.unlink("d/g").unwrap();
    assert!(fs.stat(file).unwrap().is_none());
}

#[test]
fn symlinks_are_followed() {
    let (mut fs, _) = common::formatted(16);
    fs.mkdir("d").unwrap();
    fs.create("d/f").unwrap();
    fs.symlink("d", "ld").unwrap();
    fs.symlink("/d/f", "lf").unwrap();

    fs.cd("ld").unwrap();
    assert_eq!(fs.pwd().unwrap(), "/d");
    fs.cd("/").unwrap();
    assert_eq!(fs.lookup("lf").unwrap(), fs.lookup("d/f").unwrap());
    assert_eq!(fs.lookup("ld/f").unwrap(), fs.lookup("d/f").unwrap());

    let handle = fs.open("lf").unwrap();
    fs.write(handle, 0, b"via link").unwrap();
    assert_eq!(fs.read_file(fs.lookup("d/f").unwrap(), 0, 64).unwrap(), b"via link");

    fs.symlink("b", "a").unwrap();
    fs.symlink("a", "b").unwrap();
    assert!(matches!(fs.cd("a"), Err(Error::SymlinkLoop(_))));

    // 删除的是链接本身
    fs.unlink("lf").unwrap();
    assert!(fs.lookup("d/f").is_ok());
}

#[test]
fn image_survives_remount() {
    let (mut fs, disk) = common::formatted(64);
    fs.mkdir("docs").unwrap();
    fs.create("docs/readme").unwrap();
    let handle = fs.open("docs/readme").unwrap();
    fs.write(handle, 0, b"persisted").unwrap();
    fs.umount();
    assert!(matches!(fs.list(), Err(Error::NotMounted)));

    let mut fs = FileSystem::new();
    fs.mount(Arc::new(disk)).unwrap();
    assert_eq!(fs.pwd().unwrap(), "/");
    assert_eq!(common::names(&fs), ["docs"]);
    let handle = fs.open("docs/readme").unwrap();
    assert_eq!(fs.read(handle, 0, 64).unwrap(), b"persisted");
}

#[test]
fn unformatted_and_tiny_images() {
    let mut fs = FileSystem::new();
    assert!(matches!(fs.format(1024), Err(Error::NotMounted)));

    fs.mount(Arc::new(RamDisk::with_blocks(8, 1024))).unwrap();
    let err = fs.create("f").unwrap_err();
    assert!(matches!(err, Error::NotFormatted));
    assert_eq!(err.class(), ErrorClass::Domain);
    assert!(matches!(fs.format(100), Err(Error::InvalidArgument(_))));
    fs.format(1024).unwrap();
    fs.create("f").unwrap();

    let mut tiny = FileSystem::new();
    tiny.mount(Arc::new(RamDisk::with_blocks(3, 1024))).unwrap();
    let err = tiny.format(1024).unwrap_err();
    assert!(matches!(err, Error::TooSmall { blocks: 3 }));
    assert_eq!(err.class(), ErrorClass::State);
}

#[test]
fn reformat_starts_over() {
    let (mut fs, _) = common::formatted(64);
    fs.create("old").unwrap();
    fs.format(512).unwrap();
    assert_eq!(fs.header().unwrap().block_size, 512);
    assert!(common::names(&fs).is_empty());
    fs.create("new").unwrap();
    assert_eq!(common::names(&fs), ["new"]);
}

#[test]
fn commands_write_their_output() {
    let (mut fs, _) = common::formatted(64);
    let mut out = String::new();

    fs.run("create", &["f0"], &mut out).unwrap();
    fs.run("mkdir", &["d"], &mut out).unwrap();
    assert!(out.is_empty());

    fs.run("ls", &[], &mut out).unwrap();
    assert_eq!(out, "name\tdescriptor\n.\t1\n..\t1\nf0\t2\nd\t3\n");

    out.clear();
    fs.run("open", &["f0"], &mut out).unwrap();
    assert_eq!(out, "opened file descriptor: 1\n");
    out.clear();
    fs.run("write", &["1", "0", "hello", "world"], &mut out).unwrap();
    assert_eq!(out, "wrote 11 bytes\n");
    out.clear();
    fs.run("read", &["1", "6", "100"], &mut out).unwrap();
    assert_eq!(out, "world\n");

    out.clear();
    fs.run("filestat", &["2"], &mut out).unwrap();
    assert_eq!(
        out,
        "id: 2\nkind: File\nreferences: 1\nsize: 11\nentries: 1\nextended: no\n"
    );

    out.clear();
    fs.run("cd", &["d"], &mut out).unwrap();
    fs.run("pwd", &[], &mut out).unwrap();
    assert_eq!(out, "/d\n");

    let err = fs.run("create", &[], &mut out).unwrap_err();
    assert!(matches!(err, Error::ArgumentCount { command: "create", given: 0, .. }));
    assert_eq!(err.class(), ErrorClass::Argument);
    let err = fs.run("frobnicate", &[], &mut out).unwrap_err();
    assert!(matches!(err, Error::UnknownCommand(_)));
    let err = fs.run("rmdir", &["/d"], &mut out).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Argument);
    let err = fs.run("cd", &["missing"], &mut out).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Domain);
}

#[test]
fn root_can_fill_the_first_descriptor_block() {
    // 256字节的块只有两个槽位：哨兵和根目录
    let disk = RamDisk::with_blocks(64, 256);
    let mut fs = FileSystem::new();
    fs.mount(Arc::new(disk)).unwrap();
    let header = fs.format(256).unwrap();
    assert_eq!(header.descriptors_per_block(), 2);
    assert!(fs.bitmap().get(header.descriptors_begin()).unwrap());

    assert_eq!(fs.create("f").unwrap(), 2);
    assert_eq!(fs.mkdir("d").unwrap(), 3);
    fs.unlink("f").unwrap();
    assert_eq!(fs.create("g").unwrap(), 2);
}

#[test]
fn failed_growth_returns_its_blocks() {
    let (mut fs, _) = common::formatted(64);
    let file = fs.create("f").unwrap();
    let handle = fs.open("f").unwrap();
    let content: Vec<u8> = (0..3 * 1024).map(|i| (i % 199) as u8).collect();
    fs.write(handle, 0, &content).unwrap();
    assert_eq!(used_data_blocks(&fs), 3);

    // 100 KiB 远超数据区的60块
    assert!(matches!(
        fs.truncate("f", 100 * 1024),
        Err(Error::OutOfSpace("data blocks"))
    ));
    let stat = fs.stat(file).unwrap().unwrap();
    assert_eq!((stat.size, stat.entries, stat.extended), (3 * 1024, 3, false));
    assert_eq!(used_data_blocks(&fs), 3);
    assert_eq!(fs.read(handle, 0, u64::MAX).unwrap(), content);

    assert!(matches!(
        fs.write(handle, 90 * 1024, b"far"),
        Err(Error::OutOfSpace("data blocks"))
    ));
    assert_eq!(used_data_blocks(&fs), 3);

    fs.create("g").unwrap();
    let other = fs.open("g").unwrap();
    assert_eq!(fs.write(other, 0, b"x").unwrap(), 1);
    assert_eq!(used_data_blocks(&fs), 4);
}

#[test]
fn failed_removal_keeps_the_reference() {
    let (mut fs, _) = common::formatted(16);
    for name in ["a", "b", "c", "d"] {
        fs.create(name).unwrap();
    }
    let a = fs.lookup("a").unwrap();

    // 条目数比链表能容纳的多一个：删除时找不到末尾条目
    let mut root = fs.descriptors().get(1, DescriptorKind::Directory.into()).unwrap();
    root.used += 1;
    fs.descriptors().update(1, &root).unwrap();

    assert!(matches!(fs.unlink("a"), Err(Error::Corrupted(_))));
    let stat = fs.stat(a).unwrap().unwrap();
    assert_eq!(stat.kind, DescriptorKind::File);
    assert_eq!(stat.references, 1);
}
