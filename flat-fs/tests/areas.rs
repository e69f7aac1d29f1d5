mod common;

use std::sync::Arc;

use common::RamDisk;
use enumflags2::BitFlags;
use flat_fs::area::Area;
use flat_fs::layout::{Descriptor, DescriptorKind};
use flat_fs::{Error, FileSystem};

#[test]
fn bitmap_points_and_full_range() {
    let (fs, _) = common::formatted(64);
    let header = fs.header().unwrap();
    let bitmap = fs.bitmap();
    let (begin, end) = (header.data_begin(), header.data_end);

    for address in begin..=end {
        bitmap.set(address, true).unwrap();
        assert!(bitmap.get(address).unwrap());
    }
    assert_eq!(bitmap.find_first_free(begin, end).unwrap(), 0);

    bitmap.set(37, false).unwrap();
    assert!(!bitmap.get(37).unwrap());
    assert_eq!(bitmap.find_first_free(begin, end).unwrap(), 37);
    assert_eq!(bitmap.find_first_free(38, end).unwrap(), 0);
}

#[test]
fn bitmap_scan_crosses_bitmap_blocks() {
    let disk = RamDisk::with_blocks(5000, 256);
    let mut fs = FileSystem::new();
    fs.mount(Arc::new(disk)).unwrap();
    let header = fs.format(256).unwrap();
    assert_eq!(header.bits_per_block(), 2048);
    assert_eq!(header.bitmap_end, 3);

    let bitmap = fs.bitmap();
    let (begin, end) = (header.data_begin(), header.data_end);
    for address in begin..=2100 {
        bitmap.set(address, true).unwrap();
    }
    assert_eq!(bitmap.find_first_free(begin, end).unwrap(), 2101);

    for address in 2101..=end {
        if address != 4500 {
            bitmap.set(address, true).unwrap();
        }
    }
    assert_eq!(bitmap.find_first_free(begin, end).unwrap(), 4500);
    assert_eq!(bitmap.find_first_free(4501, end).unwrap(), 0);
    // 首尾落在同一个位图块
    assert_eq!(bitmap.find_first_free(4200, 4600).unwrap(), 4500);
}

#[test]
fn bitmap_rejects_sentinel_and_foreign_addresses() {
    let (fs, _) = common::formatted(64);
    assert!(matches!(fs.bitmap().get(0), Err(Error::BadAddress(0))));
    assert!(matches!(fs.bitmap().set(64, true), Err(Error::BadAddress(64))));
    assert!(matches!(
        fs.bitmap().find_first_free(10, 5),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn area_boundaries_are_contiguous() {
    let (fs, _) = common::formatted(64);
    let header = fs.header().unwrap();
    assert_eq!(fs.bitmap().begin().unwrap(), 1);
    assert_eq!(fs.descriptors().begin().unwrap(), fs.bitmap().end().unwrap() + 1);
    assert_eq!(fs.data().begin().unwrap(), fs.descriptors().end().unwrap() + 1);
    assert_eq!(fs.data().end().unwrap(), 63);
    assert!(fs.data().contains(header.data_end).unwrap());
    assert!(!fs.data().contains(header.descriptors_end).unwrap());
}

#[test]
fn append_reports_filled_block() {
    let (fs, _) = common::formatted(64);
    let descriptors = fs.descriptors();
    let first = descriptors.begin().unwrap();

    // 0号是哨兵，1号是根目录
    let mut appended = Vec::new();
    for _ in 0..6 {
        appended.push(descriptors.append(first, &Descriptor::file()).unwrap());
    }
    assert_eq!(
        appended,
        [(2, false), (3, false), (4, false), (5, false), (6, false), (7, true)]
    );
    assert!(matches!(
        descriptors.append(first, &Descriptor::file()),
        Err(Error::Corrupted(_))
    ));

    // 第二个容器块从0号槽位开始
    assert_eq!(
        descriptors.append(first + 1, &Descriptor::file()).unwrap(),
        (8, false)
    );
}

#[test]
fn descriptor_lookup_checks_kind_and_range() {
    let (fs, _) = common::formatted(64);
    let descriptors = fs.descriptors();

    let root = descriptors
        .get(1, DescriptorKind::Directory.into())
        .unwrap();
    assert_eq!(root.parent(), 1);
    assert!(matches!(
        descriptors.get(1, DescriptorKind::File.into()),
        Err(Error::KindMismatch {
            index: 1,
            found: Some(DescriptorKind::Directory)
        })
    ));
    assert!(descriptors.get(2, BitFlags::all()).unwrap().is_free());
    assert!(matches!(
        descriptors.get(0, BitFlags::all()),
        Err(Error::BadDescriptor(0))
    ));
    assert!(matches!(
        descriptors.get(16, BitFlags::all()),
        Err(Error::BadDescriptor(16))
    ));
}

#[test]
fn decrement_refuses_non_empty_directory() {
    let (mut fs, _) = common::formatted(64);
    let directory = fs.mkdir("d").unwrap();
    fs.create("d/f").unwrap();

    assert!(matches!(
        fs.descriptors().decrement_reference(directory),
        Err(Error::DirectoryNotEmpty(index)) if index == directory
    ));

    let empty = fs.mkdir("e").unwrap();
    assert_eq!(fs.descriptors().increment_reference(empty).unwrap(), 2);
    assert_eq!(fs.descriptors().decrement_reference(empty).unwrap(), 1);
    assert_eq!(fs.descriptors().decrement_reference(empty).unwrap(), 0);
    let descriptor = fs.descriptors().get(empty, BitFlags::all()).unwrap();
    assert_eq!(descriptor.kind, Some(DescriptorKind::Directory));
}
