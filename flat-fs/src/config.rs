//! 编译期常量

/// 文件系统头所在的块地址，同时作为“无块”的哨兵
pub const HEADER_ADDRESS: u64 = 0;

/// 永久保留的无效描述符编号
pub const INVALID_DESCRIPTOR: u64 = 0;

/// 格式化后根目录的描述符编号
pub const ROOT_DESCRIPTOR: u64 = 1;

/// 默认块大小
pub const DEFAULT_BLOCK_SIZE: u64 = 1024;

/// 允许的最小块大小
pub const MIN_BLOCK_SIZE: u64 = 256;

/// 最少块数：文件系统头、位图、描述符、数据各一块
pub const MIN_BLOCKS: u64 = 4;

/// 当前布局版本
pub const VERSION: u32 = 1;

/// 文件系统头的魔数签名，含结尾的 NUL
pub const SIGNATURE: [u8; 33] = *b"WK8sTuQpu_[MgkRwRL)vgY8G53w}gqoz\0";

/// 单个描述符在磁盘上的大小
pub const DESCRIPTOR_SIZE: u64 = 128;

/// 目录项名字的最大长度
pub const MAX_FILENAME: usize = 14;

/// 路径解析时展开符号链接的最大次数
pub const MAX_SYMLINK_HOPS: usize = 8;
