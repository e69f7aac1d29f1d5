//! # 命令
//!
//! 每条命令接收已经切分好的字符串参数，结果写入调用者提供的输出。
//! 参数个数不对时报告参数个数错误，其余错误原样返回给调用者，由命令边界统一报告。

use alloc::string::String;
use core::fmt::Write;
use core::str::FromStr;

use crate::config::DEFAULT_BLOCK_SIZE;
use crate::fs::FileSystem;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Format { block_size: u64 },
    Umount,
    Create(&'a str),
    Mkdir(&'a str),
    Symlink { target: &'a str, path: &'a str },
    Link { source: &'a str, path: &'a str },
    Unlink(&'a str),
    Rmdir(&'a str),
    Cd(&'a str),
    Pwd,
    Ls,
    Filestat(u64),
    Open(&'a str),
    Close(u64),
    Read { handle: u64, offset: u64, len: u64 },
    Write { handle: u64, offset: u64, text: String },
    Truncate { path: &'a str, size: u64 },
}

impl<'a> Command<'a> {
    /// 命令名与参数说明，供帮助信息使用
    pub const USAGE: &'static [(&'static str, &'static str)] = &[
        ("format", "[block_size]"),
        ("umount", ""),
        ("create", "<path>"),
        ("mkdir", "<path>"),
        ("symlink", "<target> <path>"),
        ("link", "<source> <path>"),
        ("unlink", "<path>"),
        ("rmdir", "<path>"),
        ("cd", "<path>"),
        ("pwd", ""),
        ("ls", ""),
        ("filestat", "<descriptor>"),
        ("open", "<path>"),
        ("close", "<fd>"),
        ("read", "<fd> <offset> <len>"),
        ("write", "<fd> <offset> <text...>"),
        ("truncate", "<path> <size>"),
    ];

    pub fn parse(name: &str, args: &[&'a str]) -> Result<Self> {
        let command = match (name, args) {
            ("format", &[]) => Self::Format {
                block_size: DEFAULT_BLOCK_SIZE,
            },
            ("format", &[block_size]) => Self::Format {
                block_size: number(block_size)?,
            },
            ("umount", &[]) => Self::Umount,
            ("create", &[path]) => Self::Create(path),
            ("mkdir", &[path]) => Self::Mkdir(path),
            ("symlink", &[target, path]) => Self::Symlink { target, path },
            ("link", &[source, path]) => Self::Link { source, path },
            ("unlink", &[path]) => Self::Unlink(path),
            ("rmdir", &[path]) => Self::Rmdir(path),
            ("cd", &[path]) => Self::Cd(path),
            ("pwd", &[]) => Self::Pwd,
            ("ls", &[]) => Self::Ls,
            ("filestat", &[index]) => Self::Filestat(number(index)?),
            ("open", &[path]) => Self::Open(path),
            ("close", &[handle]) => Self::Close(number(handle)?),
            ("read", &[handle, offset, len]) => Self::Read {
                handle: number(handle)?,
                offset: number(offset)?,
                len: number(len)?,
            },
            ("write", &[handle, offset, ref text @ ..]) if !text.is_empty() => Self::Write {
                handle: number(handle)?,
                offset: number(offset)?,
                text: text.join(" "),
            },
            ("truncate", &[path, size]) => Self::Truncate {
                path,
                size: number(size)?,
            },
            _ => {
                let Some(&(command, expected)) =
                    Self::USAGE.iter().find(|(command, _)| *command == name)
                else {
                    return Err(Error::UnknownCommand(name.into()));
                };
                return Err(Error::ArgumentCount {
                    command,
                    expected,
                    given: args.len(),
                });
            }
        };

        Ok(command)
    }
}

impl FileSystem {
    /// 执行一条命令，输出写入`out`
    pub fn execute(&mut self, command: &Command<'_>, out: &mut dyn Write) -> Result<()> {
        match *command {
            Command::Format { block_size } => {
                let header = self.format(block_size)?;
                let descriptors = (header.descriptors_end - header.descriptors_begin() + 1)
                    * header.descriptors_per_block();
                writeln!(
                    out,
                    "formatted: {} blocks of {} bytes, {} descriptor slots, {} data blocks",
                    header.data_end + 1,
                    header.block_size,
                    descriptors,
                    header.data_end - header.data_begin() + 1
                )?;
            }
            Command::Umount => self.umount(),
            Command::Create(path) => {
                self.create(path)?;
            }
            Command::Mkdir(path) => {
                self.mkdir(path)?;
            }
            Command::Symlink { target, path } => {
                self.symlink(target, path)?;
            }
            Command::Link { source, path } => self.link(source, path)?,
            Command::Unlink(path) => self.unlink(path)?,
            Command::Rmdir(path) => self.rmdir(path)?,
            Command::Cd(path) => self.cd(path)?,
            Command::Pwd => writeln!(out, "{}", self.pwd()?)?,
            Command::Ls => {
                writeln!(out, "name\tdescriptor")?;
                for entry in self.list()? {
                    writeln!(out, "{}\t{}", entry.name(), entry.descriptor)?;
                }
            }
            Command::Filestat(index) => match self.stat(index)? {
                Some(stat) => {
                    writeln!(out, "id: {}", stat.index)?;
                    writeln!(out, "kind: {:?}", stat.kind)?;
                    writeln!(out, "references: {}", stat.references)?;
                    writeln!(out, "size: {}", stat.size)?;
                    writeln!(out, "entries: {}", stat.entries)?;
                    writeln!(out, "extended: {}", if stat.extended { "yes" } else { "no" })?;
                }
                None => writeln!(out, "descriptor {index} does not exist")?,
            },
            Command::Open(path) => {
                let handle = self.open(path)?;
                writeln!(out, "opened file descriptor: {handle}")?;
            }
            Command::Close(handle) => self.close(handle)?,
            Command::Read {
                handle,
                offset,
                len,
            } => {
                let bytes = self.read(handle, offset, len)?;
                writeln!(out, "{}", String::from_utf8_lossy(&bytes))?;
            }
            Command::Write {
                handle,
                offset,
                ref text,
            } => {
                let written = self.write(handle, offset, text.as_bytes())?;
                writeln!(out, "wrote {written} bytes")?;
            }
            Command::Truncate { path, size } => self.truncate(path, size)?,
        }

        Ok(())
    }

    /// 解析并执行一条命令
    pub fn run(&mut self, name: &str, args: &[&str], out: &mut dyn Write) -> Result<()> {
        self.execute(&Command::parse(name, args)?, out)
    }
}

fn number<T: FromStr>(arg: &str) -> Result<T> {
    arg.parse()
        .map_err(|_| Error::InvalidArgument(alloc::format!("`{arg}` is not a number")))
}
