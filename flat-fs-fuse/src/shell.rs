//! # 命令行外壳
//!
//! 把一行输入切分成命令名与参数，宿主机相关的命令在这里处理，
//! 其余命令交给文件系统执行。
//!
//! 外壳是唯一捕获错误的地方：错误被打印出来，会话继续。

use std::fmt::{self, Write};
use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use flat_fs::{Command, ErrorClass, FileSystem};

use crate::BlockFile;

/// 只由外壳处理的命令
const HOST_USAGE: &[(&str, &str)] = &[
    ("mount", "<image>"),
    ("createFile", "<image> <size>"),
    ("help", ""),
    ("exit", ""),
];

/// 外壳层面的错误：文件系统错误，或打开宿主机镜像时的错误
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Fs(#[from] flat_fs::Error),
    #[error("{}: {source}", path.display())]
    Image { path: PathBuf, source: io::Error },
    #[error("failed to write output")]
    Output(#[from] fmt::Error),
}

#[derive(Default)]
pub struct Shell {
    fs: FileSystem,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    #[inline]
    pub fn fs_mut(&mut self) -> &mut FileSystem {
        &mut self.fs
    }

    /// 执行一行输入，输出与错误信息都写入`out`。
    ///
    /// 遇到`exit`或`quit`时返回[`ControlFlow::Break`]。
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> ControlFlow<()> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return ControlFlow::Continue(());
        };
        if name.starts_with('#') {
            return ControlFlow::Continue(());
        }
        if matches!(name, "exit" | "quit") {
            return ControlFlow::Break(());
        }

        let args: Vec<&str> = words.collect();
        if let Err(err) = self.dispatch(name, &args, out) {
            let reported = match &err {
                ShellError::Fs(err) if err.class() == ErrorClass::Device => {
                    log::error!("`{line}` failed: {err}");
                    writeln!(out, "unexpected failure: {err}")
                }
                err => writeln!(out, "error: {err}"),
            };
            if reported.is_err() {
                log::error!("failed to report `{err}`");
            }
        }

        ControlFlow::Continue(())
    }

    fn dispatch(&mut self, name: &str, args: &[&str], out: &mut dyn Write) -> Result<(), ShellError> {
        match (name, args) {
            ("mount", &[path]) => self.mount(path),
            ("createFile", &[path, size]) => {
                let size = size.parse().map_err(|_| {
                    flat_fs::Error::InvalidArgument(format!("`{size}` is not a number"))
                })?;
                crate::create_image(path, size).map_err(|source| ShellError::Image {
                    path: path.into(),
                    source,
                })?;
                writeln!(out, "created {path} ({size} bytes)")?;
                Ok(())
            }
            ("help", _) => {
                for (command, usage) in HOST_USAGE.iter().chain(Command::USAGE) {
                    writeln!(out, "{command} {usage}")?;
                }
                Ok(())
            }
            _ => match HOST_USAGE.iter().find(|(command, _)| *command == name) {
                Some(&(command, expected)) => Err(flat_fs::Error::ArgumentCount {
                    command,
                    expected,
                    given: args.len(),
                }
                .into()),
                None => Ok(self.fs.run(name, args, out)?),
            },
        }
    }

    /// 挂载宿主机上的镜像文件
    pub fn mount(&mut self, path: &str) -> Result<(), ShellError> {
        let device = BlockFile::open(path).map_err(|source| ShellError::Image {
            path: path.into(),
            source,
        })?;
        self.fs.mount(Arc::new(device))?;
        log::info!("mounted {path}");

        Ok(())
    }
}
