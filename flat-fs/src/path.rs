//! 路径拆分

use alloc::vec::Vec;

/// 按`/`拆开的路径，空的分量被丢弃
#[derive(Debug, PartialEq, Eq)]
pub struct Path<'a> {
    /// 是否从根目录开始
    pub absolute: bool,
    pub components: Vec<&'a str>,
}

impl<'a> Path<'a> {
    pub fn parse(path: &'a str) -> Self {
        Self {
            absolute: path.starts_with('/'),
            components: path.split('/').filter(|part| !part.is_empty()).collect(),
        }
    }

    /// 最后一个分量与其父路径
    pub fn split_last(&self) -> Option<(&'a str, &[&'a str])> {
        self.components.split_last().map(|(last, rest)| (*last, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_paths() {
        let path = Path::parse("/usr//local/bin/");
        assert!(path.absolute);
        assert_eq!(path.components, ["usr", "local", "bin"]);

        let path = Path::parse("../notes");
        assert!(!path.absolute);
        assert_eq!(path.components, ["..", "notes"]);
        assert_eq!(path.split_last(), Some(("notes", &[".."][..])));

        let root = Path::parse("/");
        assert!(root.absolute && root.components.is_empty());
        assert!(Path::parse("").components.is_empty());
    }
}
