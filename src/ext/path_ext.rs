use std::path::{Component, Path, PathBuf};

/// Lexically normalizes an absolute path: drops `.` and resolves `..`
/// without ever climbing above `/`.
pub fn normalize_absolute(path: &Path) -> PathBuf {
    let mut components = vec![Component::RootDir];

    for component in path.components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                if components.len() > 1 {
                    components.pop();
                }
            }
            Component::Normal(_) => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait PathExt {
    /// Number of normal components, so `/` is 0 and `/a/b` is 2.
    fn depth(&self) -> usize;

    fn normalize_absolute(&self) -> PathBuf;
}

impl PathExt for Path {
    fn depth(&self) -> usize {
        self.components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    }

    fn normalize_absolute(&self) -> PathBuf {
        normalize_absolute(self)
    }
}

impl PathExt for PathBuf {
    fn depth(&self) -> usize {
        self.as_path().depth()
    }

    fn normalize_absolute(&self) -> PathBuf {
        normalize_absolute(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/", 0)]
    #[case("/a", 1)]
    #[case("/a/b/c", 3)]
    #[case("/a//b/", 2)]
    #[case("/sysroot/etc/foo", 3)]
    fn depth_counts_normal_components(#[case] path: &str, #[case] expected: usize) {
        assert_eq!(Path::new(path).depth(), expected);
    }

    #[rstest]
    #[case("/a/./b", "/a/b")]
    #[case("/a/../b", "/b")]
    #[case("/../../etc", "/etc")]
    #[case("/a/b/..", "/a")]
    #[case("etc/foo", "/etc/foo")]
    fn normalize_never_escapes_root(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Path::new(input).normalize_absolute(), PathBuf::from(expected));
    }
}
