use std::path::{Path, PathBuf};

/// Receives requests to relabel freshly created subtrees. Label computation
/// happens elsewhere.
pub trait Relabeler {
    /// `path` is as seen from inside the target, e.g. `/etc/ssh`.
    fn request_relabel(&mut self, path: &Path);
}

/// Collects relabel requests in order, without duplicates, for a later
/// `setfiles` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelabelQueue {
    paths: Vec<PathBuf>,
}

impl RelabelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// One path per line, the format `setfiles -f` reads.
    pub fn to_list(&self) -> String {
        self.paths
            .iter()
            .map(|path| format!("{}\n", path.display()))
            .collect()
    }
}

impl Relabeler for RelabelQueue {
    fn request_relabel(&mut self, path: &Path) {
        if !self.paths.iter().any(|queued| queued == path) {
            self.paths.push(path.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_request_order_and_drops_duplicates() {
        let mut queue = RelabelQueue::new();
        queue.request_relabel(Path::new("/etc"));
        queue.request_relabel(Path::new("/var/lib/app"));
        queue.request_relabel(Path::new("/etc"));

        assert_eq!(
            queue.paths(),
            &[PathBuf::from("/etc"), PathBuf::from("/var/lib/app")]
        );
        assert_eq!(queue.to_list(), "/etc\n/var/lib/app\n");
    }
}
