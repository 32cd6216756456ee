//! Virtual namespace resolution.
//!
//! A mount translates a virtual path prefix to a physical one. Resolution is
//! longest-prefix-wins; among mounts sharing the longest matching prefix the
//! first declared one is chosen, so repeated lookups against the same
//! configuration always agree.

use crate::config::schema::Mount;

/// Outcome of resolving a path against the mount list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub mount: &'a Mount,
    /// `mount.target` followed by the remainder of the request path.
    pub translated: String,
}

/// Select the mount for `path` and translate it.
pub fn resolve<'a>(mounts: &'a [Mount], path: &str) -> Option<Resolution<'a>> {
    let mut best: Option<&Mount> = None;
    for mount in mounts {
        if !path.starts_with(mount.path.as_str()) {
            continue;
        }
        // Strictly greater keeps the first-declared mount on ties.
        let longer = match best {
            Some(b) => mount.path.len() > b.path.len(),
            None => true,
        };
        if longer {
            best = Some(mount);
        }
    }

    best.map(|mount| Resolution {
        mount,
        translated: format!("{}{}", mount.target, &path[mount.path.len()..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::MountKind;

    fn mount(path: &str, target: &str) -> Mount {
        Mount {
            path: path.to_string(),
            target: target.to_string(),
            kind: MountKind::Dir,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mounts = vec![
            mount("/res", "/short"),
            mount("/resources/img", "/images"),
            mount("/resources", "/local"),
        ];
        let r = resolve(&mounts, "/resources/img/logo.png").unwrap();
        assert_eq!(r.translated, "/images/logo.png");

        let r = resolve(&mounts, "/resources/x.json").unwrap();
        assert_eq!(r.translated, "/local/x.json");
    }

    #[test]
    fn test_equal_length_tie_first_declared() {
        let mounts = vec![mount("/resources", "/local"), mount("/resources", "/cache")];
        for _ in 0..3 {
            let r = resolve(&mounts, "/resources/x.json").unwrap();
            assert_eq!(r.translated, "/local/x.json");
            assert_eq!(r.mount.target, "/local");
        }
    }

    #[test]
    fn test_no_mount() {
        let mounts = vec![mount("/resources", "/local")];
        assert!(resolve(&mounts, "/other/x.json").is_none());
        assert!(resolve(&[], "/resources").is_none());
    }

    #[test]
    fn test_whole_path_mount() {
        let mounts = vec![mount("/config.json", "/etc/kernel.json")];
        let r = resolve(&mounts, "/config.json").unwrap();
        assert_eq!(r.translated, "/etc/kernel.json");
    }

    #[test]
    fn test_prefix_is_textual() {
        // Prefix matching is plain string matching, not segment-aware.
        let mounts = vec![mount("/res", "/r")];
        let r = resolve(&mounts, "/resources/x").unwrap();
        assert_eq!(r.translated, "/rources/x");
    }
}
