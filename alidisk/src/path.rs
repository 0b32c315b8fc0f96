//! Virtual path helpers.
//!
//! Paths are `/`-separated and absolute once joined onto the working
//! directory. Empty segments collapse; `.` and `..` are ordinary names.

pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Joins `path` onto `base` unless `path` is already absolute.
pub fn join(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize(path)
    } else if path.is_empty() {
        normalize(base)
    } else {
        normalize(&format!("{base}/{path}"))
    }
}

pub fn dirname(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

pub fn basename(path: &str) -> String {
    let path = normalize(path);
    path.rsplit('/').next().unwrap_or_default().to_string()
}

/// Splits a wildcard prefix (the part before a trailing `*`) into the folder
/// to list and the name prefix to match inside it.
pub fn split_prefix(base: &str, prefix: &str) -> (String, String) {
    if prefix.is_empty() || prefix.ends_with('/') {
        return (join(base, prefix), String::new());
    }
    let full = join(base, prefix);
    (dirname(&full), basename(&full))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_relative_and_absolute() {
        assert_eq!(join("/", "docs"), "/docs");
        assert_eq!(join("/docs", "a.txt"), "/docs/a.txt");
        assert_eq!(join("/docs", "/music"), "/music");
        assert_eq!(join("/docs/", "sub//a.txt"), "/docs/sub/a.txt");
        assert_eq!(join("/docs", ""), "/docs");
    }

    #[test]
    fn dots_are_plain_names() {
        assert_eq!(join("/docs", ".."), "/docs/..");
        assert_eq!(join("/docs", "./a"), "/docs/./a");
    }

    #[test]
    fn dirname_and_basename() {
        assert_eq!(dirname("/docs/a.txt"), "/docs");
        assert_eq!(dirname("/docs"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(basename("/docs/a.txt"), "a.txt");
        assert_eq!(basename("/docs/"), "docs");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn split_prefix_cases() {
        assert_eq!(split_prefix("/docs", "foo"), ("/docs".into(), "foo".into()));
        assert_eq!(split_prefix("/docs", "sub/fo"), ("/docs/sub".into(), "fo".into()));
        assert_eq!(split_prefix("/docs", "sub/"), ("/docs/sub".into(), String::new()));
        assert_eq!(split_prefix("/docs", ""), ("/docs".into(), String::new()));
    }
}
