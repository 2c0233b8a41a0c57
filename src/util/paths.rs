/// Names that are safe to use in file names and unquoted remote commands.
pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Joins remote (POSIX) path segments without touching the local separator.
pub fn remote_join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_names() {
        assert!(is_safe_name("DummyVM-1"));
        assert!(is_safe_name("web_01.prod"));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name("my vm"));
        assert!(!is_safe_name("vm;rm"));
    }

    #[test]
    fn join_remote_paths() {
        assert_eq!(remote_join("/tmp", "ghettovcb.sh"), "/tmp/ghettovcb.sh");
        assert_eq!(remote_join("/tmp/", "ghettovcb.sh"), "/tmp/ghettovcb.sh");
    }
}
