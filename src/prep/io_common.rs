use std::path::{Path, PathBuf};

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The sibling file an output is written to before being moved in place.
pub fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_is_a_sibling() {
        let p = Path::new("out/Formatted-Data.csv");
        assert_eq!(staging_path(p), PathBuf::from("out/Formatted-Data.csv.tmp"));
        assert_eq!(simplify_file_name(p), "Formatted-Data.csv");
    }
}
