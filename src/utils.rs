use std::fs;
use std::path::{Path, PathBuf};

/// Names of the regular files directly inside `directory`, sorted.
pub fn read_file_names(directory: &Path) -> Result<Vec<String>, std::io::Error> {
    let mut names = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect::<Vec<_>>();
    names.sort();
    Ok(names)
}

/// Game files were written on case-insensitive filesystems, so `monkey.000` may be stored as
/// `MONKEY.000`. Returns the actual path of `name` inside `directory`, if any.
pub fn find_file_ignore_case(directory: &Path, name: &str) -> Option<PathBuf> {
    let exact = directory.join(name);
    if exact.is_file() {
        return Some(exact);
    }
    read_file_names(directory)
        .ok()?
        .into_iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(|candidate| directory.join(candidate))
}
