//! Domain input parsing (spec §1: out of scope, convenience only — the
//! dispatcher itself always takes an already-parsed `Vec<String>`).

use std::path::Path;

/// Reads one domain per line from a file at `input`, or treats `input`
/// itself as a single literal domain if it does not name an existing file.
/// Blank lines and `#`-prefixed comment lines are skipped.
pub fn read_domain_list(input: &str) -> std::io::Result<Vec<String>> {
    let path = Path::new(input);
    if path.is_file() {
        let contents = std::fs::read_to_string(path)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    } else {
        Ok(vec![input.trim().to_string()])
    }
}
