//! Filename wildcard matching (`*` and `?`).

/// True if the string contains wildcard characters.
pub fn is_pattern(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Match `name` against a pattern where `*` matches any run of characters
/// (including none) and `?` matches exactly one character.
///
/// # Example
///
/// ```
/// use ichthyop_rs::io::matches_pattern;
///
/// assert!(matches_pattern("roms_avg_*.nc", "roms_avg_0042.nc"));
/// assert!(matches_pattern("mesh_?gr.nc", "mesh_hgr.nc"));
/// assert!(!matches_pattern("*.nc", "notes.txt"));
/// ```
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = name.chars().collect();

    // Greedy match with backtracking to the last star.
    let (mut pi, mut si) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_si = 0usize;

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_si = si;
            pi += 1;
        } else if let Some(sp) = star {
            pi = sp + 1;
            star_si += 1;
            si = star_si;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(matches_pattern("grid.nc", "grid.nc"));
        assert!(!matches_pattern("grid.nc", "grid.nc4"));
    }

    #[test]
    fn test_star_matches_empty_and_runs() {
        assert!(matches_pattern("*", ""));
        assert!(matches_pattern("a*b*c", "abc"));
        assert!(matches_pattern("a*b*c", "axxbyyc"));
        assert!(!matches_pattern("a*b*c", "axxbyy"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches_pattern("file_??.nc", "file_07.nc"));
        assert!(!matches_pattern("file_??.nc", "file_7.nc"));
    }

    #[test]
    fn test_is_pattern() {
        assert!(is_pattern("*.nc"));
        assert!(!is_pattern("mesh_mask.nc"));
    }
}
