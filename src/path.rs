//! Path helpers for file names read out of build descriptors.
//!
//! Build descriptors carry paths as plain strings, frequently with Windows
//! separators and `..` segments. These helpers work on strings rather than
//! [`std::path::Path`] so that the result is identical on every host.

/// Convert `\` separators to `/`.
pub fn from_native_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Remove every `"` from a path (`"path to"/a.c` becomes `path to/a.c`).
pub fn remove_quotation_marks(path: &str) -> String {
    path.chars().filter(|&c| c != '"').collect()
}

/// Directory part of a file name, including its trailing `/`.
///
/// Returns an empty string when the name has no directory component.
pub fn directory_of(filename: &str) -> &str {
    match filename.rfind(['/', '\\']) {
        Some(pos) => &filename[..=pos],
        None => "",
    }
}

/// `true` for `/x`, `\\x` and drive-letter paths such as `C:/x`.
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    matches!(bytes.first(), Some(b'/' | b'\\'))
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Simplify a `/`-separated path.
///
/// - `.` segments and duplicate slashes are dropped;
/// - `dir/..` is collapsed when more path follows the `..`;
/// - leading `..` segments are kept, as is a trailing `/`;
/// - a leading `//` (UNC prefix) is preserved.
pub fn simplify_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let unc = path.starts_with("//");
    let absolute = path.starts_with('/');
    let trailing_slash = path.len() > 1 && path.ends_with('/');

    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let mut stack: Vec<&str> = Vec::with_capacity(segments.len());
    for (i, &segment) in segments.iter().enumerate() {
        let followed = i + 1 < segments.len() || trailing_slash;
        let collapsible = matches!(stack.last(), Some(&top) if top != "..");
        if segment == ".." && followed && collapsible {
            stack.pop();
        } else {
            stack.push(segment);
        }
    }

    let mut out = String::with_capacity(path.len());
    if unc {
        out.push_str("//");
    } else if absolute {
        out.push('/');
    }
    out.push_str(&stack.join("/"));
    if trailing_slash && !stack.is_empty() {
        out.push('/');
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Extension of a file name including the leading dot, if any.
fn extension(filename: &str) -> Option<&str> {
    let name = &filename[filename.rfind(['/', '\\']).map_or(0, |p| p + 1)..];
    name.rfind('.').map(|pos| &name[pos..])
}

/// `true` for C sources. Upper-case `.C` is C++.
pub fn is_c(filename: &str) -> bool {
    extension(filename) == Some(".c")
}

/// `true` for C++ sources and headers.
pub fn is_cpp(filename: &str) -> bool {
    const CPP_EXTENSIONS: [&str; 9] = [
        ".cpp", ".cxx", ".cc", ".c++", ".hpp", ".hxx", ".hh", ".tpp", ".txx",
    ];
    match extension(filename) {
        Some(".C") => true,
        Some(ext) => CPP_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// `true` when the file looks like something the analysis can process.
pub fn accept_file(filename: &str) -> bool {
    is_c(filename) || is_cpp(filename)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
