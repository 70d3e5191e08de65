//! Output file naming.
//!
//! Every exported file starts with a sanitized stem of the source image
//! name, followed by a `--` separated suffix:
//!
//! - `{stem}--layer-{NN}-{slug}.svg` for one layer (`NN` is 1-based)
//! - `{stem}--composite.svg` for all visible layers

/// Stem used when nothing survives sanitizing a source name.
pub const FALLBACK_STEM: &str = "image";

/// Slug used when nothing survives slugifying a layer name.
pub const FALLBACK_SLUG: &str = "layer";

/// Reduce `input` to characters accepted by `allowed`.
///
/// Whitespace runs become one `space`, other rejected runs become one
/// `-`, consecutive `-` collapse, and leading or trailing `-`/`.` are
/// stripped.
fn normalize(input: &str, space: char, allowed: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_whitespace = false;
    let push = |out: &mut String, c: char| {
        if !(c == '-' && out.ends_with('-')) {
            out.push(c);
        }
    };

    for c in input.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                push(&mut out, space);
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        push(&mut out, if allowed(c) { c } else { '-' });
    }

    out.trim_matches(|c| c == '-' || c == '.').to_owned()
}

/// Make a source file stem safe for use in output filenames.
///
/// Keeps ASCII letters, digits, `.`, `_` and `-`; whitespace becomes
/// `_`.
///
/// ```
/// use hachure_export::sanitize_stem;
///
/// assert_eq!(sanitize_stem("  My Photo (1) "), "My_Photo_-1");
/// assert_eq!(sanitize_stem("***"), "image");
/// ```
#[must_use]
pub fn sanitize_stem(stem: &str) -> String {
    let out = normalize(stem, '_', |c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
    });
    if out.is_empty() {
        FALLBACK_STEM.to_owned()
    } else {
        out
    }
}

/// Lowercase, hyphenated form of a display name.
///
/// ```
/// assert_eq!(hachure_export::slugify("Dark Slate Blue"), "dark-slate-blue");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let out = normalize(&lower, '-', |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
    });
    if out.is_empty() {
        FALLBACK_SLUG.to_owned()
    } else {
        out
    }
}

/// Sanitized stem of a source file name or path.
///
/// Directory components and the final extension are dropped.
#[must_use]
pub fn source_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };
    sanitize_stem(stem)
}

/// Filename for one layer. `layer` is zero-based.
#[must_use]
pub fn layer_filename(stem: &str, layer: usize, slug: &str) -> String {
    format!("{stem}--layer-{:02}-{slug}.svg", layer + 1)
}

/// Filename for the composite of all visible layers.
#[must_use]
pub fn composite_filename(stem: &str) -> String {
    format!("{stem}--composite.svg")
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- sanitize_stem ---

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(sanitize_stem("sunset-2024_v2.final"), "sunset-2024_v2.final");
    }

    #[test]
    fn sanitize_replaces_whitespace_runs_once() {
        assert_eq!(sanitize_stem("a   b\tc"), "a_b_c");
        assert_eq!(sanitize_stem("a _b"), "a__b");
    }

    #[test]
    fn sanitize_collapses_rejected_runs() {
        assert_eq!(sanitize_stem("café@home!!"), "caf-home");
        assert_eq!(sanitize_stem("a--&--b"), "a-b");
    }

    #[test]
    fn sanitize_strips_edge_dashes_and_dots() {
        assert_eq!(sanitize_stem("..hidden-"), "hidden");
        assert_eq!(sanitize_stem("-.-x.-."), "x");
    }

    #[test]
    fn sanitize_falls_back_when_empty() {
        assert_eq!(sanitize_stem(""), FALLBACK_STEM);
        assert_eq!(sanitize_stem("   "), FALLBACK_STEM);
        assert_eq!(sanitize_stem("日本"), FALLBACK_STEM);
    }

    // --- slugify ---

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Navy Blue"), "navy-blue");
        assert_eq!(slugify("  Light  Goldenrod Yellow "), "light-goldenrod-yellow");
    }

    #[test]
    fn slugify_rejects_punctuation() {
        assert_eq!(slugify("Rock 'n' Roll"), "rock-n-roll");
        assert_eq!(slugify("a_b.c"), "a_b.c");
    }

    #[test]
    fn slugify_falls_back_when_empty() {
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify(""), FALLBACK_SLUG);
    }

    // --- source_stem ---

    #[test]
    fn source_stem_drops_directories_and_extension() {
        assert_eq!(source_stem("photos/Beach Day.JPG"), "Beach_Day");
        assert_eq!(source_stem(r"C:\scans\map.v2.png"), "map.v2");
        assert_eq!(source_stem("noext"), "noext");
    }

    #[test]
    fn source_stem_of_dotfile_keeps_name() {
        // A leading dot is not an extension separator, but is stripped.
        assert_eq!(source_stem(".profile"), "profile");
    }

    // --- Output names ---

    #[test]
    fn layer_filename_is_one_based_and_padded() {
        assert_eq!(layer_filename("cat", 0, "black"), "cat--layer-01-black.svg");
        assert_eq!(layer_filename("cat", 11, "white"), "cat--layer-12-white.svg");
    }

    #[test]
    fn composite_name() {
        assert_eq!(composite_filename("cat"), "cat--composite.svg");
    }
}
