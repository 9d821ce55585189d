//! Text helpers: slug generation and markup stripping.

/// Maximum stored slug length for categories and products.
pub const MAX_SLUG_LENGTH: usize = 100;

/// Errors from slug resolution.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Neither an explicit slug nor a usable name was given.
    #[error("cannot derive a slug from {0:?}")]
    Empty(String),
    /// The explicit slug is longer than the column allows.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// Convert a name into a URL slug.
///
/// Letters and digits are lowercased and kept (including non-Latin scripts);
/// every other run of characters becomes a single `-`. Leading and trailing
/// separators are dropped, and the result is cut to [`MAX_SLUG_LENGTH`].
///
/// ```
/// use enf_core::text::slugify;
///
/// assert_eq!(slugify("Black T-Shirt  XL"), "black-t-shirt-xl");
/// assert_eq!(slugify("Футболка Oversize"), "футболка-oversize");
/// assert_eq!(slugify("!!!"), "");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    match slug.char_indices().nth(MAX_SLUG_LENGTH) {
        Some((cut, _)) => slug[..cut].trim_end_matches('-').to_owned(),
        None => slug,
    }
}

/// Pick the slug to store for a record.
///
/// A non-blank explicit slug is preserved unchanged; otherwise the slug is
/// derived from `name`.
///
/// # Errors
///
/// Returns `SlugError::TooLong` if the explicit slug exceeds the column size
/// and `SlugError::Empty` if nothing usable remains.
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, SlugError> {
    if let Some(slug) = explicit.filter(|s| !s.trim().is_empty()) {
        if slug.chars().count() > MAX_SLUG_LENGTH {
            return Err(SlugError::TooLong {
                max: MAX_SLUG_LENGTH,
            });
        }
        return Ok(slug.to_owned());
    }

    let derived = slugify(name);
    if derived.is_empty() {
        return Err(SlugError::Empty(name.to_owned()));
    }
    Ok(derived)
}

/// Remove markup tags and HTML comments from free text.
///
/// A `<` only opens a tag when followed by a letter, `/`, `!` or `?`, so plain
/// text such as `"5 < 7"` survives. Quoted attribute values may contain `>`.
/// An unterminated tag swallows the rest of the input.
///
/// ```
/// use enf_core::text::strip_tags;
///
/// assert_eq!(strip_tags("<b>Main</b> street, 5"), "Main street, 5");
/// assert_eq!(strip_tags(r#"<a title="x>y">Link</a>"#), "Link");
/// assert_eq!(strip_tags("flat 5 < 7"), "flat 5 < 7");
/// ```
#[must_use]
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));

        if !opens_tag {
            out.push('<');
            rest = after;
            continue;
        }

        if let Some(comment) = after.strip_prefix("!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        rest = skip_tag(after);
    }

    out.push_str(rest);
    out
}

/// Return the input after the `>` closing the current tag, honoring quotes.
fn skip_tag(tag: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, ch) in tag.char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return &tag[i + 1..],
            _ => {}
        }
    }
    ""
}

/// Strip tags and surrounding whitespace; blank results become `None`.
///
/// This is the normalization applied to every optional address or contact
/// field before it is persisted.
#[must_use]
pub fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(strip_tags)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
