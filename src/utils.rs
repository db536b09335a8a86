use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Turns any text into a lowercase ASCII slug, Django style.
///
/// Accents are stripped through NFKD normalization and whatever is still not
/// ASCII is dropped.
pub fn slugify(value: &str) -> String {
    static RE_INVALID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
    static RE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

    let mut normalized = value.nfkd().filter(|c| c.is_ascii()).collect::<String>();
    normalized.make_ascii_lowercase();

    let cleaned = RE_INVALID.replace_all(&normalized, "");
    let slug = RE_SEPARATOR.replace_all(&cleaned, "-");

    slug.trim_matches(|c| c == '-' || c == '_').to_owned()
}

/// Lowercased extension of `filename` when it is an accepted image type.
/// Only the last extension counts.
pub fn allowed_file(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALLOWED_IMAGE_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Safe on-disk name for an uploaded image, `None` when the type is refused.
pub fn secure_filename(filename: &str) -> Option<String> {
    let extension = allowed_file(filename)?;
    // Browsers on Windows may send the full client path.
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);

    let stem = match slugify(stem) {
        slug if slug.is_empty() => "avatar".to_owned(),
        slug => slug,
    };
    Some(format!("{}.{}", stem, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_strips_punctuation_and_accents() {
        assert_eq!(
            slugify("Hello, World! Rust’s amazing — isn't it?"),
            "hello-world-rusts-amazing-isnt-it"
        );
        assert_eq!(slugify("C'est déjà l'été."), "cest-deja-lete");
        assert_eq!(slugify("你好 世界"), "");
    }

    #[test]
    fn test_slugify_whitespace() {
        assert_eq!(
            slugify("   multiple   spaces\tand\nnewlines  "),
            "multiple-spaces-and-newlines"
        );
        assert_eq!(slugify("already-slugified_text"), "already-slugified_text");
    }

    #[test]
    fn test_allowed_file() {
        assert_eq!(allowed_file("me.PNG").as_deref(), Some("png"));
        assert_eq!(allowed_file("holiday.photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(allowed_file("shot.webp").as_deref(), Some("webp"));
        assert_eq!(allowed_file("image.png.exe"), None);
        assert_eq!(allowed_file("notes.txt"), None);
        assert_eq!(allowed_file("png"), None);
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(
            secure_filename("My Holiday Photo.JPG").as_deref(),
            Some("my-holiday-photo.jpg")
        );
        assert_eq!(
            secure_filename("../../etc/passwd.png").as_deref(),
            Some("passwd.png")
        );
        assert_eq!(
            secure_filename(r"C:\Users\me\Füße.gif").as_deref(),
            Some("fue.gif")
        );
        assert_eq!(secure_filename("你好.png").as_deref(), Some("avatar.png"));
        assert_eq!(secure_filename("script.svg"), None);
    }
}
