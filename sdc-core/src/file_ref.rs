//! Normalisation of user supplied file references.
//!
//! A reference may be a browse URL (`https://commons.wikimedia.org/wiki/File:X.jpg`),
//! an `index.php?title=File:X.jpg` link, a titled reference (`File:X.jpg`) or
//! a bare name (`X.jpg`). All of them are reduced to the same [`FileTitle`].

use std::fmt;

use crate::IdError;

const FILE_NAMESPACES: [&str; 2] = ["file:", "image:"];

/// Lower-cased markers that introduce a title inside a URL, with the
/// characters that end it. Query-string titles also stop at `&`.
const URL_MARKERS: [(&str, &[char]); 4] = [
    ("/file:", &['?', '#']),
    ("/image:", &['?', '#']),
    ("title=file:", &['&', '#']),
    ("title=image:", &['&', '#']),
];

/// Canonical title of a Commons file page, stored without the namespace.
///
/// # Examples
/// ```
/// use sdc_core::FileTitle;
///
/// let bare = FileTitle::parse("Tulips_in_spring.jpg")?;
/// let titled = FileTitle::parse("File:Tulips in spring.jpg")?;
/// let url = FileTitle::parse(
///     "https://commons.wikimedia.org/wiki/File:Tulips_in_spring.jpg?uselang=nl",
/// )?;
/// assert_eq!(bare, titled);
/// assert_eq!(bare, url);
/// assert_eq!(bare.page_title(), "File:Tulips in spring.jpg");
/// # Ok::<(), sdc_core::IdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTitle(String);

impl FileTitle {
    /// Parse any of the accepted reference forms.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] when nothing remains after stripping the
    /// URL and namespace, and [`IdError::Malformed`] when the percent-encoding
    /// of a URL is not valid UTF-8.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let trimmed = raw.trim();
        let name = match url_title(trimmed) {
            Some(path) => {
                urlencoding::decode(path)
                    .map_err(|_| IdError::Malformed {
                        kind: "file reference",
                        raw: raw.to_owned(),
                    })?
                    .into_owned()
            }
            None => strip_namespace(trimmed).to_owned(),
        };
        let spaced = name.replace('_', " ");
        let collapsed = spaced.trim();
        if collapsed.is_empty() {
            return Err(IdError::Empty {
                kind: "file reference",
            });
        }
        Ok(Self(upper_first(collapsed)))
    }

    /// File name without the namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Full page title including the `File:` namespace.
    #[must_use]
    pub fn page_title(&self) -> String {
        format!("File:{}", self.0)
    }

    /// Browse URL used when reporting on the file.
    #[must_use]
    pub fn display_url(&self) -> String {
        format!(
            "https://commons.wikimedia.org/wiki/File:{}",
            self.0.replace(' ', "_")
        )
    }
}

impl fmt::Display for FileTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Title portion of a URL reference, still percent-encoded.
fn url_title(reference: &str) -> Option<&str> {
    let lowered = reference.to_ascii_lowercase();
    URL_MARKERS
        .iter()
        .filter_map(|(marker, terminators)| {
            lowered
                .find(marker)
                .map(|pos| (pos + marker.len(), *terminators))
        })
        .min_by_key(|(start, _)| *start)
        .and_then(|(start, terminators)| {
            let tail = reference.get(start..)?;
            tail.split(terminators).next()
        })
}

fn strip_namespace(title: &str) -> &str {
    for prefix in FILE_NAMESPACES {
        let matches = title
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            return title.get(prefix.len()..).unwrap_or_default();
        }
    }
    title
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://commons.wikimedia.org/wiki/File:Sunset_over_Delft.jpg")]
    #[case("https://commons.wikimedia.org/wiki/File:Sunset%20over%20Delft.jpg#/media")]
    #[case("File:Sunset over Delft.jpg")]
    #[case("file:Sunset_over_Delft.jpg")]
    #[case("Image:Sunset over Delft.jpg")]
    #[case("https://commons.wikimedia.org/wiki/file:Sunset_over_Delft.jpg")]
    #[case("https://commons.wikimedia.org/w/index.php?title=File:Sunset_over_Delft.jpg&action=history")]
    #[case("https://commons.wikimedia.org/w/index.php?title=Image:Sunset%20over%20Delft.jpg")]
    #[case("  Sunset over Delft.jpg  ")]
    #[case("sunset_over_Delft.jpg")]
    fn accepted_forms_share_a_title(#[case] input: &str) {
        let title = FileTitle::parse(input).expect("reference should parse");
        assert_eq!(title.name(), "Sunset over Delft.jpg");
    }

    #[rstest]
    #[case("")]
    #[case("File:")]
    #[case("https://commons.wikimedia.org/wiki/File:")]
    #[case("___")]
    fn empty_references_are_rejected(#[case] input: &str) {
        assert!(matches!(
            FileTitle::parse(input),
            Err(IdError::Empty { .. })
        ));
    }

    #[rstest]
    fn invalid_percent_encoding_is_malformed() {
        let err = FileTitle::parse("https://commons.wikimedia.org/wiki/File:%FF.jpg")
            .expect_err("invalid utf-8 should fail");
        assert!(matches!(err, IdError::Malformed { .. }));
    }

    #[rstest]
    fn ampersands_survive_in_path_urls() {
        let title = FileTitle::parse("https://commons.wikimedia.org/wiki/File:Salt_&_Pepper.jpg")
            .expect("reference should parse");
        assert_eq!(title.name(), "Salt & Pepper.jpg");
    }

    #[rstest]
    fn display_url_uses_underscores() {
        let title = FileTitle::parse("File:A b.png").expect("title");
        assert_eq!(
            title.display_url(),
            "https://commons.wikimedia.org/wiki/File:A_b.png"
        );
    }
}
