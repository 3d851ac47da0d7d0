//! Image-to-question matching by the number embedded in file names.
//!
//! `Question 18.txt` carries the number `18`; an image belongs to it when a
//! standalone run of digits in the image's stem is exactly `18`
//! (`question_18.jpg`, `q18_b.png`), but never when the digits are part of a
//! longer run (`question_180.jpg`, `img_018.png`).
//!
//! Two questions with the same number in one chapter both receive the image.

use std::path::Path;
use std::sync::LazyLock;

use quizbank_shared::Asset;
use regex::Regex;

/// Raster formats recognised as question images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Maximal runs of ASCII digits.
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run regex"));

/// Where a chapter's images are served from.
#[derive(Debug, Clone, Copy)]
pub struct AssetLocation<'a> {
    /// Public prefix, e.g. `questions`.
    pub public_root: &'a str,
    /// Chapter label, e.g. `Ch1`.
    pub chapter: &'a str,
    /// Image directory name as found on disk, e.g. `Images`.
    pub asset_dir: &'a str,
}

impl AssetLocation<'_> {
    /// Public path for `file_name`: non-empty segments joined with `/`.
    pub fn public_path(&self, file_name: &str) -> String {
        [self.public_root, self.chapter, self.asset_dir, file_name]
            .iter()
            .flat_map(|segment| segment.split(['/', '\\']))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The number a question file is keyed on: the first digit run of its stem.
///
/// The run is kept verbatim, so leading zeros and arbitrarily long numbers
/// survive. Returns `None` when the stem has no digits.
pub fn question_number(file_name: &str) -> Option<&str> {
    DIGITS_RE.find(file_stem(file_name)).map(|m| m.as_str())
}

/// Whether the stem of `image_name` contains `number` as a whole digit run.
pub fn contains_number(image_name: &str, number: &str) -> bool {
    DIGITS_RE
        .find_iter(file_stem(image_name))
        .any(|m| m.as_str() == number)
}

/// Whether `file_name` has a recognised raster extension.
pub fn is_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Select the images belonging to `question_file` from a chapter's image list.
///
/// Names that could escape the asset directory (separators, `..`, hidden
/// files) are never matched. Result order follows `images`.
pub fn match_assets(
    question_file: &str,
    images: &[String],
    location: &AssetLocation<'_>,
) -> Vec<Asset> {
    let Some(number) = question_number(question_file) else {
        return Vec::new();
    };

    images
        .iter()
        .filter(|name| is_safe_name(name) && is_image(name))
        .filter(|name| contains_number(name, number))
        .map(|name| Asset {
            path: location.public_path(name),
        })
        .collect()
}

fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCATION: AssetLocation<'static> = AssetLocation {
        public_root: "questions",
        chapter: "Ch1",
        asset_dir: "Images",
    };

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn paths(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(|a| a.path.as_str()).collect()
    }

    #[test]
    fn number_from_question_file() {
        assert_eq!(question_number("Question 18.txt"), Some("18"));
        assert_eq!(question_number("q7-part2.txt"), Some("7"));
        assert_eq!(question_number("Question 007.txt"), Some("007"));
        assert_eq!(question_number("intro.txt"), None);
        // Digits in the extension do not count
        assert_eq!(question_number("notes.mp4"), None);
    }

    #[test]
    fn digit_boundaries_are_respected() {
        assert!(contains_number("question_18.jpg", "18"));
        assert!(contains_number("18.png", "18"));
        assert!(contains_number("q18b.png", "18"));
        assert!(!contains_number("question_180.jpg", "18"));
        assert!(!contains_number("img_118.png", "18"));
        assert!(!contains_number("img_180.png", "18"));
    }

    #[test]
    fn leading_zeros_make_a_different_token() {
        assert!(!contains_number("img_018.png", "18"));
        assert!(contains_number("img_018.png", "018"));

        let images = names(&["img_018.png", "7.png", "007.png"]);
        assert_eq!(
            paths(&match_assets("Question 18.txt", &images, &LOCATION)),
            Vec::<&str>::new()
        );
        assert_eq!(
            paths(&match_assets("Question 007.txt", &images, &LOCATION)),
            vec!["questions/Ch1/Images/007.png"]
        );
    }

    #[test]
    fn long_numbers_still_match() {
        let long = "123456789012345678901234567890";
        let images = names(&[&format!("q{long}.png"), "q1234.png"]);
        let assets = match_assets(&format!("Question {long}.txt"), &images, &LOCATION);
        let expected = format!("questions/Ch1/Images/q{long}.png");
        assert_eq!(paths(&assets), vec![expected.as_str()]);
    }

    #[test]
    fn eighteen_does_not_match_one_eighty() {
        let images = names(&["question_18.jpg", "question_180.jpg", "img_180.png"]);
        let assets = match_assets("Question 18.txt", &images, &LOCATION);
        assert_eq!(paths(&assets), vec!["questions/Ch1/Images/question_18.jpg"]);
    }

    #[test]
    fn every_match_is_attached() {
        let images = names(&["q18_a.png", "q18_b.GIF", "q19.png"]);
        let assets = match_assets("Question 18.txt", &images, &LOCATION);
        assert_eq!(
            paths(&assets),
            vec!["questions/Ch1/Images/q18_a.png", "questions/Ch1/Images/q18_b.GIF"]
        );
    }

    #[test]
    fn file_without_number_gets_nothing() {
        let images = names(&["1.png", "2.png"]);
        assert!(match_assets("Intro.txt", &images, &LOCATION).is_empty());
    }

    #[test]
    fn non_images_and_unsafe_names_are_ignored() {
        let images = names(&["18.txt", "18.svg", ".18.png", "../18.png", "sub/18.png", "18.webp"]);
        let assets = match_assets("Question 18.txt", &images, &LOCATION);
        assert_eq!(paths(&assets), vec!["questions/Ch1/Images/18.webp"]);
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(is_image("photo.JPEG"));
        assert!(is_image("photo.Bmp"));
        assert!(!is_image("photo.tiff"));
        assert!(!is_image("png"));
    }

    #[test]
    fn public_path_drops_empty_segments() {
        let location = AssetLocation {
            public_root: "/static/questions/",
            chapter: "Ch 2",
            asset_dir: "Images",
        };
        assert_eq!(
            location.public_path("a.png"),
            "static/questions/Ch 2/Images/a.png"
        );

        let bare = AssetLocation {
            public_root: "",
            chapter: "Ch1",
            asset_dir: "img",
        };
        assert_eq!(bare.public_path("a.png"), "Ch1/img/a.png");
    }
}
