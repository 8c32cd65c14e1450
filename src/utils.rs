use std::path::{Path, PathBuf};

use url::Url;

/// `<course>-lecture<NN>.<ext>`, e.g. `CS229-lecture03.pdf`.
pub fn lecture_file_name(course: &str, lecture: u32, extension: &str) -> String {
    sanitize_filename(&format!("{}-lecture{:02}.{}", course, lecture, extension))
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(|c: char| !c.is_alphanumeric() && c != '.' && c != '-' && c != '_', "_")
}

/// Resolves `href` against `base`; absolute hrefs pass through unchanged.
pub fn join_url(base: &str, href: &str) -> Result<String, url::ParseError> {
    Ok(Url::parse(base)?.join(href)?.to_string())
}

/// Destination directory for a course: either `dir` itself or `dir/<course>`.
pub fn course_dir(dir: &Path, course: &str, per_course: bool) -> PathBuf {
    if per_course {
        dir.join(sanitize_filename(course))
    } else {
        dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lecture_file_name_is_zero_padded() {
        assert_eq!(lecture_file_name("CS229", 3, "pdf"), "CS229-lecture03.pdf");
        assert_eq!(lecture_file_name("EE261", 12, "mp4"), "EE261-lecture12.mp4");
        assert_eq!(lecture_file_name("CS229", 100, "pdf"), "CS229-lecture100.pdf");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("CS 229?.pdf"), "CS_229_.pdf");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://see.stanford.edu", "/materials/aimlcs229/cs229-notes1.pdf").unwrap(),
            "https://see.stanford.edu/materials/aimlcs229/cs229-notes1.pdf"
        );
        assert_eq!(
            join_url("https://see.stanford.edu", "http://cdn.example.org/a.pdf").unwrap(),
            "http://cdn.example.org/a.pdf"
        );
        assert!(join_url("not a url", "/x").is_err());
    }

    #[test]
    fn test_course_dir() {
        let base = Path::new("downloads");
        assert_eq!(course_dir(base, "CS229", false), PathBuf::from("downloads"));
        assert_eq!(course_dir(base, "CS229", true), PathBuf::from("downloads/CS229"));
    }
}
