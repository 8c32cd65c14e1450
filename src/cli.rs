use clap::ValueEnum;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Video,
    Pdf,
}

impl ResourceKind {
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Video => "mp4",
            ResourceKind::Pdf => "pdf",
        }
    }

    /// Bytes per progress-bar step: videos run to hundreds of MB, handouts to a few.
    pub fn display_unit(self) -> u64 {
        match self {
            ResourceKind::Video => 1_000_000,
            ResourceKind::Pdf => 1_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LectureSelection {
    All,
    List(Vec<u32>),
}

impl LectureSelection {
    /// Expands the selection against the number of lectures on the page.
    pub fn lectures(&self, available: usize) -> Vec<u32> {
        match self {
            LectureSelection::All => (1..=available as u32).collect(),
            LectureSelection::List(list) => list.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_expands_to_every_lecture() {
        assert_eq!(LectureSelection::All.lectures(3), vec![1, 2, 3]);
        assert!(LectureSelection::All.lectures(0).is_empty());
    }

    #[test]
    fn test_list_keeps_given_order() {
        let sel = LectureSelection::List(vec![10, 3, 5]);
        assert_eq!(sel.lectures(20), vec![10, 3, 5]);
    }

    #[test]
    fn test_resource_kind_constants() {
        assert_eq!(ResourceKind::Video.extension(), "mp4");
        assert_eq!(ResourceKind::Pdf.extension(), "pdf");
        assert!(ResourceKind::Video.display_unit() > ResourceKind::Pdf.display_unit());
    }
}
