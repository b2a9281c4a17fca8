//! Document structure reconstruction.
//!
//! [`classifier`] assigns levels from document-wide font statistics,
//! [`reading_order`] sorts a page's runs, and [`tree`] nests them.

pub mod classifier;
pub mod reading_order;
pub mod tree;

pub use classifier::{FontSizeStats, HeadingClassifier, SizeTier};
pub use reading_order::{ReadingOrder, Strategy};
pub use tree::TreeBuilder;

use crate::model::{StructuralNode, TextRun};

/// Order, classify and nest the runs of one page.
pub fn build_page_structure(
    page_index: usize,
    runs: &[TextRun],
    classifier: &HeadingClassifier,
    builder: &TreeBuilder,
) -> StructuralNode {
    let order = ReadingOrder::of(runs);
    log::debug!(
        "Page {}: {} runs ordered with {:?}",
        page_index,
        order.order.len(),
        order.strategy
    );
    builder.build(
        page_index,
        order
            .apply(runs)
            .into_iter()
            .map(|run| (run, classifier.classify(run))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::options::{HeadingOptions, StructureOptions};
    use crate::model::{Level, Rect};

    #[test]
    fn test_report_page() {
        let runs = vec![
            TextRun::new("Body one is here.", 10.0, 0, Rect::new(72.0, 120.0, 150.0, 10.0)),
            TextRun::new("Quarterly Report", 18.0, 0, Rect::new(72.0, 60.0, 160.0, 18.0)),
            TextRun::new("Body two follows.", 10.0, 0, Rect::new(72.0, 150.0, 150.0, 10.0)),
        ];
        let options = HeadingOptions::default();
        let classifier = HeadingClassifier::new(
            FontSizeStats::from_runs(&runs, options.size_epsilon),
            options,
        );
        let builder = TreeBuilder::new(StructureOptions::default());

        let tree = build_page_structure(0, &runs, &classifier, &builder);
        assert_eq!(tree.children.len(), 1);
        let title = &tree.children[0];
        assert_eq!(title.level, Level::Title);
        assert_eq!(title.text, "Quarterly Report");
        let texts: Vec<&str> = title.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Body one is here.", "Body two follows."]);
    }
}
