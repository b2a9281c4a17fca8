//! Chart and image region detection.
//!
//! Placed images are reported as they are. Painted vector paths are
//! clustered by proximity and a cluster counts as a chart when it is large
//! enough and is neither a set of thin rulings, a page background, nor the
//! border of a table found from ruling lines.

use crate::convert::options::GraphicsOptions;
use crate::model::{GraphicKind, GraphicRegion, Rect, SourceMethod, Table};
use crate::parser::{PageView, PaintedPath};

/// Slack (points) when testing whether a cluster lies inside a table.
const TABLE_TOLERANCE: f32 = 2.0;

#[derive(Debug, Clone)]
struct Cluster {
    bbox: Rect,
    /// Every member is thinner than the ruling threshold
    thin: bool,
}

/// Finds image and vector-chart regions on a page.
pub struct GraphicsDetector {
    options: GraphicsOptions,
}

impl GraphicsDetector {
    pub fn new(options: GraphicsOptions) -> Self {
        Self { options }
    }

    /// Regions on `page`, sorted top to bottom, then left to right.
    ///
    /// `tables` are the tables accepted on the page. Vector drawings inside
    /// a lattice table are its borders. Tables from the text-based tiers
    /// only bound their runs, so drawings inside them still count.
    pub fn detect(&self, page: &PageView, tables: &[Table]) -> Vec<GraphicRegion> {
        let ruled: Vec<Rect> = tables
            .iter()
            .filter(|t| t.source_method == SourceMethod::Lattice)
            .map(|t| t.bbox)
            .collect();

        let mut regions: Vec<GraphicRegion> = page
            .images
            .iter()
            .filter(|r| r.is_finite() && r.width > 0.0 && r.height > 0.0)
            .map(|r| GraphicRegion::new(page.page_index, *r, GraphicKind::Image))
            .collect();

        let page_area = page.bounds().area();
        for cluster in self.cluster(&page.paths) {
            let area = cluster.bbox.area();
            if cluster.thin {
                log::debug!("Page {}: ignoring ruling cluster {:?}", page.page_index, cluster.bbox);
                continue;
            }
            if area <= self.options.min_chart_area {
                continue;
            }
            if page_area > 0.0 && area >= self.options.max_page_coverage * page_area {
                log::debug!("Page {}: ignoring background {:?}", page.page_index, cluster.bbox);
                continue;
            }
            if ruled
                .iter()
                .any(|t| t.contains_rect(&cluster.bbox, TABLE_TOLERANCE))
            {
                continue;
            }
            regions.push(GraphicRegion::new(
                page.page_index,
                cluster.bbox,
                GraphicKind::VectorChart,
            ));
        }

        regions.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y).then(a.bbox.x.total_cmp(&b.bbox.x)));
        regions
    }

    fn is_thin(&self, rect: &Rect) -> bool {
        rect.width.min(rect.height) < self.options.ruling_thickness
    }

    /// Merge painted paths whose boxes come within `merge_gap` of each other.
    fn cluster(&self, paths: &[PaintedPath]) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = paths
            .iter()
            .filter(|p| (p.stroked || p.filled) && p.bbox.is_finite())
            .map(|p| Cluster {
                bbox: p.bbox,
                thin: self.is_thin(&p.bbox),
            })
            .collect();

        // Repeat until no two clusters touch; merged boxes can reach new neighbours.
        loop {
            let mut merged_any = false;
            let mut i = 0;
            while i < clusters.len() {
                let mut j = i + 1;
                while j < clusters.len() {
                    if clusters[i]
                        .bbox
                        .expand(self.options.merge_gap)
                        .intersects(&clusters[j].bbox)
                    {
                        let other = clusters.remove(j);
                        clusters[i].bbox = clusters[i].bbox.union(&other.bbox);
                        clusters[i].thin &= other.thin;
                        merged_any = true;
                    } else {
                        j += 1;
                    }
                }
                i += 1;
            }
            if !merged_any {
                break;
            }
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(x: f32, y: f32, w: f32, h: f32) -> PaintedPath {
        PaintedPath {
            bbox: Rect::new(x, y, w, h),
            stroked: false,
            filled: true,
        }
    }

    fn detector() -> GraphicsDetector {
        GraphicsDetector::new(GraphicsOptions::default())
    }

    fn page() -> PageView {
        PageView::empty(0, 612.0, 792.0)
    }

    fn table(bbox: Rect, method: SourceMethod) -> Table {
        Table::from_rows(0, bbox, vec![vec!["cell".to_string()]], method).unwrap()
    }

    #[test]
    fn test_image_region() {
        let mut page = page();
        page.images.push(Rect::new(100.0, 100.0, 200.0, 200.0));
        page.images.push(Rect::new(10.0, 10.0, 0.0, 50.0));

        let regions = detector().detect(&page, &[]);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, GraphicKind::Image);
        assert_eq!(regions[0].bbox, Rect::new(100.0, 100.0, 200.0, 200.0));
    }

    #[test]
    fn test_bar_chart_cluster() {
        let mut page = page();
        // Three bars on a common baseline
        page.paths.push(path(100.0, 150.0, 20.0, 50.0));
        page.paths.push(path(121.0, 120.0, 20.0, 80.0));
        page.paths.push(path(142.0, 170.0, 20.0, 30.0));
        // A far away bullet
        page.paths.push(path(400.0, 600.0, 4.0, 4.0));

        let regions = detector().detect(&page, &[]);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, GraphicKind::VectorChart);
        assert_eq!(regions[0].bbox, Rect::new(100.0, 120.0, 62.0, 80.0));
    }

    #[test]
    fn test_rulings_and_backgrounds_are_not_charts() {
        let mut page = page();
        // Horizontal rule and an L of thin lines
        page.paths.push(path(72.0, 300.0, 400.0, 0.5));
        page.paths.push(path(72.0, 400.0, 0.5, 100.0));
        page.paths.push(path(72.0, 500.0, 100.0, 0.5));
        // Full page background
        page.paths.push(path(0.0, 0.0, 612.0, 792.0));

        assert!(detector().detect(&page, &[]).is_empty());
    }

    #[test]
    fn test_table_borders_are_not_charts() {
        let mut page = page();
        page.paths.push(path(100.0, 100.0, 300.0, 150.0));
        let table = table(Rect::new(100.0, 100.0, 300.0, 150.0), SourceMethod::Lattice);
        assert!(detector().detect(&page, &[table]).is_empty());
        assert_eq!(detector().detect(&page, &[]).len(), 1);
    }

    #[test]
    fn test_chart_between_paragraphs_survives_text_tables() {
        let mut page = page();
        page.paths.push(path(100.0, 250.0, 40.0, 150.0));
        page.paths.push(path(141.0, 200.0, 40.0, 200.0));

        // Text above and below the bars: text tiers report a box around all of it
        let around = Rect::new(72.0, 64.0, 170.0, 630.0);
        for method in [
            SourceMethod::WordReconstruction,
            SourceMethod::Stream,
            SourceMethod::Plumber,
        ] {
            let regions = detector().detect(&page, &[table(around, method)]);
            assert_eq!(regions.len(), 1, "chart dropped under a {} table", method);
            assert_eq!(regions[0].kind, GraphicKind::VectorChart);
            assert_eq!(regions[0].bbox, Rect::new(100.0, 200.0, 81.0, 200.0));
        }

        let ruled = table(around, SourceMethod::Lattice);
        assert!(detector().detect(&page, &[ruled]).is_empty());
    }

    #[test]
    fn test_unpainted_paths_ignored() {
        let mut page = page();
        page.paths.push(PaintedPath {
            bbox: Rect::new(100.0, 100.0, 100.0, 100.0),
            stroked: false,
            filled: false,
        });
        assert!(detector().detect(&page, &[]).is_empty());
    }

    #[test]
    fn test_sorted_by_position() {
        let mut page = page();
        page.images.push(Rect::new(300.0, 400.0, 50.0, 50.0));
        page.paths.push(path(100.0, 100.0, 50.0, 50.0));
        page.images.push(Rect::new(50.0, 400.0, 50.0, 50.0));

        let regions = detector().detect(&page, &[]);
        let origins: Vec<(f32, f32)> = regions.iter().map(|r| (r.bbox.x, r.bbox.y)).collect();
        assert_eq!(origins, vec![(100.0, 100.0), (50.0, 400.0), (300.0, 400.0)]);
    }
}
