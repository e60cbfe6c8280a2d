// THEORY:
// The `ObjectDetector` is the engine's connected-component labeler. It takes a
// binary flag mask (typically an edge or outline mask), assigns every flagged
// pixel to a labeled object in a single forward pass, and derives two summary
// products: the largest object (recorded in the analyzer's totals) and a
// proximity ranking of all objects.
//
// Key architectural principles:
// 1.  **Online labeling with eager merges**: the pass mints a fresh provisional
//     label at the start of every foreground run, then adopts the smallest
//     label among the four causal neighbors (up-left, up, up-right, left).
//     When neighbors disagree, the losing labels are folded into the winner
//     immediately: their table entries are appended to the winner's and every
//     folded pixel is rewritten in the label mask. There are no parent
//     pointers — the mask is always the single source of truth, and merges
//     compound transitively across the pass.
// 2.  **Insertion-ordered table**: `ObjectTable` preserves first-seen label
//     order. That order is observable: it breaks ties when picking the
//     largest object and when sorting the proximity ranking.
// 3.  **The literal distance formula**: the ranking distance is
//     `trunc(sqrt((avg_x ^ 2) + (avg_y ^ 2)))` where `^` is bitwise XOR.
//     This is carried over verbatim from the behavior this engine reproduces;
//     it is not a Euclidean norm. See DESIGN.md before "fixing" it.
// 4.  **One computation, three products**: the label mask, the object table,
//     and the ranking are computed together; accessing any of them triggers
//     the detection, and replacing the flag mask discards all three.

use log::debug;

use crate::core_modules::analyzer::{
    Mask, PixelAnalyzer, PixelIndex, Statistic, TOTAL_LARGEST_OBJECT, TOTAL_LARGEST_OBJECT_SIZE,
};

/// Object label paired with its ranking distance, ascending by distance.
pub type ProximityRanking = Vec<(u32, u32)>;

/// Insertion-ordered mapping from object label to member pixel indices.
///
/// Backed by a vector so that iteration enumerates labels in the order they
/// first entered the table; merged-away labels vacate their position entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTable {
    entries: Vec<(u32, Vec<PixelIndex>)>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: u32) -> Option<&Vec<PixelIndex>> {
        self.entries
            .iter()
            .find(|(entry_label, _)| *entry_label == label)
            .map(|(_, indexes)| indexes)
    }

    /// Iterate `(label, indices)` in first-seen label order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Vec<PixelIndex>)> {
        self.entries
            .iter()
            .map(|(label, indexes)| (*label, indexes))
    }

    /// The member list for `label`, appending a fresh entry at the end of the
    /// enumeration order if the label is new.
    fn entry_mut(&mut self, label: u32) -> &mut Vec<PixelIndex> {
        if let Some(position) = self
            .entries
            .iter()
            .position(|(entry_label, _)| *entry_label == label)
        {
            &mut self.entries[position].1
        } else {
            self.entries.push((label, Vec::new()));
            &mut self.entries.last_mut().unwrap().1
        }
    }

    fn remove(&mut self, label: u32) -> Option<Vec<PixelIndex>> {
        let position = self
            .entries
            .iter()
            .position(|(entry_label, _)| *entry_label == label)?;
        Some(self.entries.remove(position).1)
    }
}

/// Labels connected components in an externally supplied binary flag mask.
pub struct ObjectDetector {
    pixel_flags: Mask,
    objects: Option<ObjectTable>,
    object_mask: Option<Mask>,
    objects_sorted: Option<ProximityRanking>,
}

impl ObjectDetector {
    pub fn new(pixel_flags: Mask) -> Self {
        Self {
            pixel_flags,
            objects: None,
            object_mask: None,
            objects_sorted: None,
        }
    }

    pub fn pixel_flags(&self) -> &Mask {
        &self.pixel_flags
    }

    /// Replace the flag mask; the label mask, table and ranking are dropped.
    pub fn set_pixel_flags(&mut self, pixel_flags: Mask) {
        self.pixel_flags = pixel_flags;
        self.objects = None;
        self.object_mask = None;
        self.objects_sorted = None;
    }

    /// The label mask, running detection on first access.
    pub fn get_object_mask(&mut self, analyzer: &mut PixelAnalyzer) -> &Mask {
        if self.object_mask.is_none() {
            self.detect_objects(analyzer);
        }
        self.object_mask.as_ref().unwrap()
    }

    /// The object table, running detection on first access.
    pub fn get_objects(&mut self, analyzer: &mut PixelAnalyzer) -> &ObjectTable {
        if self.objects.is_none() {
            self.detect_objects(analyzer);
        }
        self.objects.as_ref().unwrap()
    }

    /// The proximity ranking, running detection on first access.
    pub fn get_sorted_objects(&mut self, analyzer: &mut PixelAnalyzer) -> &ProximityRanking {
        if self.objects_sorted.is_none() {
            self.detect_objects(analyzer);
        }
        self.objects_sorted.as_ref().unwrap()
    }

    fn detect_objects(&mut self, analyzer: &mut PixelAnalyzer) {
        assert_eq!(
            self.pixel_flags.len(),
            analyzer.total_pixels(),
            "flag mask length must match the raster's pixel count"
        );

        let mut object_mask = analyzer.zeroed_mask().clone();
        let mut objects = ObjectTable::new();

        // The counter is pre-incremented at every run start, so the first
        // minted label is 2 and 1 is never assigned.
        let mut label: u32 = 1;
        let mut last_y: u32 = 0;
        let mut on_background = true;

        let pixel_flags = &self.pixel_flags;
        let raster: &PixelAnalyzer = analyzer;
        raster.scan_pixels(|x, y| {
            let index = raster.coords_to_index(x, y);

            if pixel_flags[index] == 1 {
                if on_background || y != last_y {
                    on_background = false;
                    label += 1;
                }
                last_y = y;

                let value =
                    determine_object_label_value(raster, &mut object_mask, &mut objects, x, y, label);
                object_mask[index] = value;
                objects.entry_mut(value).push(index);
            } else if !on_background {
                on_background = true;
            }
        });

        determine_largest_object(analyzer, &objects);
        let objects_sorted = sort_objects_by_proximity(analyzer, &objects);

        debug!(
            "object detection: {} objects from {} flagged pixels",
            objects.len(),
            pixel_flags.iter().filter(|&&flag| flag == 1).count()
        );

        self.object_mask = Some(object_mask);
        self.objects = Some(objects);
        self.objects_sorted = Some(objects_sorted);
    }
}

/// Pick the pixel's label: the fresh candidate, or the smallest non-zero
/// label among the causal neighbors; then fold any disagreeing neighbor
/// labels into the choice.
fn determine_object_label_value(
    analyzer: &PixelAnalyzer,
    object_mask: &mut Mask,
    objects: &mut ObjectTable,
    x: u32,
    y: u32,
    label: u32,
) -> u32 {
    let mut value = label;

    let adjacent_labels: [Option<u32>; 4] = [
        (x > 0 && y > 0).then(|| object_mask[analyzer.coords_to_index(x - 1, y - 1)]),
        (y > 0).then(|| object_mask[analyzer.coords_to_index(x, y - 1)]),
        (x + 1 < analyzer.width() && y > 0)
            .then(|| object_mask[analyzer.coords_to_index(x + 1, y - 1)]),
        (x > 0).then(|| object_mask[analyzer.coords_to_index(x - 1, y)]),
    ];

    for adjacent_label in adjacent_labels.into_iter().flatten() {
        if adjacent_label != 0 && adjacent_label < value {
            value = adjacent_label;
        }
    }

    process_object_equivalence(object_mask, objects, value, &adjacent_labels);

    value
}

/// Merge every causal-neighbor label that differs from the adopted value into
/// it, in first-seen neighbor order.
fn process_object_equivalence(
    object_mask: &mut Mask,
    objects: &mut ObjectTable,
    value: u32,
    adjacent_labels: &[Option<u32>; 4],
) {
    let mut labels: Vec<u32> = Vec::new();
    for adjacent_label in adjacent_labels.iter().flatten() {
        if *adjacent_label != value && !labels.contains(adjacent_label) {
            labels.push(*adjacent_label);
        }
    }

    for label in labels {
        if label != 0 {
            convert_object_labels(object_mask, objects, label, value);
        }
    }
}

/// Fold `label`'s entire component into `value`: move its index list onto the
/// winner's entry and rewrite the label mask for every moved index.
fn convert_object_labels(object_mask: &mut Mask, objects: &mut ObjectTable, label: u32, value: u32) {
    if let Some(target_indexes) = objects.remove(label) {
        for &index in &target_indexes {
            object_mask[index] = value;
        }
        objects.entry_mut(value).extend(target_indexes);
    }
}

/// Record the label and size of the biggest table entry in the totals.
/// First-seen order wins ties; an empty table records zeros.
fn determine_largest_object(analyzer: &mut PixelAnalyzer, objects: &ObjectTable) {
    let mut largest_object_id: u32 = 0;
    let mut largest_object_count: usize = 0;

    for (label, indexes) in objects.iter() {
        if largest_object_count < indexes.len() {
            largest_object_id = label;
            largest_object_count = indexes.len();
        }
    }

    analyzer.insert_total(
        TOTAL_LARGEST_OBJECT,
        Statistic::scalar(largest_object_id as f64),
    );
    analyzer.insert_total(
        TOTAL_LARGEST_OBJECT_SIZE,
        Statistic::scalar(largest_object_count as f64),
    );
}

/// Rank objects by the engine's historical distance figure, ascending, with a
/// stable sort so equal distances keep table enumeration order.
fn sort_objects_by_proximity(analyzer: &PixelAnalyzer, objects: &ObjectTable) -> ProximityRanking {
    let mut object_distances: ProximityRanking = Vec::with_capacity(objects.len());

    for (label, indexes) in objects.iter() {
        let (average_x, average_y) = average_coords(analyzer, indexes);
        // Bitwise XOR, not squaring; kept byte-for-byte compatible.
        let distance = (((average_x ^ 2) + (average_y ^ 2)) as f64).sqrt() as u32;
        object_distances.push((label, distance));
    }

    object_distances.sort_by_key(|&(_, distance)| distance);
    object_distances
}

/// Truncating integer centroid of a non-empty member list.
fn average_coords(analyzer: &PixelAnalyzer, indexes: &[PixelIndex]) -> (usize, usize) {
    let mut total_x: usize = 0;
    let mut total_y: usize = 0;
    let mut count: usize = 0;

    for &index in indexes {
        total_x += analyzer.index_x(index) as usize;
        total_y += analyzer.index_y(index) as usize;
        count += 1;
    }

    (total_x / count, total_y / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::analyzer::TOTAL_AVERAGE_DELTA;
    use crate::core_modules::error::AnalyzerError;
    use crate::core_modules::pixel::Pixel;
    use crate::core_modules::test_utils::TestRaster;

    fn analyzer_sized(width: u32, height: u32) -> PixelAnalyzer {
        let raster = TestRaster::solid(width, height, Pixel::new(0, 0, 0, 255));
        PixelAnalyzer::new(Box::new(raster)).expect("valid test raster")
    }

    #[test]
    fn single_row_runs_get_distinct_labels() {
        let mut analyzer = analyzer_sized(4, 1);
        let mut detector = ObjectDetector::new(vec![1, 1, 0, 1]);

        let objects = detector.get_objects(&mut analyzer).clone();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects.get(2), Some(&vec![0, 1]));
        assert_eq!(objects.get(3), Some(&vec![3]));

        let mask = detector.get_object_mask(&mut analyzer);
        assert_eq!(mask, &vec![2, 2, 0, 3]);
    }

    #[test]
    fn lone_pixel_is_one_object_of_size_one() {
        let mut analyzer = analyzer_sized(3, 3);
        let mut flags = vec![0; 9];
        flags[4] = 1;
        let mut detector = ObjectDetector::new(flags);

        let objects = detector.get_objects(&mut analyzer).clone();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.get(2), Some(&vec![4]));

        let size = analyzer.get_total(TOTAL_LARGEST_OBJECT_SIZE).unwrap();
        assert_eq!(size.value, 1.0);
        let id = analyzer.get_total(TOTAL_LARGEST_OBJECT).unwrap();
        assert_eq!(id.value, 2.0);
    }

    #[test]
    fn touching_runs_merge_into_one_object() {
        // Flags:  1 0 1
        //         1 1 1
        // The second row bridges both first-row runs; label 3 folds into 2,
        // and the winner's index list carries the folded indices mid-list.
        let mut analyzer = analyzer_sized(3, 2);
        let mut detector = ObjectDetector::new(vec![1, 0, 1, 1, 1, 1]);

        let objects = detector.get_objects(&mut analyzer).clone();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.get(2), Some(&vec![0, 3, 2, 4, 5]));

        let mask = detector.get_object_mask(&mut analyzer);
        assert_eq!(mask, &vec![2, 0, 2, 2, 2, 2]);

        let size = analyzer.get_total(TOTAL_LARGEST_OBJECT_SIZE).unwrap();
        assert_eq!(size.value, 5.0);
    }

    #[test]
    fn unflagged_pixels_stay_unlabeled() {
        let mut analyzer = analyzer_sized(4, 3);
        let flags = vec![0, 1, 0, 0, 1, 1, 0, 1, 0, 0, 0, 0];
        let mut detector = ObjectDetector::new(flags.clone());

        let mask = detector.get_object_mask(&mut analyzer);
        for (index, &flag) in flags.iter().enumerate() {
            if flag == 0 {
                assert_eq!(mask[index], 0, "background pixel {index} got a label");
            } else {
                assert_ne!(mask[index], 0, "flagged pixel {index} left unlabeled");
            }
        }
    }

    #[test]
    fn largest_object_prefers_first_seen_on_ties() {
        // Two separate two-pixel runs; both size 2, the earlier label wins.
        let mut analyzer = analyzer_sized(5, 1);
        let mut detector = ObjectDetector::new(vec![1, 1, 0, 1, 1]);

        detector.get_objects(&mut analyzer);
        let id = analyzer.get_total(TOTAL_LARGEST_OBJECT).unwrap();
        assert_eq!(id.value, 2.0);
        let size = analyzer.get_total(TOTAL_LARGEST_OBJECT_SIZE).unwrap();
        assert_eq!(size.value, 2.0);
    }

    #[test]
    fn ranking_uses_the_xor_distance() {
        // Lone object with centroid (1, 0):
        // (1 XOR 2) + (0 XOR 2) = 3 + 2 = 5, trunc(sqrt(5)) = 2.
        // A Euclidean distance would have been 1.
        let mut analyzer = analyzer_sized(3, 2);
        let mut detector = ObjectDetector::new(vec![1, 0, 1, 1, 1, 1]);

        let ranking = detector.get_sorted_objects(&mut analyzer);
        assert_eq!(ranking, &vec![(2, 2)]);
    }

    #[test]
    fn ranking_sorts_ascending_and_keeps_table_order_on_ties() {
        // Object 2 at (0,0): (0^2)+(0^2) = 4 -> 2.
        // Object 3 at (1,3): (1^2)+(3^2) = 3+1 = 4 -> 2. Tie; table order holds.
        let mut analyzer = analyzer_sized(3, 4);
        let mut flags = vec![0; 12];
        flags[0] = 1; // (0,0)
        flags[10] = 1; // (1,3)
        let mut detector = ObjectDetector::new(flags);

        let ranking = detector.get_sorted_objects(&mut analyzer);
        assert_eq!(ranking, &vec![(2, 2), (3, 2)]);
    }

    #[test]
    fn empty_flag_mask_yields_empty_products() {
        let mut analyzer = analyzer_sized(2, 2);
        let mut detector = ObjectDetector::new(vec![0; 4]);

        assert!(detector.get_objects(&mut analyzer).is_empty());
        assert!(detector.get_sorted_objects(&mut analyzer).is_empty());
        assert_eq!(detector.get_object_mask(&mut analyzer), &vec![0; 4]);

        let id = analyzer.get_total(TOTAL_LARGEST_OBJECT).unwrap();
        assert_eq!(id.value, 0.0);
        let size = analyzer.get_total(TOTAL_LARGEST_OBJECT_SIZE).unwrap();
        assert_eq!(size.value, 0.0);
    }

    #[test]
    fn detection_materializes_base_totals_too() {
        let mut analyzer = analyzer_sized(2, 2);
        let mut detector = ObjectDetector::new(vec![1, 0, 0, 0]);
        detector.get_objects(&mut analyzer);
        assert!(analyzer.get_total(TOTAL_AVERAGE_DELTA).is_ok());
        assert_eq!(
            analyzer.get_total("Bogus"),
            Err(AnalyzerError::StatisticNotFound("Bogus".to_string()))
        );
    }

    #[test]
    fn replacing_flags_invalidates_the_products() {
        let mut analyzer = analyzer_sized(4, 1);
        let mut detector = ObjectDetector::new(vec![1, 1, 0, 1]);
        assert_eq!(detector.get_objects(&mut analyzer).len(), 2);

        detector.set_pixel_flags(vec![1, 0, 0, 0]);
        assert_eq!(detector.get_objects(&mut analyzer).len(), 1);
        assert_eq!(detector.get_object_mask(&mut analyzer), &vec![2, 0, 0, 0]);
    }

    #[test]
    fn repeated_reads_are_bit_identical() {
        let mut analyzer = analyzer_sized(3, 2);
        let mut detector = ObjectDetector::new(vec![1, 0, 1, 1, 1, 1]);
        let first_mask = detector.get_object_mask(&mut analyzer).clone();
        let first_ranking = detector.get_sorted_objects(&mut analyzer).clone();
        assert_eq!(&first_mask, detector.get_object_mask(&mut analyzer));
        assert_eq!(&first_ranking, detector.get_sorted_objects(&mut analyzer));
    }
}
