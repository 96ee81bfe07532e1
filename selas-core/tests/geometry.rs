//! Property tests for panel geometry
//!
//! The addressing function must be an exact bijection between
//! (page, chip, column) triples and framebuffer offsets for every valid
//! panel size, not just the common 128x64 one.

use proptest::prelude::*;
use selas_core::geometry::{Geometry, GeometryError, CHIP_COLUMNS, PAGE_ROWS};

proptest! {
    #[test]
    fn derived_quantities_match_dimensions(chips in 1usize..=8, pages in 1usize..=8) {
        let width = chips * CHIP_COLUMNS;
        let height = pages * PAGE_ROWS;
        let g = Geometry::new(width, height).unwrap();

        prop_assert_eq!(g.width(), width);
        prop_assert_eq!(g.height(), height);
        prop_assert_eq!(g.pages(), pages);
        prop_assert_eq!(g.chips(), chips);
        prop_assert_eq!(g.buffer_len(), width * height / 8);
    }

    #[test]
    fn buffer_offset_is_a_bijection(chips in 1usize..=8, pages in 1usize..=8) {
        let g = Geometry::new(chips * CHIP_COLUMNS, pages * PAGE_ROWS).unwrap();
        let mut seen = vec![false; g.buffer_len()];

        for page in 0..g.pages() {
            for chip in 0..g.chips() {
                for column in 0..CHIP_COLUMNS {
                    let offset = g.buffer_offset(page, chip, column);
                    prop_assert!(offset < seen.len());
                    prop_assert!(!seen[offset], "offset {} hit twice", offset);
                    seen[offset] = true;
                }
            }
        }

        prop_assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn misaligned_width_is_rejected(width in 1usize..512, pages in 1usize..=8) {
        prop_assume!(width % CHIP_COLUMNS != 0);
        prop_assert_eq!(
            Geometry::new(width, pages * PAGE_ROWS),
            Err(GeometryError::WidthNotChipAligned)
        );
    }

    #[test]
    fn misaligned_height_is_rejected(chips in 1usize..=8, height in 1usize..256) {
        prop_assume!(height % PAGE_ROWS != 0);
        prop_assert_eq!(
            Geometry::new(chips * CHIP_COLUMNS, height),
            Err(GeometryError::HeightNotPageAligned)
        );
    }
}
