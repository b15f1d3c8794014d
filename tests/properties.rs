//! Property tests for reduction, differencing and diff map handling.

use std::collections::BTreeMap;

use proptest::collection::vec;
use proptest::prelude::*;

use poketch_video::compile::Dispatch;
use poketch_video::diff::{diff_frames, DiffAccumulator};
use poketch_video::{
    Compiler, CompilerOptions, DiffMap, FrameReducer, PixelChange, QuantizedFrame, RawFrame,
    TargetProfile,
};

/// Two equally sized frames of palette indices.
fn frame_pair() -> impl Strategy<Value = (QuantizedFrame, QuantizedFrame)> {
    (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
        let n = (w * h) as usize;
        (vec(0u8..4, n), vec(0u8..4, n)).prop_map(move |(a, b)| {
            (
                QuantizedFrame::new(w, h, a).unwrap(),
                QuantizedFrame::new(w, h, b).unwrap(),
            )
        })
    })
}

fn raw_frame() -> impl Strategy<Value = RawFrame> {
    (1u32..40, 1u32..40).prop_flat_map(|(w, h)| {
        vec(any::<u8>(), (w * h * 3) as usize).prop_map(move |pixels| RawFrame::new(pixels, w, h, 0))
    })
}

fn diff_map() -> impl Strategy<Value = DiffMap> {
    let change = (0u32..24, 0u32..20, 0u8..4).prop_map(|(x, y, c)| PixelChange::new(x, y, c));
    proptest::collection::btree_map(0u64..500, vec(change, 0..8), 0..12)
        .prop_map(|entries: BTreeMap<u64, Vec<PixelChange>>| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn test_reduction_is_deterministic(frame in raw_frame()) {
        let reducer = FrameReducer::new(&TargetProfile::with_grid(7, 5));
        let first = reducer.reduce(&frame).unwrap();
        let second = reducer.reduce(&frame).unwrap();
        prop_assert_eq!(first.dimensions(), (7, 5));
        prop_assert!(first.cells().iter().all(|&c| c < 4));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_diff_contains_exactly_changed_cells((prev, next) in frame_pair()) {
        let changes = diff_frames(&prev, &next).unwrap();
        let (w, h) = prev.dimensions();

        let mut expected = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if prev.get(x, y) != next.get(x, y) {
                    expected.push(PixelChange::new(x, y, next.get(x, y)));
                }
            }
        }
        prop_assert_eq!(&changes, &expected);
        prop_assert!(changes.len() <= (w * h) as usize);
        prop_assert_eq!(changes.is_empty(), prev == next);
    }

    #[test]
    fn test_applying_changes_reproduces_next((prev, next) in frame_pair()) {
        let mut screen = prev.clone();
        for change in diff_frames(&prev, &next).unwrap() {
            screen.set(change.x, change.y, change.color);
        }
        prop_assert_eq!(screen, next);
    }

    #[test]
    fn test_identical_run_is_sparse((frame, _) in frame_pair(), repeats in 1usize..10) {
        let (w, h) = frame.dimensions();
        let mut acc = DiffAccumulator::new(w, h);
        for _ in 0..repeats {
            acc.push(frame.clone()).unwrap();
        }
        let diffs = acc.finish();
        prop_assert_eq!(diffs.frame_indices().collect::<Vec<_>>(), vec![0]);
        prop_assert_eq!(diffs.total_changes(), (w * h) as usize);
    }

    #[test]
    fn test_json_round_trip(diffs in diff_map()) {
        let json = diffs.to_json().unwrap();
        prop_assert_eq!(DiffMap::from_json(&json).unwrap(), diffs);
    }

    #[test]
    fn test_every_frame_has_a_dispatch_entry(diffs in diff_map(), settle in 0u64..40) {
        let options = CompilerOptions { settle_in_frames: settle, ..Default::default() };
        let program = Compiler::new(TargetProfile::default(), options)
            .compile(&diffs)
            .unwrap();

        prop_assert_eq!(program.units().len(), diffs.len());
        for (frame, changes) in diffs.iter() {
            let relative = program.first_content_index() + frame;
            match program.dispatch(relative) {
                Dispatch::Frame(unit) => {
                    prop_assert_eq!(unit.frame, frame);
                    prop_assert_eq!(unit.writes.len(), changes.len());
                }
                other => prop_assert!(false, "frame {} dispatched as {:?}", frame, other),
            }
        }
        for relative in 0..=settle {
            prop_assert_eq!(program.dispatch(relative), Dispatch::Noise);
        }
    }
}
