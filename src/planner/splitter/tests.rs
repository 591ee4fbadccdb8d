// Unit tests for split planning

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::domain::model::{Entry, Locator};
    use crate::error::ScreencapError;
    use crate::planner::keyframes::KeyframeIndex;
    use crate::planner::splitter::*;

    fn d(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn clip(path: &str, order: usize, start: Option<&str>, stop: Option<&str>) -> Entry {
        let mut entry = Entry::new(Locator::parse(path), order);
        entry.set_range(start.map(d), stop.map(d)).unwrap();
        entry
    }

    fn index() -> KeyframeIndex {
        KeyframeIndex::parse_listing("1 0.0\n238 9.5\n495 19.8\n750 30.0\n").unwrap()
    }

    fn assert_disjoint(plan: &SplitPlan) {
        for pair in plan.items.windows(2) {
            let stop = pair[0].aligned_stop.expect("only the last item may be open-ended");
            let next_start = pair[1].aligned_start.unwrap_or(Decimal::ZERO);
            assert!(stop <= next_start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_adjacent_ranges_align_to_keyframes() {
        let entries = vec![
            clip("/v/trip.mkv", 0, Some("10"), Some("20")),
            clip("/v/trip.mkv", 1, Some("20"), Some("30")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, Some(&index())).unwrap();

        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].aligned_start, Some(d("9.5")));
        assert_eq!(plan.items[0].aligned_stop, Some(d("19.8")));
        assert_eq!(plan.items[1].aligned_start, Some(d("19.8")));
        assert_eq!(plan.items[1].aligned_stop, Some(d("30")));
        assert_eq!(plan.items[0].requested_start, Some(d("10")));
        assert!(plan.warnings.is_empty());
        assert_disjoint(&plan);
    }

    #[test]
    fn test_items_follow_cut_order_not_playlist_order() {
        let entries = vec![
            clip("/v/a.mkv", 0, Some("40"), Some("50")),
            clip("/v/a.mkv", 1, Some("5"), Some("15")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, None).unwrap();
        let orders: Vec<usize> = plan.items.iter().map(|i| i.order).collect();
        assert_eq!(orders, vec![1, 0]);
        let sequences: Vec<usize> = plan.items.iter().map(|i| i.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_shorter_earlier_range_pushes_later_start() {
        let entries = vec![
            clip("/v/a.mkv", 0, Some("0"), Some("12")),
            clip("/v/a.mkv", 1, Some("10"), Some("40")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, Some(&index())).unwrap();
        // start 10 aligns back to 9.5; the later clip is longer so it moves to
        // the first keyframe at or after 12
        assert_eq!(plan.items[0].aligned_stop, Some(d("12")));
        assert_eq!(plan.items[1].aligned_start, Some(d("19.8")));
        assert_disjoint(&plan);
    }

    #[test]
    fn test_duplicate_range_is_dropped_with_warning() {
        let entries = vec![
            clip("/v/a.mkv", 0, Some("5"), Some("20")),
            clip("/v/a.mkv", 1, Some("5"), Some("20")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, None).unwrap();
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].order, 0);
        assert_eq!(
            plan.warnings,
            vec![PlanWarning::CoveredRange { order: 1, covered_by: 0 }]
        );
    }

    #[test]
    fn test_range_without_room_after_keyframe_is_dropped() {
        // the next keyframe after 10 is 19.8, past the end of the second clip
        let entries = vec![
            clip("/v/a.mkv", 0, Some("0"), Some("10")),
            clip("/v/a.mkv", 1, Some("0"), Some("12")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, Some(&index())).unwrap();
        assert_eq!(plan.items.len(), 1);
        assert_eq!(
            plan.warnings,
            vec![PlanWarning::CoveredRange { order: 1, covered_by: 0 }]
        );
    }

    #[test]
    fn test_equal_starts_advance_the_longer_range() {
        let entries = vec![
            clip("/v/a.mkv", 0, Some("0"), Some("60")),
            clip("/v/a.mkv", 1, Some("0"), Some("20")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, None).unwrap();
        let orders: Vec<usize> = plan.items.iter().map(|i| i.order).collect();
        assert_eq!(orders, vec![1, 0]);
        assert_eq!(plan.items[1].aligned_start, Some(d("20")));
        assert_disjoint(&plan);
    }

    #[test]
    fn test_open_ended_range_is_shrunk() {
        let entries = vec![
            clip("/v/a.mkv", 0, Some("10"), None),
            clip("/v/a.mkv", 1, Some("30"), Some("40")),
        ];
        let plan = SplitPlanner::new("").plan(&entries, None).unwrap();
        assert_eq!(plan.items[0].aligned_stop, Some(d("30")));
        assert_eq!(plan.items[1].aligned_start, Some(d("30")));
        assert_disjoint(&plan);
    }

    #[test]
    fn test_start_before_first_keyframe_stays_unaligned() {
        let late = KeyframeIndex::parse_listing("100 4.0\n200 8.0").unwrap();
        let entries = vec![clip("/v/a.mkv", 0, Some("2"), Some("6"))];
        let plan = SplitPlanner::new("").plan(&entries, Some(&late)).unwrap();
        assert_eq!(plan.items[0].aligned_start, Some(d("2")));
        assert_eq!(
            plan.warnings,
            vec![PlanWarning::UnalignedStart { order: 0, start: d("2") }]
        );
    }

    #[test]
    fn test_output_naming() {
        let mut tagged = clip("/v/My Trip.mp4", 0, Some("0"), Some("10"));
        tagged.tags = vec!["Beach: day 1".to_string()];
        tagged.group = Some("Summer 2019".to_string());
        let plain = clip("/v/My Trip.mp4", 1, Some("10"), Some("20"));

        let plan = SplitPlanner::new("/out").plan([&tagged, &plain], None).unwrap();
        assert!(plan.is_remux());
        assert_eq!(plan.items[0].output_path, PathBuf::from("/out/Summer_2019/Beach-_day_1.MKV"));
        assert_eq!(plan.items[1].output_path, PathBuf::from("/out/My_Trip_Scene-002.MKV"));
        assert_eq!(plan.items[0].intermediate_name, "My Trip-001.MKV");
        assert_eq!(plan.items[1].intermediate_name, "My Trip-002.MKV");
    }

    #[test]
    fn test_non_remux_source_keeps_extension() {
        let entries = vec![clip("/v/old.AVI", 0, Some("1"), Some("2"))];
        let plan = SplitPlanner::new("").plan(&entries, None).unwrap();
        assert!(!plan.is_remux());
        assert_eq!(plan.items[0].output_path, PathBuf::from("old_Scene-001.AVI"));
    }

    #[test]
    fn test_colliding_names_are_deduplicated() {
        let mut first = clip("/v/a.mkv", 0, Some("0"), Some("10"));
        first.tags = vec!["Chorus".to_string()];
        let mut second = clip("/v/a.mkv", 1, Some("10"), Some("20"));
        second.tags = vec!["Chorus".to_string()];
        let mut third = clip("/v/a.mkv", 2, Some("20"), Some("30"));
        third.tags = vec!["Verse".to_string()];

        let plan = SplitPlanner::new("").plan([&first, &second, &third], None).unwrap();
        let names: Vec<PathBuf> = plan.items.iter().map(|i| i.output_path.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("Chorus-001.MKV"),
                PathBuf::from("Chorus-002.MKV"),
                PathBuf::from("Verse.MKV"),
            ]
        );
    }

    #[test]
    fn test_mixed_sources_are_rejected() {
        let entries = vec![
            clip("/v/a.mkv", 0, Some("0"), Some("10")),
            clip("/v/b.mkv", 1, Some("10"), Some("20")),
        ];
        let err = SplitPlanner::new("").plan(&entries, None).unwrap_err();
        match err {
            ScreencapError::AmbiguousSource { candidates } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_relative_entries_resolve_against_base_dir() {
        let entries = vec![
            clip("a.mkv", 0, Some("0"), Some("10")),
            clip("/lists/a.mkv", 1, Some("10"), Some("20")),
        ];
        let planner = SplitPlanner::new("").with_base_dir(Some(PathBuf::from("/lists")));
        let plan = planner.plan(&entries, None).unwrap();
        assert_eq!(plan.source, Locator::parse("/lists/a.mkv"));
        assert_eq!(plan.items.len(), 2);
    }
}
