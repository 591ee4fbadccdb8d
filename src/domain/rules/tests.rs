// Unit tests for naming and labelling rules

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::domain::model::*;
    use crate::domain::rules::*;

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("My Clip: part 1/2"), "My_Clip-_part_1-2");
        assert_eq!(clean_filename("a<b>c&d;e"), "a-b-c-d-e");
        assert_eq!(clean_filename("plain"), "plain");
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Scene (2)"), "Scene");
        assert_eq!(sanitize_label("Scene (2)(2)"), "Scene");
        assert_eq!(sanitize_label("  Scene 2 "), "Scene 2");
    }

    #[test]
    fn test_splitext() {
        assert_eq!(splitext("movie.mkv"), ("movie", ".mkv"));
        assert_eq!(splitext("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(splitext("README"), ("README", ""));
        assert_eq!(splitext(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/srv/media/a.mp4"), "a.mp4");
        assert_eq!(basename("http://host/x/y.webm"), "y.webm");
        assert_eq!(basename(r"C:\videos\b.avi"), "b.avi");
        assert_eq!(basename("c.mov"), "c.mov");
    }

    #[test]
    fn test_insert_filename_suffix() {
        assert_eq!(insert_filename_suffix("clip.MKV", "-002"), "clip-002.MKV");
        assert_eq!(insert_filename_suffix("clip", "-002"), "clip-002");
    }

    #[test]
    fn test_needs_remux() {
        assert!(needs_remux(".mkv"));
        assert!(needs_remux(".MP4"));
        assert!(needs_remux(""));
        assert!(!needs_remux(".avi"));
        assert!(!needs_remux(".ts"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(duration_label(Decimal::from_str("65.4").unwrap()), "1:05");
        assert_eq!(duration_label(Decimal::from(3725)), "1:02:05");
        assert_eq!(size_label(1234567), "1,234,567 bytes");
        assert_eq!(size_label(999), "999 bytes");
        assert_eq!(quality_label(1920, 1080, 4_500_000), "2.1 Mpx @ 4.5 Mbit");
        assert_eq!(quality_label(1280, 720, 0), "0.9 Mpx");
    }

    #[test]
    fn test_video_quality_key_orders_reachable_and_wide_first() {
        let mut wide = Entry::new(Locator::parse("wide.mkv"), 0);
        wide.merge_metadata("width", json!(1920), MetaSource::Probe);
        let mut narrow = Entry::new(Locator::parse("narrow.mkv"), 1);
        narrow.merge_metadata("width", json!(640), MetaSource::Probe);
        let mut unreachable = Entry::new(Locator::parse("http://down/x.mkv"), 2);
        unreachable.merge_metadata("width", json!(3840), MetaSource::Probe);
        unreachable.mark_probed(false);

        let mut entries = vec![unreachable, narrow, wide];
        entries.sort_by_key(video_quality_key);
        let orders: Vec<usize> = entries.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }
}
