// Unit tests for business rules

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;
    use crate::domain::rules::*;

    fn segment(name: &str) -> Segment {
        Segment {
            id: SegmentId::new(),
            start_time: 0.0,
            end_time: 1.0,
            intro_path: None,
            output_name: name.to_string(),
        }
    }

    #[test]
    fn test_time_range_accepts_valid_range() {
        assert_eq!(TimeRangeRule::validate(0.0, 5.0, None).unwrap(), (0.0, 5.0));
    }

    #[test]
    fn test_time_range_rejects_inverted_and_empty() {
        assert!(matches!(
            TimeRangeRule::validate(5.0, 5.0, None),
            Err(DomainError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            TimeRangeRule::validate(6.0, 2.0, None),
            Err(DomainError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn test_time_range_rejects_negative_and_non_finite() {
        assert!(TimeRangeRule::validate(-1.0, 2.0, None).is_err());
        assert!(TimeRangeRule::validate(0.0, f64::NAN, None).is_err());
        assert!(TimeRangeRule::validate(f64::INFINITY, 2.0, None).is_err());
    }

    #[test]
    fn test_time_range_clamps_end_to_duration() {
        assert_eq!(
            TimeRangeRule::validate(10.0, 500.0, Some(120.0)).unwrap(),
            (10.0, 120.0)
        );
    }

    #[test]
    fn test_time_range_clamp_can_empty_the_range() {
        assert!(TimeRangeRule::validate(130.0, 140.0, Some(120.0)).is_err());
    }

    #[test]
    fn test_check_segment_names_the_segment() {
        let mut bad = segment("Intro");
        bad.end_time = 0.0;
        match TimeRangeRule::check_segment(&bad) {
            Err(DomainError::InvalidTimeRange(msg)) => assert!(msg.contains("Intro")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_auto_name_is_sequential() {
        assert_eq!(SegmentNaming::auto_name(0), "Segment_1");
        assert_eq!(SegmentNaming::auto_name(4), "Segment_5");
    }

    #[test]
    fn test_sanitize_replaces_path_separators() {
        assert_eq!(SegmentNaming::sanitize("a/b\\c:d"), "a_b_c_d");
        assert_eq!(SegmentNaming::sanitize("  ..hidden.. "), "hidden");
        assert_eq!(SegmentNaming::sanitize("Best Of 2024"), "Best Of 2024");
    }

    #[test]
    fn test_extension_is_trimmed_before_and_after_dots() {
        assert_eq!(SegmentNaming::extension("mp4"), "mp4");
        assert_eq!(SegmentNaming::extension(" mkv"), "mkv");
        assert_eq!(SegmentNaming::extension(" .mov\n"), "mov");
        assert_eq!(SegmentNaming::extension(". webm "), "webm");
        assert_eq!(SegmentNaming::extension(" . "), "");
    }

    #[test]
    fn test_empty_name_falls_back_to_index() {
        assert_eq!(SegmentNaming::file_stem("   ", 2), "segment_3");
        assert_eq!(SegmentNaming::file_stem("..", 0), "segment_1");
    }

    #[test]
    fn test_suffix_policy_disambiguates_case_insensitively() {
        let first = segment("Clip");
        let second = segment("clip");
        let mut resolver = CollisionResolver::new(CollisionPolicy::Suffix);

        assert_eq!(resolver.claim(&first, 0).unwrap(), "Clip");
        let resolved = resolver.claim(&second, 1).unwrap();
        assert_eq!(resolved, format!("clip_{}", second.id.short()));
    }

    #[test]
    fn test_error_policy_rejects_duplicates() {
        let mut resolver = CollisionResolver::new(CollisionPolicy::Error);
        resolver.claim(&segment("Clip"), 0).unwrap();
        assert!(matches!(
            resolver.claim(&segment("Clip"), 1),
            Err(DomainError::OutputCollision(_))
        ));
    }

    #[test]
    fn test_collision_policy_parse() {
        assert_eq!("SUFFIX".parse::<CollisionPolicy>().unwrap(), CollisionPolicy::Suffix);
        assert_eq!("error".parse::<CollisionPolicy>().unwrap(), CollisionPolicy::Error);
        assert!("overwrite".parse::<CollisionPolicy>().is_err());
        assert_eq!(CollisionPolicy::default(), CollisionPolicy::Suffix);
    }
}
