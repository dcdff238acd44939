#[cfg(test)]
mod tests {
    use crate::enhancements::ColorGrade;
    use crate::suggestions::{parse_caption_list, parse_color_grade, parse_scene_list};

    #[test]
    fn test_parse_clean_caption_array() {
        let input = r#"
        [
            { "text": "Hello there", "start": 0.0, "end": 1.2 },
            { "text": "General Kenobi", "start": 1.2, "end": 2.8 }
        ]
        "#;
        let captions = parse_caption_list(input).expect("Failed to parse clean captions");
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "Hello there");
        assert_eq!(captions[1].end, 2.8);
    }

    #[test]
    fn test_parse_markdown_wrapped_captions() {
        let input = r#"
        Here are your captions:
        ```json
        { "captions": [ { "text": "wrapped", "start": 0.5, "end": 1.0 } ] }
        ```
        Hope this helps!
        "#;
        let captions = parse_caption_list(input).expect("Failed to parse markdown captions");
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "wrapped");
    }

    #[test]
    fn test_caption_entry_without_text_is_dropped() {
        let input = r#"
        [
            { "start": 0.0, "end": 1.0 },
            { "text": "kept", "start": "oops", "end": 3.0 }
        ]
        "#;
        let captions = parse_caption_list(input).unwrap();
        // First entry has no text: dropped. Second has a malformed start:
        // field falls back to 0.0 but the entry survives.
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "kept");
        assert_eq!(captions[0].start, 0.0);
        assert_eq!(captions[0].end, 3.0);
    }

    #[test]
    fn test_caption_end_never_precedes_start() {
        let input = r#"[ { "text": "x", "start": 5.0, "end": 2.0 } ]"#;
        let captions = parse_caption_list(input).unwrap();
        assert_eq!(captions[0].end, 5.0);
    }

    #[test]
    fn test_no_json_at_all_is_an_error() {
        assert!(parse_caption_list("I could not find any speech.").is_err());
        assert!(parse_caption_list("").is_err());
    }

    #[test]
    fn test_parse_scene_list_drops_invalid_entries() {
        let input = r#"
        { "scenes": [
            { "start": 0.0, "end": 4.2, "label": "intro" },
            { "label": "no timestamps" },
            { "start": 4.2 }
        ] }
        "#;
        let scenes = parse_scene_list(input).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].label.as_deref(), Some("intro"));
        // Missing end collapses to the start
        assert_eq!(scenes[1].start, 4.2);
        assert_eq!(scenes[1].end, 4.2);
    }

    #[test]
    fn test_parse_color_grade_with_typed_fallbacks() {
        let input = r#"
        { "brightness": 0.2, "contrast": "punchy", "saturation": 1.4 }
        "#;
        let grade = parse_color_grade(input).unwrap();
        let neutral = ColorGrade::default();
        assert_eq!(grade.brightness, 0.2);
        // Wrong type falls back to the neutral value, not to zero
        assert_eq!(grade.contrast, neutral.contrast);
        assert_eq!(grade.saturation, 1.4);
        assert_eq!(grade.tint, neutral.tint);
    }

    #[test]
    fn test_parse_color_grade_clamps_out_of_range() {
        let input = r#"{ "brightness": 9.0, "saturation": -3.0 }"#;
        let grade = parse_color_grade(input).unwrap();
        assert_eq!(grade.brightness, 1.0);
        assert_eq!(grade.saturation, 0.0);
    }

    #[test]
    fn test_parse_color_grade_nested_under_key() {
        let input = r#"{ "color_grade": { "temperature": -0.3 } }"#;
        let grade = parse_color_grade(input).unwrap();
        assert_eq!(grade.temperature, -0.3);
        assert_eq!(grade.contrast, ColorGrade::default().contrast);
    }
}
