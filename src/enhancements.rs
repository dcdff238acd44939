use serde::{Deserialize, Serialize};

// Per-clip enhancement attributes. Every field is optional and independently
// settable; a clip fresh off a job has none of them.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClipAttributes {
    pub transition: Option<Transition>,
    pub playback_speed: Option<f64>,
    pub color_grade: Option<ColorGrade>,
    pub audio: Option<AudioMix>,
    pub text_overlay: Option<TextOverlay>,
    pub background: Option<BackgroundEdit>,
    pub scene_markers: Option<Vec<SceneMarker>>,
    pub captions: Option<Vec<Caption>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Cut,
    CrossFade { duration: f64 },
    FadeToBlack { duration: f64 },
}

// Neutral grade = identity. Offsets are 0.0, multipliers are 1.0.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColorGrade {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub temperature: f64,
    pub tint: f64,
}

impl Default for ColorGrade {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            temperature: 0.0,
            tint: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AudioMix {
    pub volume: f64,
    pub muted: bool,
}

impl Default for AudioMix {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

// Descriptor of an applied background replacement, e.g. "#00ff00".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackgroundEdit {
    pub target_color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneMarker {
    pub start: f64,
    pub end: f64,
    pub label: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

// A partial update merged into ClipAttributes. Some overwrites, None leaves
// the existing value alone.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AttributePatch {
    pub transition: Option<Transition>,
    pub playback_speed: Option<f64>,
    pub color_grade: Option<ColorGrade>,
    pub audio: Option<AudioMix>,
    pub text_overlay: Option<TextOverlay>,
    pub background: Option<BackgroundEdit>,
    pub scene_markers: Option<Vec<SceneMarker>>,
    pub captions: Option<Vec<Caption>>,
}

impl AttributePatch {
    pub fn apply(self, attrs: &mut ClipAttributes) {
        if let Some(v) = self.transition {
            attrs.transition = Some(v);
        }
        if let Some(v) = self.playback_speed {
            attrs.playback_speed = Some(v);
        }
        if let Some(v) = self.color_grade {
            attrs.color_grade = Some(v);
        }
        if let Some(v) = self.audio {
            attrs.audio = Some(v);
        }
        if let Some(v) = self.text_overlay {
            attrs.text_overlay = Some(v);
        }
        if let Some(v) = self.background {
            attrs.background = Some(v);
        }
        if let Some(v) = self.scene_markers {
            attrs.scene_markers = Some(v);
        }
        if let Some(v) = self.captions {
            attrs.captions = Some(v);
        }
    }

    pub fn captions(captions: Vec<Caption>) -> Self {
        Self {
            captions: Some(captions),
            ..Default::default()
        }
    }

    pub fn color_grade(grade: ColorGrade) -> Self {
        Self {
            color_grade: Some(grade),
            ..Default::default()
        }
    }

    pub fn scene_markers(markers: Vec<SceneMarker>) -> Self {
        Self {
            scene_markers: Some(markers),
            ..Default::default()
        }
    }

    pub fn background(edit: BackgroundEdit) -> Self {
        Self {
            background: Some(edit),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merges_without_clobbering() {
        let mut attrs = ClipAttributes::default();
        AttributePatch::captions(vec![Caption {
            text: "hello".to_string(),
            start: 0.0,
            end: 1.5,
        }])
        .apply(&mut attrs);

        // A later grade patch must not touch the captions
        AttributePatch::color_grade(ColorGrade::default()).apply(&mut attrs);

        assert_eq!(attrs.captions.as_ref().unwrap().len(), 1);
        assert_eq!(attrs.color_grade, Some(ColorGrade::default()));
        assert!(attrs.transition.is_none());
    }

    #[test]
    fn test_neutral_grade_is_identity() {
        let grade = ColorGrade::default();
        assert_eq!(grade.brightness, 0.0);
        assert_eq!(grade.contrast, 1.0);
        assert_eq!(grade.saturation, 1.0);
    }
}
