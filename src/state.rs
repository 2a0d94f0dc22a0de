//! Preference store.
//!
//! Every cyclic control is a plain enum whose click order lives in
//! [`Cycle::STOPS`]. Progress indicators and active flags are derived from
//! the value alone, so nothing can drift out of sync with what is applied.

use std::fmt;

/// A control that advances through a fixed list of states and then returns to
/// its default.
pub trait Cycle: Copy + PartialEq + Default + 'static {
    /// Non-default states in click order.
    const STOPS: &'static [Self];

    fn next(self) -> Self {
        match self.progress_index() {
            None => Self::STOPS.first().copied().unwrap_or_default(),
            Some(index) => Self::STOPS.get(index + 1).copied().unwrap_or_default(),
        }
    }

    /// Zero-based position among [`Cycle::STOPS`], `None` at default.
    fn progress_index(self) -> Option<usize> {
        Self::STOPS.iter().position(|stop| *stop == self)
    }

    fn is_default(self) -> bool {
        self == Self::default()
    }

    /// Clicks needed to come back to default from default.
    fn cycle_len() -> usize {
        Self::STOPS.len() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Saturation {
    #[default]
    Default,
    Low,
    High,
}

impl Cycle for Saturation {
    const STOPS: &'static [Self] = &[Self::Low, Self::High];
}

impl Saturation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Low => "low",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Contrast {
    #[default]
    Default,
    Low,
    High,
    Extra,
}

impl Cycle for Contrast {
    const STOPS: &'static [Self] = &[Self::Low, Self::High, Self::Extra];
}

impl Contrast {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Low => "low",
            Self::High => "high",
            Self::Extra => "extra",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "extra" => Self::Extra,
            _ => Self::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorFilters {
    pub invert: bool,
    pub grayscale: bool,
    pub saturation: Saturation,
    pub contrast: Contrast,
}

impl ColorFilters {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Link underline treatment, `style-0` through `style-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStyle {
    #[default]
    Default,
    Style0,
    Style1,
    Style2,
}

impl Cycle for LinkStyle {
    const STOPS: &'static [Self] = &[Self::Style0, Self::Style1, Self::Style2];
}

impl LinkStyle {
    pub fn index(self) -> Option<usize> {
        self.progress_index()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Style0 => "style-0",
            Self::Style1 => "style-1",
            Self::Style2 => "style-2",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "style-0" => Self::Style0,
            "style-1" => Self::Style1,
            "style-2" => Self::Style2,
            _ => Self::Default,
        }
    }
}

/// Document-wide text scale. `None` means unscaled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontScale(Option<f64>);

impl FontScale {
    pub const UNSET: Self = Self(None);
    pub const LARGE: Self = Self(Some(1.3));
    pub const LARGER: Self = Self(Some(1.5));
    pub const LARGEST: Self = Self(Some(1.8));

    /// Non-positive and non-finite factors collapse to unset.
    pub fn new(factor: f64) -> Self {
        if factor.is_finite() && factor > 0.0 {
            Self(Some(factor))
        } else {
            Self(None)
        }
    }

    pub fn factor(self) -> Option<f64> {
        self.0
    }

    /// The factor that is currently multiplied into displayed sizes.
    pub fn effective(self) -> f64 {
        self.0.unwrap_or(1.0)
    }
}

impl Cycle for FontScale {
    const STOPS: &'static [Self] = &[Self::LARGE, Self::LARGER, Self::LARGEST];

    /// Restored custom factors sit between stops; they count as default so
    /// the next click starts the cycle at 130%.
    fn progress_index(self) -> Option<usize> {
        let factor = self.0?;
        Self::STOPS.iter().position(|stop| {
            stop.0
                .map(|target| (target - factor).abs() < 0.05)
                .unwrap_or(false)
        })
    }

    fn is_default(self) -> bool {
        self.0.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineHeight {
    #[default]
    Default,
    Relaxed,
    Loose,
    Double,
}

impl Cycle for LineHeight {
    const STOPS: &'static [Self] = &[Self::Relaxed, Self::Loose, Self::Double];
}

impl LineHeight {
    pub fn multiplier(self) -> Option<f64> {
        match self {
            Self::Default => None,
            Self::Relaxed => Some(1.5),
            Self::Loose => Some(1.8),
            Self::Double => Some(2.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Relaxed => "line-height-0",
            Self::Loose => "line-height-1",
            Self::Double => "line-height-2",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "line-height-0" => Self::Relaxed,
            "line-height-1" => Self::Loose,
            "line-height-2" => Self::Double,
            _ => Self::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetterSpacing {
    #[default]
    Default,
    Narrow,
    Wide,
    Wider,
}

impl Cycle for LetterSpacing {
    const STOPS: &'static [Self] = &[Self::Narrow, Self::Wide, Self::Wider];
}

impl LetterSpacing {
    /// Inline CSS value, empty at default.
    pub fn css_value(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Narrow => "0.1rem",
            Self::Wide => "0.2rem",
            Self::Wider => "0.3rem",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "0.1rem" => Self::Narrow,
            "0.2rem" => Self::Wide,
            "0.3rem" => Self::Wider,
            _ => Self::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Unset,
    Start,
    Center,
    End,
    Justify,
}

impl Cycle for TextAlign {
    const STOPS: &'static [Self] = &[Self::Start, Self::Center, Self::End, Self::Justify];
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Start => "start",
            Self::Center => "center",
            Self::End => "end",
            Self::Justify => "justify",
        }
    }

    /// Accepts the physical aliases older saves used.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" | "left" => Self::Start,
            "center" => Self::Center,
            "end" | "right" => Self::End,
            "justify" => Self::Justify,
            _ => Self::Unset,
        }
    }
}

impl fmt::Display for TextAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("default"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    Focus,
    Mask,
    Guide,
}

impl Cycle for CursorStyle {
    const STOPS: &'static [Self] = &[Self::Focus, Self::Mask, Self::Guide];
}

impl CursorStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Focus => "focus",
            Self::Mask => "mask",
            Self::Guide => "guide",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "focus" => Self::Focus,
            "mask" => Self::Mask,
            "guide" => Self::Guide,
            _ => Self::Default,
        }
    }

    /// Overlay class, `cursor-0` through `cursor-2`.
    pub fn overlay_class(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Focus => Some("cursor-0"),
            Self::Mask => Some("cursor-1"),
            Self::Guide => Some("cursor-2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DockPosition {
    Left,
    Top,
    Bottom,
    Right,
    #[default]
    BottomLeft,
    BottomRight,
}

impl DockPosition {
    pub const ALL: [DockPosition; 6] = [
        Self::Left,
        Self::Top,
        Self::Bottom,
        Self::Right,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Right => "right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Accepts bare names as well as `align-a11y-stiac-*` control ids and
    /// class names.
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        let bare = lowered
            .strip_prefix("align-a11y-stiac-")
            .unwrap_or(&lowered);
        Self::ALL.into_iter().find(|position| position.as_str() == bare)
    }

    /// Id of the chrome button that docks the widget here. The side
    /// placements are drawn as the top corners.
    pub fn control_id(self) -> &'static str {
        match self {
            Self::Left => "align-a11y-stiac-top-left",
            Self::Top => "align-a11y-stiac-top",
            Self::Bottom => "align-a11y-stiac-bottom",
            Self::Right => "align-a11y-stiac-top-right",
            Self::BottomLeft => "align-a11y-stiac-bottom-left",
            Self::BottomRight => "align-a11y-stiac-bottom-right",
        }
    }

    pub fn from_control_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|position| position.control_id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Language {
    #[default]
    En,
    It,
    Fr,
    De,
    Es,
    Pt,
}

impl Language {
    pub const ALL: [Language; 6] = [Self::En, Self::It, Self::Fr, Self::De, Self::Es, Self::Pt];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::It => "it",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Es => "es",
            Self::Pt => "pt",
        }
    }

    /// Exact code or the base tag of a regional one (`pt-BR` → `pt`).
    pub fn from_code(code: &str) -> Option<Self> {
        let lowered = code.trim().to_ascii_lowercase().replace('_', "-");
        let base = lowered.split('-').next().unwrap_or_default();
        Self::ALL.into_iter().find(|language| language.code() == base)
    }
}

/// The user's explicit reduce-motion choice layered over the OS setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionPreference {
    pub user: Option<bool>,
    pub system: bool,
}

impl MotionPreference {
    pub fn effective(self) -> bool {
        self.user.unwrap_or(self.system)
    }

    /// A user choice exists, so OS changes are ignored.
    pub fn locked(self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreferenceState {
    pub color_filters: ColorFilters,
    pub link_style: LinkStyle,
    pub font_scale: FontScale,
    pub line_height: LineHeight,
    pub letter_spacing: LetterSpacing,
    pub text_align: TextAlign,
    pub dyslexia_font: bool,
    pub hide_images: bool,
    pub hide_video: bool,
    pub reduce_motion: MotionPreference,
    pub cursor_style: CursorStyle,
    pub dock_position: DockPosition,
    pub language: Language,
}

impl PreferenceState {
    pub fn with_position(dock_position: DockPosition) -> Self {
        Self {
            dock_position,
            ..Self::default()
        }
    }
}

/// Owns the single [`PreferenceState`] of one widget instance. Transitions
/// only touch memory; callers apply and persist the result.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    state: PreferenceState,
    default_position: DockPosition,
}

impl PreferenceStore {
    pub fn new(default_position: DockPosition) -> Self {
        Self {
            state: PreferenceState::with_position(default_position),
            default_position,
        }
    }

    pub fn get(&self) -> &PreferenceState {
        &self.state
    }

    /// Adopts a restored state, keeping the OS motion preference observed so
    /// far when the restored one did not carry a user choice.
    pub fn replace(&mut self, state: PreferenceState) {
        let system = self.state.reduce_motion.system;
        self.state = state;
        self.state.reduce_motion.system = system;
    }

    pub fn toggle_invert(&mut self) -> bool {
        self.state.color_filters.invert = !self.state.color_filters.invert;
        self.state.color_filters.invert
    }

    pub fn toggle_grayscale(&mut self) -> bool {
        self.state.color_filters.grayscale = !self.state.color_filters.grayscale;
        self.state.color_filters.grayscale
    }

    pub fn cycle_saturation(&mut self) -> Saturation {
        self.state.color_filters.saturation = self.state.color_filters.saturation.next();
        self.state.color_filters.saturation
    }

    pub fn cycle_contrast(&mut self) -> Contrast {
        self.state.color_filters.contrast = self.state.color_filters.contrast.next();
        self.state.color_filters.contrast
    }

    pub fn cycle_link_style(&mut self) -> LinkStyle {
        self.state.link_style = self.state.link_style.next();
        self.state.link_style
    }

    pub fn cycle_font_scale(&mut self) -> FontScale {
        self.state.font_scale = self.state.font_scale.next();
        self.state.font_scale
    }

    pub fn cycle_line_height(&mut self) -> LineHeight {
        self.state.line_height = self.state.line_height.next();
        self.state.line_height
    }

    pub fn cycle_letter_spacing(&mut self) -> LetterSpacing {
        self.state.letter_spacing = self.state.letter_spacing.next();
        self.state.letter_spacing
    }

    pub fn cycle_text_align(&mut self) -> TextAlign {
        self.state.text_align = self.state.text_align.next();
        self.state.text_align
    }

    pub fn toggle_dyslexia_font(&mut self) -> bool {
        self.state.dyslexia_font = !self.state.dyslexia_font;
        self.state.dyslexia_font
    }

    pub fn toggle_hide_images(&mut self) -> bool {
        self.state.hide_images = !self.state.hide_images;
        self.state.hide_images
    }

    pub fn toggle_hide_video(&mut self) -> bool {
        self.state.hide_video = !self.state.hide_video;
        self.state.hide_video
    }

    /// Flips the effective value and locks it against OS changes.
    pub fn toggle_reduce_motion(&mut self) -> bool {
        let next = !self.state.reduce_motion.effective();
        self.state.reduce_motion.user = Some(next);
        next
    }

    /// Records the OS `prefers-reduced-motion` value and returns the
    /// resulting effective preference.
    pub fn set_system_reduce_motion(&mut self, reduce: bool) -> bool {
        self.state.reduce_motion.system = reduce;
        self.state.reduce_motion.effective()
    }

    pub fn cycle_cursor(&mut self) -> CursorStyle {
        self.state.cursor_style = self.state.cursor_style.next();
        self.state.cursor_style
    }

    pub fn set_dock_position(&mut self, position: DockPosition) {
        self.state.dock_position = position;
    }

    pub fn set_language(&mut self, language: Language) {
        self.state.language = language;
    }

    /// Every adjustment back to its initial value in one step. The OS motion
    /// preference survives, so reduce motion falls back to it. Language is
    /// owned by the i18n layer and is left alone.
    pub fn reset(&mut self) {
        let system = self.state.reduce_motion.system;
        let language = self.state.language;
        self.state = PreferenceState::with_position(self.default_position);
        self.state.reduce_motion.system = system;
        self.state.language = language;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk<T: Cycle + fmt::Debug>() -> Vec<T> {
        let mut seen = Vec::new();
        let mut value = T::default();
        for _ in 0..T::cycle_len() {
            value = value.next();
            seen.push(value);
        }
        seen
    }

    #[test]
    fn cycle_lengths_match_controls() {
        assert_eq!(Saturation::cycle_len(), 3);
        assert_eq!(Contrast::cycle_len(), 4);
        assert_eq!(LinkStyle::cycle_len(), 4);
        assert_eq!(FontScale::cycle_len(), 4);
        assert_eq!(LineHeight::cycle_len(), 4);
        assert_eq!(LetterSpacing::cycle_len(), 4);
        assert_eq!(TextAlign::cycle_len(), 5);
        assert_eq!(CursorStyle::cycle_len(), 4);
    }

    #[test]
    fn every_cycle_returns_to_default() {
        assert_eq!(walk::<Saturation>().last(), Some(&Saturation::Default));
        assert_eq!(walk::<Contrast>().last(), Some(&Contrast::Default));
        assert_eq!(walk::<LinkStyle>().last(), Some(&LinkStyle::Default));
        assert_eq!(walk::<FontScale>().last(), Some(&FontScale::UNSET));
        assert_eq!(walk::<LineHeight>().last(), Some(&LineHeight::Default));
        assert_eq!(walk::<LetterSpacing>().last(), Some(&LetterSpacing::Default));
        assert_eq!(walk::<CursorStyle>().last(), Some(&CursorStyle::Default));
        assert_eq!(
            walk::<TextAlign>(),
            vec![
                TextAlign::Start,
                TextAlign::Center,
                TextAlign::End,
                TextAlign::Justify,
                TextAlign::Unset
            ]
        );
    }

    #[test]
    fn custom_font_scale_restarts_cycle() {
        let custom = FontScale::new(1.2);
        assert_eq!(custom.progress_index(), None);
        assert!(!custom.is_default());
        assert_eq!(custom.next(), FontScale::LARGE);
        assert_eq!(FontScale::new(1.51).progress_index(), Some(1));
        assert_eq!(FontScale::new(-1.0), FontScale::UNSET);
    }

    #[test]
    fn reduce_motion_lock_and_reset() {
        let mut store = PreferenceStore::new(DockPosition::Right);
        assert!(store.set_system_reduce_motion(true));
        assert!(!store.get().reduce_motion.locked());

        assert!(!store.toggle_reduce_motion());
        assert!(store.get().reduce_motion.locked());
        assert!(!store.set_system_reduce_motion(true));

        store.set_dock_position(DockPosition::Top);
        store.set_language(Language::De);
        store.reset();
        assert!(store.get().reduce_motion.effective());
        assert!(!store.get().reduce_motion.locked());
        assert_eq!(store.get().dock_position, DockPosition::Right);
        assert_eq!(store.get().language, Language::De);
    }

    #[test]
    fn positions_accept_prefixed_names() {
        assert_eq!(
            DockPosition::parse("align-a11y-stiac-bottom-right"),
            Some(DockPosition::BottomRight)
        );
        assert_eq!(DockPosition::parse(" LEFT "), Some(DockPosition::Left));
        assert_eq!(DockPosition::parse("top-left"), None);
        assert_eq!(
            DockPosition::from_control_id("align-a11y-stiac-top-left"),
            Some(DockPosition::Left)
        );
        assert_eq!(Language::from_code("pt_BR"), Some(Language::Pt));
        assert_eq!(Language::from_code("nl"), None);
    }
}
