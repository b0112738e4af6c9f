/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Property groups and cascaded-value records.
//!
//! Properties are resolved a group at a time: each group is a plain struct of
//! specified values, and each element carries at most one cascaded record per
//! group in its [`CascadedValues`]. Cascaded fields are either a declared
//! value or one of the CSS-wide keywords; [`PropertyGroup::resolve`] replaces
//! the keywords per CSS Cascading Level 4 (including the `all` shorthand).

use fonts::FontHandle;
use url::Url;

/// A fully opaque-to-premultiplication-free RGBA color.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Rgba {
        Rgba {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// The CSS-wide keywords accepted by the `all` shorthand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CssWideKeyword {
    Initial,
    Inherit,
    Unset,
}

/// One cascaded field: a declared value or a CSS-wide keyword.
/// `Undeclared` is the absence of a declaration within a declared group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cascaded<T> {
    Declared(T),
    Initial,
    Inherit,
    Unset,
    Undeclared,
}

impl<T> Default for Cascaded<T> {
    fn default() -> Cascaded<T> {
        Cascaded::Undeclared
    }
}

// ---------------------------------------------------------------------------
// Specified value atoms.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    None,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Float {
    None,
    Left,
    Right,
}

/// A specified length or percentage. Percentages are fractions (`0.5` = 50%).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LengthPercentage {
    Px(f32),
    Percentage(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LengthPercentageAuto {
    Px(f32),
    Percentage(f32),
    Auto,
}

/// `max-width` / `max-height`: `none` lifts the constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaxSize {
    Px(f32),
    Percentage(f32),
    None,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BorderWidth {
    Px(f32),
    Thin,
    Medium,
    Thick,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BorderStyle {
    None,
    Hidden,
    Dotted,
    Dashed,
    Solid,
    Double,
    Groove,
    Ridge,
    Inset,
    Outset,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntegerOrAuto {
    Integer(i32),
    Auto,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CssColor {
    Rgba(Rgba),
    CurrentColor,
    Transparent,
}

/// The stubbed font property: an explicit handle or no font at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FontSelection {
    Font(FontHandle),
    None,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackgroundImageSource {
    None,
    Url(Url),
}

/// The box a background layer is positioned against or clipped to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackgroundBox {
    BorderBox,
    PaddingBox,
    ContentBox,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundPosition {
    pub x: LengthPercentage,
    pub y: LengthPercentage,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackgroundSize {
    Explicit {
        width: LengthPercentageAuto,
        height: LengthPercentageAuto,
    },
    Contain,
    Cover,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackgroundRepeatKeyword {
    Repeat,
    NoRepeat,
    Space,
    Round,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackgroundRepeat {
    pub x: BackgroundRepeatKeyword,
    pub y: BackgroundRepeatKeyword,
}

// ---------------------------------------------------------------------------
// Group resolution machinery.

/// What an `Undeclared` field (or a missing group record) falls back to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fallback {
    Initial,
    Inherit,
}

pub struct FieldResolver<'a, G: PropertyGroup> {
    pub parent: &'a G,
    pub initial: &'a G,
    pub fallback: Fallback,
}

impl<'a, G: PropertyGroup> FieldResolver<'a, G> {
    pub fn field<T: Clone>(&self, cascaded: &Cascaded<T>, get: impl Fn(&G) -> T) -> T {
        match cascaded {
            Cascaded::Declared(value) => value.clone(),
            Cascaded::Initial => get(self.initial),
            Cascaded::Inherit => get(self.parent),
            Cascaded::Unset => {
                if G::INHERITED {
                    get(self.parent)
                } else {
                    get(self.initial)
                }
            },
            Cascaded::Undeclared => match self.fallback {
                Fallback::Initial => get(self.initial),
                Fallback::Inherit => get(self.parent),
            },
        }
    }
}

pub trait PropertyGroup: Clone + 'static {
    type Cascaded: Clone + Default + 'static;

    /// Whether the group's properties inherit by default.
    const INHERITED: bool;

    fn initial() -> Self;

    /// The element's cascaded record for this group, if any was declared.
    fn cascaded(values: &CascadedValues) -> Option<&Self::Cascaded>;

    /// Replaces keyword fields with concrete specified values.
    fn resolve(cascaded: &Self::Cascaded, resolver: &FieldResolver<'_, Self>) -> Self;
}

macro_rules! resolve_fields {
    ($cascaded:expr, $resolver:expr, $Group:ident { $($field:ident),+ $(,)? }) => {
        $Group {
            $($field: $resolver.field(&$cascaded.$field, |group| group.$field.clone())),+
        }
    };
}

macro_rules! property_group {
    (
        $(#[$meta:meta])*
        $Group:ident / $CascadedGroup:ident ($slot:ident, inherited = $inherited:expr) {
            $($field:ident: $ty:ty = $initial:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $Group {
            $(pub $field: $ty),+
        }

        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $CascadedGroup {
            $(pub $field: Cascaded<$ty>),+
        }

        impl PropertyGroup for $Group {
            type Cascaded = $CascadedGroup;
            const INHERITED: bool = $inherited;

            fn initial() -> $Group {
                $Group {
                    $($field: $initial),+
                }
            }

            fn cascaded(values: &CascadedValues) -> Option<&$CascadedGroup> {
                values.$slot.as_ref()
            }

            fn resolve(cascaded: &$CascadedGroup, resolver: &FieldResolver<'_, $Group>) -> $Group {
                resolve_fields!(cascaded, resolver, $Group { $($field),+ })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// The groups themselves.

property_group! {
    /// `display`, `position`, `float`.
    BoxStyle / CascadedBoxStyle (box_style, inherited = false) {
        display: Display = Display::Inline,
        position: Position = Position::Static,
        float: Float = Float::None,
    }
}

property_group! {
    /// `width`, `min-width`, `max-width`.
    ContentWidth / CascadedContentWidth (content_width, inherited = false) {
        width: LengthPercentageAuto = LengthPercentageAuto::Auto,
        min_width: LengthPercentage = LengthPercentage::Px(0.0),
        max_width: MaxSize = MaxSize::None,
    }
}

property_group! {
    /// The horizontal margins, borders, and padding.
    HorizontalEdges / CascadedHorizontalEdges (horizontal_edges, inherited = false) {
        margin_left: LengthPercentageAuto = LengthPercentageAuto::Px(0.0),
        margin_right: LengthPercentageAuto = LengthPercentageAuto::Px(0.0),
        border_left: BorderWidth = BorderWidth::Medium,
        border_right: BorderWidth = BorderWidth::Medium,
        padding_left: LengthPercentage = LengthPercentage::Px(0.0),
        padding_right: LengthPercentage = LengthPercentage::Px(0.0),
    }
}

property_group! {
    /// `height`, `min-height`, `max-height`.
    ContentHeight / CascadedContentHeight (content_height, inherited = false) {
        height: LengthPercentageAuto = LengthPercentageAuto::Auto,
        min_height: LengthPercentage = LengthPercentage::Px(0.0),
        max_height: MaxSize = MaxSize::None,
    }
}

property_group! {
    /// The vertical margins, borders, and padding.
    VerticalEdges / CascadedVerticalEdges (vertical_edges, inherited = false) {
        margin_top: LengthPercentageAuto = LengthPercentageAuto::Px(0.0),
        margin_bottom: LengthPercentageAuto = LengthPercentageAuto::Px(0.0),
        border_top: BorderWidth = BorderWidth::Medium,
        border_bottom: BorderWidth = BorderWidth::Medium,
        padding_top: LengthPercentage = LengthPercentage::Px(0.0),
        padding_bottom: LengthPercentage = LengthPercentage::Px(0.0),
    }
}

property_group! {
    BorderStyles / CascadedBorderStyles (border_styles, inherited = false) {
        top: BorderStyle = BorderStyle::None,
        right: BorderStyle = BorderStyle::None,
        bottom: BorderStyle = BorderStyle::None,
        left: BorderStyle = BorderStyle::None,
    }
}

property_group! {
    ZIndex / CascadedZIndex (z_index, inherited = false) {
        z_index: IntegerOrAuto = IntegerOrAuto::Auto,
    }
}

property_group! {
    /// `left`, `right`, `top`, `bottom`.
    Insets / CascadedInsets (insets, inherited = false) {
        left: LengthPercentageAuto = LengthPercentageAuto::Auto,
        right: LengthPercentageAuto = LengthPercentageAuto::Auto,
        top: LengthPercentageAuto = LengthPercentageAuto::Auto,
        bottom: LengthPercentageAuto = LengthPercentageAuto::Auto,
    }
}

property_group! {
    Font / CascadedFont (font, inherited = true) {
        font: FontSelection = FontSelection::None,
    }
}

property_group! {
    Color / CascadedColor (color, inherited = true) {
        color: CssColor = CssColor::Rgba(Rgba::BLACK),
    }
}

property_group! {
    BorderColors / CascadedBorderColors (border_colors, inherited = false) {
        top: CssColor = CssColor::CurrentColor,
        right: CssColor = CssColor::CurrentColor,
        bottom: CssColor = CssColor::CurrentColor,
        left: CssColor = CssColor::CurrentColor,
    }
}

property_group! {
    BackgroundColor / CascadedBackgroundColor (background_color, inherited = false) {
        color: CssColor = CssColor::Transparent,
    }
}

property_group! {
    /// `background-clip`, one entry per layer.
    BackgroundClip / CascadedBackgroundClip (background_clip, inherited = false) {
        clips: Vec<BackgroundBox> = vec![BackgroundBox::BorderBox],
    }
}

property_group! {
    /// The image-positioning background longhands, one entry per layer.
    /// Shorter lists repeat to cover every image, per CSS Backgrounds §2.
    Background / CascadedBackground (background, inherited = false) {
        images: Vec<BackgroundImageSource> = vec![BackgroundImageSource::None],
        origins: Vec<BackgroundBox> = vec![BackgroundBox::PaddingBox],
        positions: Vec<BackgroundPosition> = vec![BackgroundPosition {
            x: LengthPercentage::Percentage(0.0),
            y: LengthPercentage::Percentage(0.0),
        }],
        sizes: Vec<BackgroundSize> = vec![BackgroundSize::Explicit {
            width: LengthPercentageAuto::Auto,
            height: LengthPercentageAuto::Auto,
        }],
        repeats: Vec<BackgroundRepeat> = vec![BackgroundRepeat {
            x: BackgroundRepeatKeyword::Repeat,
            y: BackgroundRepeatKeyword::Repeat,
        }],
    }
}

// ---------------------------------------------------------------------------
// Per-element cascaded storage.

/// Everything the cascade produced for one element: a sparse set of group
/// records plus the optional `all` shorthand keyword.
///
/// None of the groups here are exempt from `all` (the exemptions are
/// `direction`, `unicode-bidi`, and custom properties, which this engine does
/// not model).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CascadedValues {
    pub all: Option<CssWideKeyword>,
    pub box_style: Option<CascadedBoxStyle>,
    pub content_width: Option<CascadedContentWidth>,
    pub horizontal_edges: Option<CascadedHorizontalEdges>,
    pub content_height: Option<CascadedContentHeight>,
    pub vertical_edges: Option<CascadedVerticalEdges>,
    pub border_styles: Option<CascadedBorderStyles>,
    pub z_index: Option<CascadedZIndex>,
    pub insets: Option<CascadedInsets>,
    pub font: Option<CascadedFont>,
    pub color: Option<CascadedColor>,
    pub border_colors: Option<CascadedBorderColors>,
    pub background_color: Option<CascadedBackgroundColor>,
    pub background_clip: Option<CascadedBackgroundClip>,
    pub background: Option<CascadedBackground>,
}

// ---------------------------------------------------------------------------
// Stages.

/// A resolution stage: which groups are computed together, and where their
/// computed values are cached.
pub trait Stage: 'static {
    type Styles: Clone + Default + 'static;
}

/// The box-generation stage: everything geometry needs.
pub enum BoxGen {}

/// The cosmetic stage: everything paint needs once geometry is final.
pub enum Cosmetic {}

#[derive(Clone, Debug, Default)]
pub struct BoxGenStyles {
    pub box_style: Option<BoxStyle>,
    pub content_width: Option<ContentWidth>,
    pub horizontal_edges: Option<HorizontalEdges>,
    pub content_height: Option<ContentHeight>,
    pub vertical_edges: Option<VerticalEdges>,
    pub border_styles: Option<BorderStyles>,
    pub insets: Option<Insets>,
    pub z_index: Option<ZIndex>,
    pub font: Option<Font>,
}

#[derive(Clone, Debug, Default)]
pub struct CosmeticStyles {
    pub box_style: Option<BoxStyle>,
    pub border_colors: Option<BorderColors>,
    pub border_styles: Option<BorderStyles>,
    pub background_color: Option<BackgroundColor>,
    pub background_clip: Option<BackgroundClip>,
    pub background: Option<Background>,
    pub color: Option<Color>,
    pub insets: Option<Insets>,
}

impl Stage for BoxGen {
    type Styles = BoxGenStyles;
}

impl Stage for Cosmetic {
    type Styles = CosmeticStyles;
}

/// A property group that participates in stage `S`.
pub trait StageGroup<S: Stage>: PropertyGroup {
    fn slot(styles: &mut S::Styles) -> &mut Option<Self>;
    fn get(styles: &S::Styles) -> Option<&Self>;
}

macro_rules! stage_group {
    ($Stage:ty, $Group:ty, $slot:ident) => {
        impl StageGroup<$Stage> for $Group {
            fn slot(styles: &mut <$Stage as Stage>::Styles) -> &mut Option<Self> {
                &mut styles.$slot
            }

            fn get(styles: &<$Stage as Stage>::Styles) -> Option<&Self> {
                styles.$slot.as_ref()
            }
        }
    };
}

stage_group!(BoxGen, BoxStyle, box_style);
stage_group!(BoxGen, ContentWidth, content_width);
stage_group!(BoxGen, HorizontalEdges, horizontal_edges);
stage_group!(BoxGen, ContentHeight, content_height);
stage_group!(BoxGen, VerticalEdges, vertical_edges);
stage_group!(BoxGen, BorderStyles, border_styles);
stage_group!(BoxGen, Insets, insets);
stage_group!(BoxGen, ZIndex, z_index);
stage_group!(BoxGen, Font, font);

stage_group!(Cosmetic, BoxStyle, box_style);
stage_group!(Cosmetic, BorderColors, border_colors);
stage_group!(Cosmetic, BorderStyles, border_styles);
stage_group!(Cosmetic, BackgroundColor, background_color);
stage_group!(Cosmetic, BackgroundClip, background_clip);
stage_group!(Cosmetic, Background, background);
stage_group!(Cosmetic, Color, color);
stage_group!(Cosmetic, Insets, insets);
