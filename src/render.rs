//! Styled QR rendering.
//!
//! Matrix encoding is delegated to the `qrcode` crate. This module turns the
//! matrix plus a [`Settings`] snapshot into a scene of filled primitives and
//! produces a [`Rendered`] surface from it: an RGBA raster (for PNG and the
//! PDF page) and SVG markup built from the same scene.

use std::f32::consts::FRAC_PI_4;
use std::fmt::Write as _;
use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use qrcode::{Color, QrCode};
use thiserror::Error;
use tracing::debug;

use crate::settings::{ErrorCorrection, Rgb, Settings, SettingsError, Shape};

/// Blank space kept around the logo, in pixels.
pub const LOGO_MARGIN: u32 = 5;

/// Rotation of the gradient axis, in radians.
pub const GRADIENT_ROTATION: f32 = FRAC_PI_4;

/// Finder patterns are 7x7 modules.
const FINDER: usize = 7;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to encode")]
    EmptyContent,

    #[error("Could not encode payload: {0}")]
    Encode(String),

    #[error("Invalid logo: {0}")]
    InvalidLogo(String),

    #[error("Size {size}px is too small for a {modules}x{modules} module code")]
    CanvasTooSmall { size: u32, modules: usize },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Shape of ordinary data modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotType {
    Square,
    Rounded,
    Dots,
    Classy,
}

/// Shape of the 7x7 finder frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerSquareType {
    Square,
    ExtraRounded,
    Dot,
}

/// Shape of the 3x3 finder center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerDotType {
    Square,
    Dot,
}

/// The three sub-styles a [`Shape`] preset expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    pub dots: DotType,
    pub corner_square: CornerSquareType,
    pub corner_dot: CornerDotType,
}

impl From<Shape> for RenderStyle {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Square => Self {
                dots: DotType::Square,
                corner_square: CornerSquareType::Square,
                corner_dot: CornerDotType::Square,
            },
            Shape::Rounded => Self {
                dots: DotType::Rounded,
                corner_square: CornerSquareType::ExtraRounded,
                corner_dot: CornerDotType::Dot,
            },
            Shape::Dots => Self {
                dots: DotType::Dots,
                corner_square: CornerSquareType::Dot,
                corner_dot: CornerDotType::Dot,
            },
            Shape::Diamond => Self {
                dots: DotType::Classy,
                corner_square: CornerSquareType::ExtraRounded,
                corner_dot: CornerDotType::Dot,
            },
        }
    }
}

/// Foreground fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Rgb),
    Linear { start: Rgb, end: Rgb, rotation: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Color(Rgb),
    Transparent,
}

/// A decoded logo image.
#[derive(Debug, Clone)]
pub struct Logo {
    data_url: String,
    image: DynamicImage,
    /// Logo edge relative to the canvas edge.
    pub size_ratio: f32,
}

impl Logo {
    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(data_url: &str, size_ratio: f32) -> Result<Self, RenderError> {
        let bytes = decode_data_url(data_url)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| RenderError::InvalidLogo(e.to_string()))?;
        Ok(Self {
            data_url: data_url.to_string(),
            image,
            size_ratio,
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Logo dimensions on a canvas of `canvas` pixels, preserving aspect.
    fn fitted(&self, canvas: u32) -> (u32, u32) {
        let max_edge = (canvas as f32 * self.size_ratio).round().max(1.0);
        let (w, h) = (self.image.width().max(1) as f32, self.image.height().max(1) as f32);
        let scale = max_edge / w.max(h);
        (
            ((w * scale).round() as u32).max(1),
            ((h * scale).round() as u32).max(1),
        )
    }
}

/// Extract the bytes of a base64 `data:` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, RenderError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::InvalidLogo("not a data URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::InvalidLogo("data URL has no payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(RenderError::InvalidLogo(
            "only base64 data URLs are supported".into(),
        ));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| RenderError::InvalidLogo(e.to_string()))
}

/// Build a base64 `data:` URL for `bytes`.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Everything the renderer needs, resolved from [`Settings`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub data: String,
    pub size: u32,
    pub style: RenderStyle,
    pub paint: Paint,
    pub background: Background,
    pub logo: Option<Logo>,
    pub error_correction: ErrorCorrection,
}

impl RenderOptions {
    pub fn from_settings(
        settings: &Settings,
        logo_data_url: Option<&str>,
    ) -> Result<Self, RenderError> {
        if settings.content.is_empty() {
            return Err(RenderError::EmptyContent);
        }
        settings.validate()?;

        let paint = if settings.gradient {
            Paint::Linear {
                start: Rgb::parse(&settings.gradient_start)?,
                end: Rgb::parse(&settings.gradient_end)?,
                rotation: GRADIENT_ROTATION,
            }
        } else {
            Paint::Solid(Rgb::parse(&settings.fg_color)?)
        };
        let background = if settings.transparent {
            Background::Transparent
        } else {
            Background::Color(Rgb::parse(&settings.bg_color)?)
        };
        let logo = logo_data_url
            .map(|url| Logo::from_data_url(url, settings.logo_size as f32 / 100.0))
            .transpose()?;

        Ok(Self {
            data: settings.content.clone(),
            size: settings.size,
            style: RenderStyle::from(settings.shape),
            paint,
            background,
            logo,
            error_correction: settings.error_correction,
        })
    }
}

/// A filled shape in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
enum Primitive {
    /// Rectangle with per-corner radii (top-left, top-right, bottom-right, bottom-left).
    RoundRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radii: [f32; 4],
    },
    Circle { cx: f32, cy: f32, r: f32 },
    /// `outer` with `inner` cut out.
    Frame {
        outer: Box<Primitive>,
        inner: Box<Primitive>,
    },
}

impl Primitive {
    fn square(x: f32, y: f32, s: f32) -> Self {
        Self::RoundRect {
            x,
            y,
            w: s,
            h: s,
            radii: [0.0; 4],
        }
    }

    fn rounded_square(x: f32, y: f32, s: f32, r: f32) -> Self {
        Self::RoundRect {
            x,
            y,
            w: s,
            h: s,
            radii: [r; 4],
        }
    }

    fn contains(&self, px: f32, py: f32) -> bool {
        match self {
            Self::RoundRect { x, y, w, h, radii } => {
                if px < *x || px > x + w || py < *y || py > y + h {
                    return false;
                }
                let [tl, tr, br, bl] = *radii;
                let corners = [
                    (tl, px < x + tl && py < y + tl, x + tl, y + tl),
                    (tr, px > x + w - tr && py < y + tr, x + w - tr, y + tr),
                    (br, px > x + w - br && py > y + h - br, x + w - br, y + h - br),
                    (bl, px < x + bl && py > y + h - bl, x + bl, y + h - bl),
                ];
                corners.iter().all(|&(r, inside_corner, cx, cy)| {
                    r <= 0.0 || !inside_corner || (px - cx).powi(2) + (py - cy).powi(2) <= r * r
                })
            }
            Self::Circle { cx, cy, r } => (px - cx).powi(2) + (py - cy).powi(2) <= r * r,
            Self::Frame { outer, inner } => outer.contains(px, py) && !inner.contains(px, py),
        }
    }

    /// Bounding box as (x, y, w, h).
    fn bounds(&self) -> (f32, f32, f32, f32) {
        match self {
            Self::RoundRect { x, y, w, h, .. } => (*x, *y, *w, *h),
            Self::Circle { cx, cy, r } => (cx - r, cy - r, r * 2.0, r * 2.0),
            Self::Frame { outer, .. } => outer.bounds(),
        }
    }

    /// SVG path data; frames rely on `fill-rule="evenodd"`.
    fn path_data(&self, out: &mut String) {
        match self {
            Self::RoundRect { x, y, w, h, radii } => {
                let [tl, tr, br, bl] = *radii;
                let _ = write!(
                    out,
                    "M{} {}H{}A{r1} {r1} 0 0 1 {} {}V{}A{r2} {r2} 0 0 1 {} {}H{}A{r3} {r3} 0 0 1 {} {}V{}A{r4} {r4} 0 0 1 {} {}Z",
                    num(x + tl),
                    num(*y),
                    num(x + w - tr),
                    num(x + w),
                    num(y + tr),
                    num(y + h - br),
                    num(x + w - br),
                    num(y + h),
                    num(x + bl),
                    num(*x),
                    num(y + h - bl),
                    num(y + tl),
                    num(x + tl),
                    num(*y),
                    r1 = num(tr),
                    r2 = num(br),
                    r3 = num(bl),
                    r4 = num(tl),
                );
            }
            Self::Circle { cx, cy, r } => {
                let _ = write!(
                    out,
                    "M{} {}a{r} {r} 0 1 0 {d} 0a{r} {r} 0 1 0 -{d} 0Z",
                    num(cx - r),
                    num(*cy),
                    r = num(*r),
                    d = num(r * 2.0),
                );
            }
            Self::Frame { outer, inner } => {
                outer.path_data(out);
                inner.path_data(out);
            }
        }
    }
}

/// Format a coordinate with at most two decimals.
fn num(v: f32) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Module grid placement on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Modules per side.
    pub modules: usize,
    /// Module edge in pixels.
    pub dot: f32,
    /// Offset of the grid from the canvas edge, in pixels.
    pub offset: f32,
}

impl Layout {
    fn new(size: u32, modules: usize) -> Self {
        let dot = (size as usize / modules.max(1)).max(1) as f32;
        let offset = ((size as f32 - dot * modules as f32) / 2.0).max(0.0).floor();
        Self {
            modules,
            dot,
            offset,
        }
    }

    /// Top-left pixel of module (col, row).
    pub fn origin(&self, col: usize, row: usize) -> (f32, f32) {
        (
            self.offset + col as f32 * self.dot,
            self.offset + row as f32 * self.dot,
        )
    }

    fn in_finder(&self, col: usize, row: usize) -> bool {
        let far = self.modules.saturating_sub(FINDER);
        (col < FINDER && row < FINDER)
            || (col >= far && row < FINDER)
            || (col < FINDER && row >= far)
    }

    fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.modules.saturating_sub(FINDER);
        [(0, 0), (far, 0), (0, far)]
    }
}

/// Pixel rectangle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where a logo lands: the cleared module area (margin included) and the
/// image drawn centered inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    pub area: LogoBox,
    pub image: LogoBox,
}

/// Share of modules each error-correction level can lose and still decode.
fn recoverable_fraction(level: ErrorCorrection) -> f32 {
    match level {
        ErrorCorrection::L => 0.07,
        ErrorCorrection::M => 0.15,
        ErrorCorrection::Q => 0.25,
        ErrorCorrection::H => 0.30,
    }
}

/// Largest odd count in `1..=cap` not above `n`.
fn odd_at_most(n: usize, cap: usize) -> usize {
    let n = n.clamp(1, cap.max(1));
    if n % 2 == 0 { n - 1 } else { n }
}

/// Place `logo` over the module grid.
///
/// The cleared area is snapped to whole modules around the center. Each axis
/// stays within `modules - 14` so the finder patterns are never covered, and
/// the number of hidden modules stays within what `level` can recover. The
/// image shrinks, keeping its aspect, when those bounds are tighter than the
/// requested size.
fn place_logo(
    logo: &Logo,
    layout: &Layout,
    size: u32,
    level: ErrorCorrection,
) -> LogoPlacement {
    let (w, h) = logo.fitted(size);
    let modules = layout.modules;
    let max_axis = modules.saturating_sub(2 * FINDER);
    let budget = recoverable_fraction(level) * (modules * modules) as f32;
    let max_hidden = (budget.floor() as usize).max(1);
    let covering = |px: u32| ((px + 2 * LOGO_MARGIN) as f32 / layout.dot).ceil() as usize;

    let mut hide_x = odd_at_most(covering(w), max_axis);
    let mut hide_y = odd_at_most(covering(h), max_axis);
    while hide_x * hide_y > max_hidden && (hide_x > 1 || hide_y > 1) {
        if hide_x >= hide_y {
            hide_x -= 2;
        } else {
            hide_y -= 2;
        }
    }

    let (x, y) = layout.origin((modules - hide_x) / 2, (modules - hide_y) / 2);
    let area = LogoBox {
        x: x as u32,
        y: y as u32,
        width: (hide_x as f32 * layout.dot) as u32,
        height: (hide_y as f32 * layout.dot) as u32,
    };

    let room_w = area.width.saturating_sub(2 * LOGO_MARGIN).max(1) as f32;
    let room_h = area.height.saturating_sub(2 * LOGO_MARGIN).max(1) as f32;
    let scale = (room_w / w as f32).min(room_h / h as f32).min(1.0);
    let iw = ((w as f32 * scale).round() as u32).max(1);
    let ih = ((h as f32 * scale).round() as u32).max(1);
    let image = LogoBox {
        x: area.x + (area.width.saturating_sub(iw)) / 2,
        y: area.y + (area.height.saturating_sub(ih)) / 2,
        width: iw,
        height: ih,
    };
    LogoPlacement { area, image }
}

/// A rendered code: the raster surface plus the scene it was drawn from.
#[derive(Debug, Clone)]
pub struct Rendered {
    data: String,
    size: u32,
    layout: Layout,
    paint: Paint,
    background: Background,
    scene: Vec<Primitive>,
    logo: Option<(Logo, LogoPlacement)>,
    image: RgbaImage,
}

impl Rendered {
    /// The encoded payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Area cleared of modules for the logo.
    pub fn logo_box(&self) -> Option<LogoBox> {
        self.logo.as_ref().map(|(_, p)| p.area)
    }

    pub fn logo_placement(&self) -> Option<LogoPlacement> {
        self.logo.as_ref().map(|(_, p)| *p)
    }

    /// PNG bytes of the raster surface.
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut png_bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
        Ok(png_bytes)
    }

    /// SVG markup of the scene.
    pub fn to_svg(&self) -> String {
        let s = self.size;
        let mut svg = String::with_capacity(4096 + self.scene.len() * 48);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{s}" height="{s}" viewBox="0 0 {s} {s}">"#
        );

        let fill = match self.paint {
            Paint::Solid(color) => color.to_hex(),
            Paint::Linear {
                start,
                end,
                rotation,
            } => {
                let ((x1, y1), (x2, y2)) = gradient_axis(s, rotation);
                let _ = write!(
                    svg,
                    r#"<defs><linearGradient id="qr-fill" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient></defs>"#,
                    num(x1),
                    num(y1),
                    num(x2),
                    num(y2),
                    start.to_hex(),
                    end.to_hex()
                );
                "url(#qr-fill)".to_string()
            }
        };

        if let Background::Color(bg) = self.background {
            let _ = write!(
                svg,
                r#"<rect width="{s}" height="{s}" fill="{}"/>"#,
                bg.to_hex()
            );
        }

        let mut path = String::with_capacity(self.scene.len() * 48);
        for primitive in &self.scene {
            primitive.path_data(&mut path);
        }
        let _ = write!(
            svg,
            r#"<path fill="{fill}" fill-rule="evenodd" d="{path}"/>"#
        );

        if let Some((logo, p)) = &self.logo {
            let _ = write!(
                svg,
                r#"<image x="{}" y="{}" width="{}" height="{}" href="{}"/>"#,
                p.image.x,
                p.image.y,
                p.image.width,
                p.image.height,
                logo.data_url()
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

/// Endpoints of the gradient axis through the canvas center, chosen so the
/// canvas corners project onto offsets 0 and 1.
fn gradient_axis(size: u32, rotation: f32) -> ((f32, f32), (f32, f32)) {
    let c = size as f32 / 2.0;
    let (sin, cos) = rotation.sin_cos();
    let half = (cos.abs() + sin.abs()) * c;
    ((c - half * cos, c - half * sin), (c + half * cos, c + half * sin))
}

fn paint_at(paint: Paint, size: u32, px: f32, py: f32) -> Rgb {
    match paint {
        Paint::Solid(color) => color,
        Paint::Linear {
            start,
            end,
            rotation,
        } => {
            let ((x1, y1), (x2, y2)) = gradient_axis(size, rotation);
            let (dx, dy) = (x2 - x1, y2 - y1);
            let len_sq = dx * dx + dy * dy;
            let t = if len_sq > 0.0 {
                ((px - x1) * dx + (py - y1) * dy) / len_sq
            } else {
                0.0
            };
            start.lerp(end, t)
        }
    }
}

fn dot_primitive(
    dots: DotType,
    x: f32,
    y: f32,
    s: f32,
    neighbors: (bool, bool, bool, bool),
) -> Primitive {
    let half = s / 2.0;
    match dots {
        DotType::Square => Primitive::square(x, y, s),
        DotType::Dots => Primitive::Circle {
            cx: x + half,
            cy: y + half,
            r: half,
        },
        DotType::Rounded => {
            let (top, right, bottom, left) = neighbors;
            let round = |a: bool, b: bool| if a || b { 0.0 } else { half };
            Primitive::RoundRect {
                x,
                y,
                w: s,
                h: s,
                radii: [
                    round(top, left),
                    round(top, right),
                    round(bottom, right),
                    round(bottom, left),
                ],
            }
        }
        DotType::Classy => Primitive::RoundRect {
            x,
            y,
            w: s,
            h: s,
            radii: [half, 0.0, half, 0.0],
        },
    }
}

fn corner_square_primitive(kind: CornerSquareType, x: f32, y: f32, dot: f32) -> Primitive {
    let outer = dot * FINDER as f32;
    let inner = outer - dot * 2.0;
    match kind {
        CornerSquareType::Square => Primitive::Frame {
            outer: Box::new(Primitive::square(x, y, outer)),
            inner: Box::new(Primitive::square(x + dot, y + dot, inner)),
        },
        CornerSquareType::ExtraRounded => Primitive::Frame {
            outer: Box::new(Primitive::rounded_square(x, y, outer, outer * 0.35)),
            inner: Box::new(Primitive::rounded_square(
                x + dot,
                y + dot,
                inner,
                inner * 0.3,
            )),
        },
        CornerSquareType::Dot => Primitive::Frame {
            outer: Box::new(Primitive::Circle {
                cx: x + outer / 2.0,
                cy: y + outer / 2.0,
                r: outer / 2.0,
            }),
            inner: Box::new(Primitive::Circle {
                cx: x + outer / 2.0,
                cy: y + outer / 2.0,
                r: inner / 2.0,
            }),
        },
    }
}

fn corner_dot_primitive(kind: CornerDotType, x: f32, y: f32, dot: f32) -> Primitive {
    let s = dot * 3.0;
    match kind {
        CornerDotType::Square => Primitive::square(x, y, s),
        CornerDotType::Dot => Primitive::Circle {
            cx: x + s / 2.0,
            cy: y + s / 2.0,
            r: s / 2.0,
        },
    }
}

/// Encode `options.data` and draw it.
pub fn render(options: &RenderOptions) -> Result<Rendered, RenderError> {
    if options.data.is_empty() {
        return Err(RenderError::EmptyContent);
    }
    let code = QrCode::with_error_correction_level(
        options.data.as_bytes(),
        options.error_correction.to_ec_level(),
    )
    .map_err(|e| RenderError::Encode(e.to_string()))?;

    let modules = code.width();
    let size = options.size;
    if (size as usize) < modules {
        return Err(RenderError::CanvasTooSmall { size, modules });
    }
    let colors = code.to_colors();
    let layout = Layout::new(size, modules);

    let logo = options.logo.as_ref().map(|logo| {
        let placement = place_logo(logo, &layout, size, options.error_correction);
        (logo.clone(), placement)
    });

    let hidden = |col: usize, row: usize| -> bool {
        let Some((_, p)) = &logo else {
            return false;
        };
        let b = p.area;
        let (x, y) = layout.origin(col, row);
        let (x2, y2) = (x + layout.dot, y + layout.dot);
        x < (b.x + b.width) as f32
            && x2 > b.x as f32
            && y < (b.y + b.height) as f32
            && y2 > b.y as f32
    };
    let drawn = |col: isize, row: isize| -> bool {
        if col < 0 || row < 0 || col as usize >= modules || row as usize >= modules {
            return false;
        }
        let (c, r) = (col as usize, row as usize);
        colors[r * modules + c] == Color::Dark && !layout.in_finder(c, r) && !hidden(c, r)
    };

    let mut scene = Vec::with_capacity(modules * modules / 2);
    for row in 0..modules {
        for col in 0..modules {
            let (c, r) = (col as isize, row as isize);
            if !drawn(c, r) {
                continue;
            }
            let (x, y) = layout.origin(col, row);
            let neighbors = (
                drawn(c, r - 1),
                drawn(c + 1, r),
                drawn(c, r + 1),
                drawn(c - 1, r),
            );
            scene.push(dot_primitive(options.style.dots, x, y, layout.dot, neighbors));
        }
    }
    for (col, row) in layout.finder_origins() {
        let (x, y) = layout.origin(col, row);
        scene.push(corner_square_primitive(
            options.style.corner_square,
            x,
            y,
            layout.dot,
        ));
        let (dx, dy) = layout.origin(col + 2, row + 2);
        scene.push(corner_dot_primitive(
            options.style.corner_dot,
            dx,
            dy,
            layout.dot,
        ));
    }

    let image = rasterize(size, &scene, options.paint, options.background, &logo);
    debug!(
        modules,
        size,
        primitives = scene.len(),
        logo = logo.is_some(),
        "render: drew code"
    );

    Ok(Rendered {
        data: options.data.clone(),
        size,
        layout,
        paint: options.paint,
        background: options.background,
        scene,
        logo,
        image,
    })
}

/// Render straight from settings.
pub fn render_settings(
    settings: &Settings,
    logo_data_url: Option<&str>,
) -> Result<Rendered, RenderError> {
    render(&RenderOptions::from_settings(settings, logo_data_url)?)
}

fn rasterize(
    size: u32,
    scene: &[Primitive],
    paint: Paint,
    background: Background,
    logo: &Option<(Logo, LogoPlacement)>,
) -> RgbaImage {
    let bg = match background {
        Background::Color(Rgb(r, g, b)) => Rgba([r, g, b, 255]),
        Background::Transparent => Rgba([0, 0, 0, 0]),
    };
    let mut image = RgbaImage::from_pixel(size, size, bg);

    for primitive in scene {
        let (bx, by, bw, bh) = primitive.bounds();
        let x0 = bx.floor().max(0.0) as u32;
        let y0 = by.floor().max(0.0) as u32;
        let x1 = ((bx + bw).ceil().max(0.0) as u32).min(size);
        let y1 = ((by + bh).ceil().max(0.0) as u32).min(size);
        for py in y0..y1 {
            for px in x0..x1 {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                if primitive.contains(cx, cy) {
                    let Rgb(r, g, b) = paint_at(paint, size, cx, cy);
                    image.put_pixel(px, py, Rgba([r, g, b, 255]));
                }
            }
        }
    }

    if let Some((logo, p)) = logo {
        let b = p.image;
        let scaled = logo
            .image
            .resize_exact(b.width, b.height, imageops::FilterType::Triangle)
            .to_rgba8();
        imageops::overlay(&mut image, &scaled, b.x as i64, b.y as i64);
    }

    image
}
