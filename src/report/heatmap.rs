// ============================================================
// Report — Confusion Matrix Heatmap
// ============================================================
// Renders an N×N confusion matrix to a PNG with plotters:
//
//              Confusion Matrix
//          ┌──────┬──────┬──────┐ ┌─┐ max
//   zero   │  10  │   0  │   0  │ │█│
//   one    │   1  │   9  │   0  │ │▓│
//   two    │   0  │   0  │  10  │ │░│ 0
//          └──────┴──────┴──────┘ └─┘
//  True       zero   one   two        (x ticks rotated 90°)
//                  Predicted
//
// Cells use a sequential blue ramp scaled to the largest count, and
// each cell is annotated with its integer count. Tick labels come from
// the caller, so the picture always matches the label registry it was
// drawn with.
//
// The chart is drawn into an in-memory RGB buffer and encoded with
// the image crate. Text needs a system font; when none can be loaded
// the heatmap is drawn again without any text.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use plotters::coord::combinators::BindKeyPoints;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::report::metrics::ConfusionMatrix;

const FONT: &str = "sans-serif";
const INK: RGBColor = RGBColor(38, 38, 38);

const MARGIN:    i32 = 10;
const CAPTION:   i32 = 36;
const BAR_WIDTH: i32 = 90;
const BAR_STEPS: usize = 64;

/// Longest tick label drawn before truncation.
const MAX_LABEL_CHARS: usize = 16;

/// Sequential blue ramp, light to dark.
const BLUES: [[u8; 3]; 9] = [
    [247, 251, 255],
    [222, 235, 247],
    [198, 219, 239],
    [158, 202, 225],
    [107, 174, 214],
    [66, 146, 198],
    [33, 113, 181],
    [8, 81, 156],
    [8, 48, 107],
];

/// Colour for `t` in [0,1], linearly interpolated between ramp stops.
pub fn ramp(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0) * (BLUES.len() - 1) as f64;
    let lo = t.floor() as usize;
    let hi = (lo + 1).min(BLUES.len() - 1);
    let frac = t - lo as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    [
        mix(BLUES[lo][0], BLUES[hi][0]),
        mix(BLUES[lo][1], BLUES[hi][1]),
        mix(BLUES[lo][2], BLUES[hi][2]),
    ]
}

fn blues(t: f64) -> RGBColor {
    let [r, g, b] = ramp(t);
    RGBColor(r, g, b)
}

fn intensity(count: u64, max: u64) -> f64 {
    if max == 0 { 0.0 } else { count as f64 / max as f64 }
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 2).collect();
        format!("{head}..")
    }
}

fn render_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Render(e.to_string())
}

/// Pixel geometry of one heatmap, derived from the class count and
/// the longest tick label.
struct Layout {
    cell:   i32,
    tick:   i32,
    left:   i32,
    bottom: i32,
    width:  u32,
    height: u32,
}

impl Layout {
    fn new(n: usize, labels: &[String]) -> Self {
        let cell = match n {
            0..=12 => 48,
            13..=30 => 32,
            _ => 20,
        };
        let tick = if cell >= 32 { 14 } else { 11 };
        let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(1) as i32;
        // Rough advance of one sans-serif glyph at the tick size
        let advance = tick * 6 / 10 + 1;

        let grid   = cell * n as i32;
        let left   = longest * advance + 2 * tick + 16;
        let bottom = longest * advance + 2 * tick + 16;
        Self {
            cell,
            tick,
            left,
            bottom,
            width:  (2 * MARGIN + left + grid + BAR_WIDTH) as u32,
            height: (2 * MARGIN + CAPTION + grid + bottom) as u32,
        }
    }
}

/// Draw `matrix` with `labels[i]` as the name of class i on both axes.
pub fn render_heatmap(matrix: &ConfusionMatrix, labels: &[String], title: &str) -> PipelineResult<Vec<u8>> {
    let n = matrix.size();
    if n == 0 {
        return Err(PipelineError::Render("cannot draw a 0×0 confusion matrix".into()));
    }
    if labels.len() != n {
        return Err(PipelineError::Render(format!(
            "{} tick labels for a {n}×{n} matrix",
            labels.len()
        )));
    }

    let labels: Vec<String> = labels.iter().map(|l| truncate(l)).collect();
    let lay = Layout::new(n, &labels);

    let image = rasterize(matrix, &labels, title, &lay, true).or_else(|e| {
        tracing::warn!("Heatmap text could not be drawn ({}); rendering without labels", e);
        rasterize(matrix, &labels, title, &lay, false)
    })?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| PipelineError::Render(format!("PNG encoding failed: {e}")))?;
    Ok(bytes)
}

fn rasterize(
    matrix:    &ConfusionMatrix,
    labels:    &[String],
    title:     &str,
    lay:       &Layout,
    with_text: bool,
) -> PipelineResult<RgbImage> {
    let mut pixels = vec![255u8; lay.width as usize * lay.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (lay.width, lay.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;
        let (grid_area, bar_area) = root.split_horizontally(lay.width as i32 - BAR_WIDTH);

        draw_grid(&grid_area, matrix, labels, title, lay, with_text)?;
        draw_colorbar(&bar_area, matrix.max_count(), lay, with_text)?;
        root.present().map_err(render_error)?;
    }
    RgbImage::from_raw(lay.width, lay.height, pixels)
        .ok_or_else(|| PipelineError::Render("pixel buffer does not match the chart size".into()))
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

/// Cells, counts, tick labels and axis names. Row 0 (true class 0) is
/// drawn at the top, so chart row y holds true class n-1-y.
fn draw_grid(
    area:      &Area<'_>,
    matrix:    &ConfusionMatrix,
    labels:    &[String],
    title:     &str,
    lay:       &Layout,
    with_text: bool,
) -> PipelineResult<()> {
    let n = matrix.size();
    let max = matrix.max_count();
    let span = n as f64;
    let centres: Vec<f64> = (0..n).map(|k| k as f64 + 0.5).collect();

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(MARGIN)
        .set_label_area_size(LabelAreaPosition::Left, lay.left)
        .set_label_area_size(LabelAreaPosition::Bottom, lay.bottom);
    if with_text {
        builder.caption(title, (FONT, 20));
    } else {
        builder.margin_top(MARGIN + CAPTION);
    }
    let mut chart = builder
        .build_cartesian_2d(
            (0.0..span).with_key_points(centres.clone()),
            (0.0..span).with_key_points(centres),
        )
        .map_err(render_error)?;

    let name = |k: usize| labels.get(k).cloned().unwrap_or_default();
    let x_name = |x: &f64| name(x.floor() as usize);
    let y_name = |y: &f64| name(n - 1 - (y.floor() as usize).min(n - 1));

    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh();
    if with_text {
        mesh.x_labels(n)
            .y_labels(n)
            .x_label_formatter(&x_name)
            .y_label_formatter(&y_name)
            .x_label_style((FONT, lay.tick).into_font().transform(FontTransform::Rotate90))
            .y_label_style((FONT, lay.tick))
            .x_desc("Predicted")
            .y_desc("True");
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw().map_err(render_error)?;

    let cells = || (0..n).flat_map(move |i| (0..n).map(move |j| (i, j)));
    let corner = |i: usize, j: usize| (j as f64, (n - 1 - i) as f64);

    chart
        .draw_series(cells().map(|(i, j)| {
            let (x, y) = corner(i, j);
            Rectangle::new([(x, y), (x + 1.0, y + 1.0)], blues(intensity(matrix.get(i, j), max)).filled())
        }))
        .map_err(render_error)?;
    chart
        .draw_series(cells().map(|(i, j)| {
            let (x, y) = corner(i, j);
            Rectangle::new([(x, y), (x + 1.0, y + 1.0)], WHITE.stroke_width(1))
        }))
        .map_err(render_error)?;

    if with_text {
        let size = if lay.cell >= 32 { lay.tick } else { lay.tick - 2 };
        chart
            .draw_series(cells().map(|(i, j)| {
                let count = matrix.get(i, j);
                let ink = if intensity(count, max) > 0.5 { WHITE } else { INK };
                let style = (FONT, size)
                    .into_font()
                    .color(&ink)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                let (x, y) = corner(i, j);
                Text::new(count.to_string(), (x + 0.5, y + 0.5), style)
            }))
            .map_err(render_error)?;
    }
    Ok(())
}

/// Vertical colour bar from 0 (bottom) to the largest count (top).
fn draw_colorbar(area: &Area<'_>, max: u64, lay: &Layout, with_text: bool) -> PipelineResult<()> {
    let top = max.max(1) as f64;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(MARGIN)
        .margin_left(12)
        .margin_top(MARGIN + CAPTION)
        .margin_bottom(MARGIN + lay.bottom)
        .set_label_area_size(LabelAreaPosition::Right, if with_text { 40 } else { 0 });
    let mut chart = builder.build_cartesian_2d(0.0..1.0, 0.0..top).map_err(render_error)?;

    let count_label = |v: &f64| format!("{v:.0}");
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh().x_labels(0);
    if with_text {
        mesh.y_labels(5)
            .y_label_formatter(&count_label)
            .y_label_style((FONT, lay.tick));
    } else {
        mesh.y_labels(0);
    }
    mesh.draw().map_err(render_error)?;

    let step = top / BAR_STEPS as f64;
    chart
        .draw_series((0..BAR_STEPS).map(|k| {
            let t = k as f64 / (BAR_STEPS - 1) as f64;
            Rectangle::new([(0.0, k as f64 * step), (1.0, (k + 1) as f64 * step)], blues(t).filled())
        }))
        .map_err(render_error)?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize) -> ConfusionMatrix {
        let truth: Vec<usize> = (0..n * 3).map(|i| i % n).collect();
        ConfusionMatrix::compute(&truth, &truth, n).unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("class {i}")).collect()
    }

    fn pixels_of(img: &RgbImage, colour: [u8; 3]) -> usize {
        img.pixels().filter(|p| p.0 == colour).count()
    }

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(ramp(0.0), [247, 251, 255]);
        assert_eq!(ramp(1.0), [8, 48, 107]);
        assert_eq!(ramp(7.0), [8, 48, 107]);
    }

    #[test]
    fn test_png_decodes_with_expected_geometry() {
        let png = render_heatmap(&matrix(10), &names(10), "Confusion Matrix").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        let lay = Layout::new(10, &names(10));
        assert_eq!((img.width(), img.height()), (lay.width, lay.height));
        assert!(img.width() > 10 * 48);
    }

    #[test]
    fn test_diagonal_cells_are_darkest() {
        // 3x3 diagonal: three cells at the max count, six empty cells
        let png = render_heatmap(&matrix(3), &names(3), "t").unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        let cell = 48 * 48;
        assert!(pixels_of(&img, ramp(1.0)) >= 3 * cell / 2);
        assert!(pixels_of(&img, ramp(0.0)) >= 6 * cell / 2);
    }

    #[test]
    fn test_textless_rendering_keeps_cell_colours() {
        let m = matrix(4);
        let labels = names(4);
        let lay = Layout::new(4, &labels);
        let img = rasterize(&m, &labels, "t", &lay, false).unwrap();
        assert_eq!(img.width(), lay.width);
        assert!(pixels_of(&img, ramp(1.0)) >= 4 * 48 * 48 / 2);
    }

    #[test]
    fn test_label_count_must_match_matrix() {
        let err = render_heatmap(&matrix(3), &names(2), "t").unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[test]
    fn test_empty_matrix_is_render_error() {
        let m = ConfusionMatrix::compute(&[], &[], 0).unwrap();
        assert!(matches!(render_heatmap(&m, &[], "empty"), Err(PipelineError::Render(_))));
    }

    #[test]
    fn test_long_labels_are_truncated() {
        assert_eq!(truncate("short"), "short");
        let long = truncate("a very long class name indeed");
        assert_eq!(long.chars().count(), MAX_LABEL_CHARS);
        assert!(long.ends_with(".."));
    }
}
