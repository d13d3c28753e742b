//! Chart renderers used by the report stages

use image::{Rgb, RgbImage};
use ndarray::{ArrayView2, Axis};

use super::text::{draw_text, draw_text_centered, draw_text_right, fit_text, text_width, tick_label, GLYPH_SIZE};
use super::{
    colors, draw_filled_rect, draw_horizontal_line, draw_line, draw_marker, draw_vertical_line,
    interpolate_color, value_range, Axis1D, Chart, ChartData, Series,
};
use crate::error::{Result, XaiError};
use crate::explainability::LocalExplanation;

const WIDTH: u32 = 800;
const MARGIN: u32 = 40;
/// Band above the plot area holding the title
const TITLE_HEIGHT: u32 = 40;
/// Band below the plot area holding ticks and the axis label
const AXIS_HEIGHT: u32 = 56;
/// Left column of row charts holding the row labels
const LABEL_WIDTH: u32 = 200;
/// Left edge of the line chart plot area, right of the y tick values
const LINE_LEFT: u32 = 72;
const ROW_HEIGHT: u32 = 28;
const BAR_THICKNESS: u32 = 18;
const TICKS: usize = 5;

fn canvas(height: u32) -> RgbImage {
    RgbImage::from_pixel(WIDTH, height, colors::WHITE)
}

fn rows_height(n_rows: usize) -> u32 {
    TITLE_HEIGHT + AXIS_HEIGHT + ROW_HEIGHT * n_rows.max(1) as u32
}

fn row_center(row: usize) -> u32 {
    TITLE_HEIGHT + ROW_HEIGHT * row as u32 + ROW_HEIGHT / 2
}

/// Large font when the title fits, small truncated font otherwise
fn draw_title(img: &mut RgbImage, title: &str) {
    let room = WIDTH - 2 * MARGIN;
    let scale = if text_width(title, 2) <= room { 2 } else { 1 };
    let text = fit_text(title, room, scale);
    let y = (TITLE_HEIGHT - GLYPH_SIZE * scale) / 2;
    draw_text_centered(img, WIDTH / 2, y, &text, scale, colors::BLACK);
}

/// Right-aligned labels in the left column, one per row
fn draw_row_labels<'a>(img: &mut RgbImage, labels: impl IntoIterator<Item = &'a str>) {
    for (row, label) in labels.into_iter().enumerate() {
        let text = fit_text(label, LABEL_WIDTH - 16, 1);
        draw_text_right(img, LABEL_WIDTH - 8, row_center(row) - GLYPH_SIZE / 2, &text, 1, colors::BLACK);
    }
}

/// Axis line at `y` with tick marks, tick values and a centred label below
fn draw_x_axis(img: &mut RgbImage, axis: &Axis1D, y: u32, (left, right): (u32, u32), label: &str) {
    draw_horizontal_line(img, y, left, right, colors::BLACK);
    for (value, px) in axis.ticks(TICKS) {
        draw_vertical_line(img, px, y, y + 4, colors::BLACK);
        draw_text_centered(img, px, y + 8, &tick_label(value, axis.span()), 1, colors::BLACK);
    }
    if !label.is_empty() {
        let text = fit_text(label, right - left, 1);
        draw_text_centered(img, (left + right) / 2, y + 28, &text, 1, colors::BLACK);
    }
}

/// Bottom edge of the last row, where row charts put their axis
fn rows_axis_y(height: u32) -> u32 {
    height - AXIS_HEIGHT + 4
}

/// Horizontal bar chart, first bar on top
#[derive(Debug, Clone)]
pub struct BarChart {
    title: String,
    x_label: String,
    bars: Vec<(String, f64)>,
    positive_color: Rgb<u8>,
    negative_color: Rgb<u8>,
}

impl BarChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            bars: Vec::new(),
            positive_color: colors::GREEN,
            negative_color: colors::RED,
        }
    }

    pub fn with_x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = label.into();
        self
    }

    pub fn with_colors(mut self, positive: Rgb<u8>, negative: Rgb<u8>) -> Self {
        self.positive_color = positive;
        self.negative_color = negative;
        self
    }

    pub fn with_bars(mut self, bars: impl IntoIterator<Item = (String, f64)>) -> Self {
        self.bars.extend(bars);
        self
    }

    pub fn render(&self) -> Chart {
        let height = rows_height(self.bars.len());
        let mut img = canvas(height);

        let (lo, hi) = value_range(self.bars.iter().map(|(_, v)| *v).chain([0.0]));
        let x_axis = Axis1D::new(lo, hi, LABEL_WIDTH, WIDTH - MARGIN);
        let zero = x_axis.map(0.0);

        for (row, (_, value)) in self.bars.iter().enumerate() {
            let end = x_axis.map(*value);
            let (left, right) = if end < zero { (end, zero) } else { (zero, end) };
            let color = if *value > 0.0 {
                self.positive_color
            } else {
                self.negative_color
            };
            draw_filled_rect(
                &mut img,
                left,
                row_center(row) - BAR_THICKNESS / 2,
                (right - left).max(1),
                BAR_THICKNESS,
                color,
            );
        }
        draw_vertical_line(&mut img, zero, TITLE_HEIGHT, rows_axis_y(height), colors::BLACK);
        draw_title(&mut img, &self.title);
        draw_row_labels(&mut img, self.bars.iter().map(|(name, _)| name.as_str()));
        draw_x_axis(&mut img, &x_axis, rows_axis_y(height), (LABEL_WIDTH, WIDTH - MARGIN), &self.x_label);

        let (labels, values): (Vec<String>, Vec<f64>) = self.bars.iter().cloned().unzip();
        Chart {
            image: img,
            data: ChartData {
                kind: "bar".to_string(),
                title: self.title.clone(),
                x_label: self.x_label.clone(),
                y_label: String::new(),
                series: vec![Series {
                    name: "value".to_string(),
                    labels,
                    values,
                }],
            },
        }
    }
}

/// Beeswarm of attributions, one row per feature in decreasing mean `|phi|`.
///
/// Points are coloured by the feature's value within its column range.
pub fn summary_plot(
    title: &str,
    values: &ArrayView2<'_, f64>,
    data: &ArrayView2<'_, f64>,
    feature_names: &[String],
    max_display: usize,
) -> Result<Chart> {
    if values.dim() != data.dim() || feature_names.len() != values.ncols() {
        return Err(XaiError::ShapeError {
            expected: format!("{:?} with {} names", data.dim(), values.ncols()),
            actual: format!("{:?} with {} names", values.dim(), feature_names.len()),
        });
    }

    let mean_abs: Vec<f64> = values
        .axis_iter(Axis(1))
        .map(|col| col.mapv(f64::abs).mean().unwrap_or(0.0))
        .collect();
    let mut order: Vec<usize> = (0..values.ncols()).collect();
    order.sort_by(|&a, &b| mean_abs[b].partial_cmp(&mean_abs[a]).unwrap_or(std::cmp::Ordering::Equal));
    order.truncate(max_display);

    let height = rows_height(order.len());
    let mut img = canvas(height);
    let (lo, hi) = value_range(values.iter().copied().chain([0.0]));
    let x_axis = Axis1D::new(lo, hi, LABEL_WIDTH, WIDTH - MARGIN);
    let x_label = "SHAP value (impact on model output)";

    for row in 0..order.len() {
        draw_horizontal_line(&mut img, row_center(row), LABEL_WIDTH, WIDTH - MARGIN, colors::LIGHT_GRAY);
    }
    draw_vertical_line(&mut img, x_axis.map(0.0), TITLE_HEIGHT, rows_axis_y(height), colors::GRAY);
    draw_title(&mut img, title);
    draw_row_labels(&mut img, order.iter().map(|&j| feature_names[j].as_str()));
    draw_x_axis(&mut img, &x_axis, rows_axis_y(height), (LABEL_WIDTH, WIDTH - MARGIN), x_label);
    // Feature-value colour key
    let key_y = rows_axis_y(height) + 28;
    draw_text(&mut img, WIDTH - MARGIN - 64, key_y, "low", 1, colors::LOW_VALUE);
    draw_text(&mut img, WIDTH - MARGIN - 32, key_y, "high", 1, colors::HIGH_VALUE);

    let mut series = Vec::with_capacity(order.len());
    for (row, &j) in order.iter().enumerate() {
        let column = data.column(j);
        let (vmin, vmax) = value_range(column.iter().copied());
        let span = if vmax > vmin { vmax - vmin } else { 1.0 };

        for (i, (&phi, &value)) in values.column(j).iter().zip(column.iter()).enumerate() {
            let jitter = ((i * 37) % 11) as i64 - 5;
            let y = (row_center(row) as i64 + jitter).max(0) as u32;
            let color = interpolate_color(colors::LOW_VALUE, colors::HIGH_VALUE, (value - vmin) / span);
            draw_marker(&mut img, x_axis.map(phi), y, 1, color);
        }

        series.push(Series {
            name: feature_names[j].clone(),
            labels: Vec::new(),
            values: values.column(j).to_vec(),
        });
    }

    Ok(Chart {
        image: img,
        data: ChartData {
            kind: "summary".to_string(),
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: "feature".to_string(),
            series,
        },
    })
}

/// Cumulative walk from the base value to the prediction.
///
/// Shows the `max_display - 1` largest contributions and folds the rest
/// into one trailing bar.
pub fn waterfall_plot(title: &str, explanation: &LocalExplanation, max_display: usize) -> Chart {
    let sorted = explanation.sorted_contributions();
    let shown = max_display.max(2) - 1;

    let mut steps: Vec<(String, f64)> = sorted
        .iter()
        .take(shown)
        .map(|c| (format!("{} = {:.3}", c.feature_name, c.feature_value), c.contribution))
        .collect();
    if sorted.len() > shown {
        let rest: f64 = sorted[shown..].iter().map(|c| c.contribution).sum();
        steps.push((format!("{} other features", sorted.len() - shown), rest));
    }

    // Bars are drawn bottom-up from the base value.
    let mut cumulative = explanation.base_value;
    let mut spans = Vec::with_capacity(steps.len());
    for (_, phi) in steps.iter().rev() {
        spans.push((cumulative, cumulative + phi));
        cumulative += phi;
    }
    spans.reverse();

    let (lo, hi) = value_range(
        spans
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .chain([explanation.base_value, explanation.prediction]),
    );
    let height = rows_height(steps.len());
    let mut img = canvas(height);
    let x_axis = Axis1D::new(lo, hi, LABEL_WIDTH, WIDTH - MARGIN);

    for (row, &(start, end)) in spans.iter().enumerate() {
        let (a, b) = (x_axis.map(start), x_axis.map(end));
        let (left, right) = if a < b { (a, b) } else { (b, a) };
        let color = if end > start { colors::HIGH_VALUE } else { colors::LOW_VALUE };
        draw_filled_rect(
            &mut img,
            left,
            row_center(row) - BAR_THICKNESS / 2,
            (right - left).max(1),
            BAR_THICKNESS,
            color,
        );
    }
    let axis_y = rows_axis_y(height);
    draw_vertical_line(&mut img, x_axis.map(explanation.base_value), TITLE_HEIGHT, axis_y, colors::GRAY);
    draw_vertical_line(&mut img, x_axis.map(explanation.prediction), TITLE_HEIGHT, axis_y, colors::BLACK);
    draw_title(&mut img, title);
    draw_row_labels(&mut img, steps.iter().map(|(label, _)| label.as_str()));
    let x_label = format!(
        "model output (base {:.3}, prediction {:.3})",
        explanation.base_value, explanation.prediction
    );
    draw_x_axis(&mut img, &x_axis, axis_y, (LABEL_WIDTH, WIDTH - MARGIN), &x_label);

    let (labels, values): (Vec<String>, Vec<f64>) = steps.into_iter().unzip();
    Chart {
        image: img,
        data: ChartData {
            kind: "waterfall".to_string(),
            title: title.to_string(),
            x_label: "model output".to_string(),
            y_label: String::new(),
            series: vec![
                Series {
                    name: "contributions".to_string(),
                    labels,
                    values,
                },
                Series {
                    name: "base_value".to_string(),
                    labels: Vec::new(),
                    values: vec![explanation.base_value],
                },
                Series {
                    name: "prediction".to_string(),
                    labels: Vec::new(),
                    values: vec![explanation.prediction],
                },
            ],
        },
    }
}

/// Shaded interval around a line
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Line with markers over numeric x positions
pub fn line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    xs: &[f64],
    ys: &[f64],
    band: Option<&Band>,
) -> Result<Chart> {
    if xs.len() != ys.len() {
        return Err(XaiError::ShapeError {
            expected: format!("{} y values", xs.len()),
            actual: format!("{} y values", ys.len()),
        });
    }
    if let Some(band) = band {
        if band.lower.len() != xs.len() || band.upper.len() != xs.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} band bounds", xs.len()),
                actual: format!("{}/{} band bounds", band.lower.len(), band.upper.len()),
            });
        }
    }

    let height = 480;
    let mut img = canvas(height);
    let (x_lo, x_hi) = value_range(xs.iter().copied());
    let band_values = band
        .map(|b| b.lower.iter().chain(b.upper.iter()).copied().collect::<Vec<_>>())
        .unwrap_or_default();
    let (y_lo, y_hi) = value_range(ys.iter().copied().chain(band_values));
    let pad = ((y_hi - y_lo) * 0.1).max(0.05);
    let (top, bottom) = (TITLE_HEIGHT + 16, height - AXIS_HEIGHT);
    let x_axis = Axis1D::new(x_lo, x_hi, LINE_LEFT, WIDTH - MARGIN);
    // Pixel rows grow downwards
    let y_axis = Axis1D::new(y_lo - pad, y_hi + pad, bottom, top);

    draw_title(&mut img, title);
    draw_x_axis(&mut img, &x_axis, bottom, (LINE_LEFT, WIDTH - MARGIN), x_label);
    draw_vertical_line(&mut img, LINE_LEFT, top, bottom, colors::BLACK);
    for (value, py) in y_axis.ticks(TICKS) {
        draw_horizontal_line(&mut img, py, LINE_LEFT - 4, LINE_LEFT, colors::BLACK);
        draw_horizontal_line(&mut img, py, LINE_LEFT + 1, WIDTH - MARGIN, colors::LIGHT_GRAY);
        let text = fit_text(&tick_label(value, y_axis.span()), LINE_LEFT - 8, 1);
        draw_text_right(&mut img, LINE_LEFT - 6, py.saturating_sub(GLYPH_SIZE / 2), &text, 1, colors::BLACK);
    }
    let text = fit_text(y_label, WIDTH - LINE_LEFT - MARGIN, 1);
    draw_text(&mut img, LINE_LEFT, TITLE_HEIGHT, &text, 1, colors::BLACK);

    if let Some(band) = band {
        for i in 1..xs.len() {
            let (px0, px1) = (x_axis.map(xs[i - 1]), x_axis.map(xs[i]));
            for px in px0..=px1 {
                let t = if px1 > px0 {
                    (px - px0) as f64 / (px1 - px0) as f64
                } else {
                    0.0
                };
                let lower = band.lower[i - 1] + t * (band.lower[i] - band.lower[i - 1]);
                let upper = band.upper[i - 1] + t * (band.upper[i] - band.upper[i - 1]);
                draw_vertical_line(&mut img, px, y_axis.map(upper), y_axis.map(lower), colors::LIGHT_BLUE);
            }
        }
    }

    let points: Vec<(u32, u32)> = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| (x_axis.map(x), y_axis.map(y)))
        .collect();
    for pair in points.windows(2) {
        draw_line(&mut img, pair[0], pair[1], colors::BLUE);
    }
    for &(x, y) in &points {
        draw_marker(&mut img, x, y, 3, colors::BLUE);
    }

    let mut series = vec![
        Series {
            name: "x".to_string(),
            labels: Vec::new(),
            values: xs.to_vec(),
        },
        Series {
            name: "y".to_string(),
            labels: Vec::new(),
            values: ys.to_vec(),
        },
    ];
    if let Some(band) = band {
        series.push(Series {
            name: "lower".to_string(),
            labels: Vec::new(),
            values: band.lower.clone(),
        });
        series.push(Series {
            name: "upper".to_string(),
            labels: Vec::new(),
            values: band.upper.clone(),
        });
    }

    Ok(Chart {
        image: img,
        data: ChartData {
            kind: "line".to_string(),
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            series,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainability::FeatureContribution;
    use ndarray::array;

    #[test]
    fn test_bar_chart_colors() {
        let chart = BarChart::new("words")
            .with_colors(colors::RED, colors::BLUE)
            .with_bars(vec![("chest".to_string(), 0.4), ("mild".to_string(), -0.2)])
            .render();

        assert_eq!(chart.data.series[0].labels, vec!["chest", "mild"]);
        assert_eq!(chart.image.height(), rows_height(2));
        // right of the zero line on the first row is the positive colour
        let y = row_center(0);
        assert_eq!(*chart.image.get_pixel(WIDTH - MARGIN - 2, y), colors::RED);
        assert_eq!(*chart.image.get_pixel(LABEL_WIDTH + 1, row_center(1)), colors::BLUE);
    }

    fn inked(img: &RgbImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32)) -> bool {
        (y0..y1).any(|y| (x0..x1).any(|x| *img.get_pixel(x, y) != colors::WHITE))
    }

    #[test]
    fn test_bar_chart_draws_labels_and_title() {
        let chart = BarChart::new("LIME Local Explanation (Instance 0)")
            .with_x_label("weight")
            .with_bars(vec![("cp".to_string(), 0.4), ("thal".to_string(), -0.2)])
            .render();
        let img = &chart.image;

        assert!(inked(img, (0, 0), (WIDTH, TITLE_HEIGHT)), "title band");
        for row in 0..2 {
            let y = row_center(row);
            assert!(inked(img, (0, y - 4), (LABEL_WIDTH, y + 4)), "label of row {}", row);
        }
        let axis_y = rows_axis_y(img.height());
        assert!(inked(img, (LABEL_WIDTH, axis_y + 8), (WIDTH, axis_y + 16)), "tick values");
        assert!(inked(img, (LABEL_WIDTH, axis_y + 28), (WIDTH, axis_y + 36)), "axis label");
    }

    #[test]
    fn test_label_column_blank_without_bars() {
        let chart = BarChart::new("").render();
        assert!(!inked(&chart.image, (0, 0), (LABEL_WIDTH, rows_axis_y(chart.image.height()))));
    }

    #[test]
    fn test_summary_orders_by_importance() {
        let values = array![[0.1, -2.0], [0.0, 1.0]];
        let data = array![[1.0, 5.0], [2.0, 6.0]];
        let names = vec!["age".to_string(), "cp".to_string()];
        let chart = summary_plot("rf", &values.view(), &data.view(), &names, 20).unwrap();

        assert_eq!(chart.data.series[0].name, "cp");
        assert_eq!(chart.data.series[1].values, vec![0.1, 0.0]);
        assert!(summary_plot("rf", &values.view(), &data.view(), &names[..1], 20).is_err());
    }

    #[test]
    fn test_waterfall_folds_remainder() {
        let explanation = LocalExplanation {
            instance_index: 0,
            base_value: 0.5,
            prediction: 0.8,
            contributions: (0..4)
                .map(|j| FeatureContribution {
                    feature_index: j,
                    feature_name: format!("f{}", j),
                    feature_value: 1.0,
                    contribution: 0.1 * (j as f64) - 0.05,
                })
                .collect(),
        };
        let chart = waterfall_plot("local", &explanation, 3);
        let steps = &chart.data.series[0];

        assert_eq!(steps.labels.len(), 3);
        assert!(steps.labels[2].starts_with("2 other"));
        assert!(steps.labels[0].starts_with("f3"));
    }

    #[test]
    fn test_line_chart_band_shape() {
        let xs = [0.01, 0.1, 0.5];
        let ys = [0.9, 0.7, 0.4];
        let band = Band {
            lower: vec![0.8, 0.6, 0.3],
            upper: vec![1.0, 0.8, 0.5],
        };
        let chart = line_chart("s", "noise", "rho", &xs, &ys, Some(&band)).unwrap();
        assert_eq!(chart.data.series.len(), 4);

        let short = Band {
            lower: vec![0.0],
            upper: vec![1.0],
        };
        assert!(line_chart("s", "noise", "rho", &xs, &ys, Some(&short)).is_err());
        assert!(line_chart("s", "noise", "rho", &xs, &ys[..2], None).is_err());
    }

    #[test]
    fn test_line_chart_draws_tick_values() {
        let chart = line_chart("Stability", "noise", "rho", &[0.0, 0.5], &[1.0, 0.6], None).unwrap();
        let img = &chart.image;
        assert!(inked(img, (0, 0), (WIDTH, TITLE_HEIGHT)));
        // y tick values left of the plot area
        assert!(inked(img, (0, TITLE_HEIGHT + 16), (LINE_LEFT - 4, img.height() - AXIS_HEIGHT)));
    }
}
