//! Chart rendering.
//!
//! Charts are drawn with plotters into PNG files. The renderer is built
//! with an explicit [`ChartConfig`] (fonts, sizes, histogram bins) and
//! only draws what the analysis already computed.

use crate::analysis::{captures_by_condition, filter_by_prefix, trend_points, Analysis};
use crate::config::ChartConfig;
use crate::models::{ExperimentFamily, RunRecord};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const COMPARISON_CHART: &str = "comparison_conditions.png";
pub const TIMELINE_CHART: &str = "predation_timeline.png";
pub const CONFUSION_CHART: &str = "confusion_effect.png";
pub const GROUPS_CHART: &str = "experiment_groups.png";

type ChartResult = Result<(), Box<dyn Error>>;
type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const FIRST_KILL_COLOR: RGBColor = RGBColor(0x34, 0x98, 0xdb);
const CAPTURE_RATE_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
const MEAN_LINE_COLOR: RGBColor = RGBColor(0x80, 0x80, 0x80);

/// Bar colour for a condition, by experiment family.
pub fn family_color(condition: &str) -> RGBColor {
    match ExperimentFamily::from_condition(condition) {
        Some(ExperimentFamily::Population) => RGBColor(0xe7, 0x4c, 0x3c),
        Some(ExperimentFamily::Cohesion) => RGBColor(0x34, 0x98, 0xdb),
        _ => RGBColor(0x2e, 0xcc, 0x71),
    }
}

/// Tick label for a categorical axis laid out at integer positions.
pub fn category_label(labels: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

/// Upper bound for a value axis: 10% headroom, never below 1.
pub fn axis_max<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    (values.into_iter().fold(0.0f64, f64::max) * 1.1).max(1.0)
}

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width bins spanning the values; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);
    let bins = bins.max(1);

    // A single distinct value gets one unit-wide bin around it
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (hi - lo) / bins as f64;

    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: lo + width * i as f64,
            end: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        result[idx].count += 1;
    }

    result
}

/// Renders the analysis charts into an output directory.
pub struct ChartRenderer {
    config: ChartConfig,
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(config: ChartConfig, output_dir: PathBuf) -> Self {
        Self { config, output_dir }
    }

    /// Render every chart, returning the file names that were written.
    ///
    /// A chart that fails to render is logged and skipped.
    pub fn render_all(&self, analysis: &Analysis) -> Vec<String> {
        let charts: [(&str, fn(&Self, &Path, &Analysis) -> ChartResult); 4] = [
            (COMPARISON_CHART, Self::render_comparison),
            (TIMELINE_CHART, Self::render_timeline),
            (CONFUSION_CHART, Self::render_confusion),
            (GROUPS_CHART, Self::render_groups),
        ];

        let mut written = Vec::new();
        for (name, render) in charts {
            let path = self.output_dir.join(name);
            match render(self, &path, analysis) {
                Ok(()) => {
                    info!("Saved chart: {}", path.display());
                    written.push(name.to_string());
                }
                Err(e) => warn!("Failed to render {}: {}", name, e),
            }
        }

        written
    }

    fn font(&self, size: u32) -> TextStyle<'_> {
        TextStyle::from(FontDesc::new(
            FontFamily::from(self.config.font_family.as_str()),
            f64::from(size),
            FontStyle::Normal,
        ))
    }

    fn caption_style(&self) -> TextStyle<'_> {
        self.font(self.config.caption_font_size)
    }

    fn label_style(&self) -> TextStyle<'_> {
        self.font(self.config.label_font_size)
    }

    fn size(&self, panels: u32) -> (u32, u32) {
        (self.config.panel_width * panels, self.config.panel_height)
    }

    fn draw_placeholder(&self, panel: &Panel<'_>, message: &str) -> ChartResult {
        let (w, h) = panel.dim_in_pixel();
        let style = self
            .caption_style()
            .pos(Pos::new(HPos::Center, VPos::Center));
        panel.draw_text(message, &style, (w as i32 / 2, h as i32 / 2))?;
        Ok(())
    }

    /// Per-condition bars for one metric, with an optional mean line.
    fn draw_condition_bars(
        &self,
        panel: &Panel<'_>,
        caption: &str,
        y_desc: &str,
        records: &[RunRecord],
        value: fn(&RunRecord) -> Option<f64>,
        mean: Option<(f64, String)>,
    ) -> ChartResult {
        if records.is_empty() {
            return self.draw_placeholder(panel, "No data");
        }

        let labels: Vec<String> = records.iter().map(|r| r.condition.clone()).collect();
        let n = records.len() as f64;
        let y_max = axis_max(records.iter().filter_map(value));

        let mut chart = ChartBuilder::on(panel)
            .caption(caption, self.caption_style())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5f64..(n - 0.5), 0.0f64..y_max)?;

        let formatter = |x: &f64| category_label(&labels, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(records.len() + 1)
            .x_label_formatter(&formatter)
            .x_desc("Condition")
            .y_desc(y_desc)
            .label_style(self.label_style())
            .draw()?;

        chart.draw_series(records.iter().enumerate().filter_map(|(i, r)| {
            let v = value(r)?;
            let x = i as f64;
            Some(Rectangle::new(
                [(x - 0.4, 0.0), (x + 0.4, v)],
                family_color(&r.condition).filled(),
            ))
        }))?;

        if let Some((mean, label)) = mean {
            chart
                .draw_series(LineSeries::new(
                    vec![(-0.5, mean), (n - 0.5, mean)],
                    MEAN_LINE_COLOR.stroke_width(2),
                ))?
                .label(label)
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MEAN_LINE_COLOR));

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font(self.label_style())
                .draw()?;
        }

        Ok(())
    }

    /// First kill time, capture rate and duration per condition.
    fn render_comparison(&self, path: &Path, analysis: &Analysis) -> ChartResult {
        let root = BitMapBackend::new(path, self.size(3)).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((1, 3));

        let records = &analysis.records;
        let first_kill_mean = analysis
            .overall
            .first_kill_time
            .mean
            .map(|m| (m, format!("Mean: {:.1}s", m)));
        let rate_mean = analysis
            .overall
            .capture_rate
            .mean
            .map(|m| (m, format!("Mean: {:.1}/min", m)));

        self.draw_condition_bars(
            &panels[0],
            "Time to First Kill",
            "First Kill Time (sec)",
            records,
            |r| r.first_kill_time,
            first_kill_mean,
        )?;
        self.draw_condition_bars(
            &panels[1],
            "Capture Rate",
            "Capture Rate (kills/min)",
            records,
            |r| r.capture_rate,
            rate_mean,
        )?;
        self.draw_condition_bars(
            &panels[2],
            "Total Duration",
            "Total Duration (sec)",
            records,
            |r| r.total_duration,
            None,
        )?;

        root.present()?;
        Ok(())
    }

    /// Cumulative kills over time, one series per condition.
    fn render_timeline(&self, path: &Path, analysis: &Analysis) -> ChartResult {
        let root = BitMapBackend::new(path, self.size(2)).into_drawing_area();
        root.fill(&WHITE)?;

        let grouped = captures_by_condition(&analysis.captures);
        let series: Vec<(&str, Vec<(f64, f64)>)> = grouped
            .iter()
            .map(|(condition, events)| {
                let points = events
                    .iter()
                    .filter_map(|e| Some((e.time_sec?, f64::from(e.kill_number?))))
                    .collect();
                (*condition, points)
            })
            .collect();

        if series.iter().all(|(_, points)| points.is_empty()) {
            self.draw_placeholder(&root, "No capture data")?;
            root.present()?;
            return Ok(());
        }

        let x_max = axis_max(series.iter().flat_map(|(_, p)| p.iter().map(|(x, _)| *x)));
        let y_max = axis_max(series.iter().flat_map(|(_, p)| p.iter().map(|(_, y)| *y)));

        let mut chart = ChartBuilder::on(&root)
            .caption("Predation Timeline by Condition", self.caption_style())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0f64..x_max, 0.0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Time (sec)")
            .y_desc("Cumulative Kills")
            .label_style(self.label_style())
            .draw()?;

        for (idx, (condition, points)) in series.into_iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))?
                .label(condition)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(self.label_style())
            .draw()?;

        root.present()?;
        Ok(())
    }

    /// Histogram of boids in view, and view size against next-capture delay.
    fn render_confusion(&self, path: &Path, analysis: &Analysis) -> ChartResult {
        let root = BitMapBackend::new(path, self.size(2)).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((1, 2));

        let in_view: Vec<f64> = analysis
            .captures
            .iter()
            .filter_map(|e| e.boids_in_view.map(f64::from))
            .collect();

        if in_view.is_empty() {
            self.draw_placeholder(&panels[0], "No boids_in_view data")?;
        } else {
            let bins = histogram(&in_view, self.config.histogram_bins);
            let x_min = bins.first().map_or(0.0, |b| b.start);
            let x_max = bins.last().map_or(1.0, |b| b.end);
            let y_max = axis_max(bins.iter().map(|b| b.count as f64));

            let mut chart = ChartBuilder::on(&panels[0])
                .caption("Boids in View at Capture", self.caption_style())
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, 0.0f64..y_max)?;

            chart
                .configure_mesh()
                .x_desc("Boids in View (at capture)")
                .y_desc("Frequency")
                .label_style(self.label_style())
                .draw()?;

            chart.draw_series(bins.iter().map(|b| {
                Rectangle::new(
                    [(b.start, 0.0), (b.end, b.count as f64)],
                    FIRST_KILL_COLOR.mix(0.7).filled(),
                )
            }))?;

            if let Some(median) = analysis.confusion.median_in_view {
                chart
                    .draw_series(LineSeries::new(
                        vec![(median, 0.0), (median, y_max)],
                        RED.stroke_width(2),
                    ))?
                    .label(format!("Median: {:.0}", median))
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .label_font(self.label_style())
                    .draw()?;
            }
        }

        let points = trend_points(&analysis.captures);
        if points.is_empty() {
            self.draw_placeholder(&panels[1], "No inter-capture intervals")?;
        } else {
            let x_lo = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
            let x_hi = points.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
            let (x_lo, x_hi) = if x_hi > x_lo {
                (x_lo, x_hi)
            } else {
                (x_lo - 1.0, x_hi + 1.0)
            };
            let y_max = axis_max(points.iter().map(|(_, y)| *y));
            let y_min = points.iter().map(|(_, y)| *y).fold(0.0f64, f64::min);

            let mut chart = ChartBuilder::on(&panels[1])
                .caption("Boids in View vs Time to Next Capture", self.caption_style())
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_lo..x_hi, y_min..y_max)?;

            chart
                .configure_mesh()
                .x_desc("Boids in View")
                .y_desc("Time to Next Capture (sec)")
                .label_style(self.label_style())
                .draw()?;

            chart.draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, 4, FIRST_KILL_COLOR.mix(0.6).filled())),
            )?;

            if let Some(trend) = analysis.confusion.trend {
                chart
                    .draw_series(LineSeries::new(
                        vec![(x_lo, trend.predict(x_lo)), (x_hi, trend.predict(x_hi))],
                        RED.mix(0.6).stroke_width(2),
                    ))?
                    .label(format!("Trend (slope={:.3})", trend.slope))
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .label_font(self.label_style())
                    .draw()?;
            }
        }

        root.present()?;
        Ok(())
    }

    /// One panel per experiment family with paired metric bars.
    fn render_groups(&self, path: &Path, analysis: &Analysis) -> ChartResult {
        let root = BitMapBackend::new(path, self.size(3)).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((1, ExperimentFamily::ALL.len()));

        for (panel, family) in panels.iter().zip(ExperimentFamily::ALL) {
            let group = filter_by_prefix(&analysis.records, family.prefix());
            if group.is_empty() {
                self.draw_placeholder(panel, &format!("No data for {}", family.prefix()))?;
                continue;
            }

            let labels: Vec<String> = group.iter().map(|r| r.condition.clone()).collect();
            let n = group.len() as f64;
            let fk_max = axis_max(group.iter().filter_map(|r| r.first_kill_time));
            let rate_max = axis_max(group.iter().filter_map(|r| r.capture_rate));

            let mut chart = ChartBuilder::on(panel)
                .caption(family.to_string(), self.caption_style())
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .right_y_label_area_size(60)
                .build_cartesian_2d(-0.5f64..(n - 0.5), 0.0f64..fk_max)?
                .set_secondary_coord(-0.5f64..(n - 0.5), 0.0f64..rate_max);

            let formatter = |x: &f64| category_label(&labels, *x);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(group.len() + 1)
                .x_label_formatter(&formatter)
                .x_desc("Condition")
                .y_desc("First Kill Time (sec)")
                .label_style(self.label_style())
                .draw()?;

            chart
                .configure_secondary_axes()
                .y_desc("Capture Rate (kills/min)")
                .label_style(self.label_style())
                .draw()?;

            chart.draw_series(group.iter().enumerate().filter_map(|(i, r)| {
                let v = r.first_kill_time?;
                let x = i as f64;
                Some(Rectangle::new(
                    [(x - 0.35, 0.0), (x, v)],
                    FIRST_KILL_COLOR.filled(),
                ))
            }))?;

            chart.draw_secondary_series(group.iter().enumerate().filter_map(|(i, r)| {
                let v = r.capture_rate?;
                let x = i as f64;
                Some(Rectangle::new(
                    [(x, 0.0), (x + 0.35, v)],
                    CAPTURE_RATE_COLOR.filled(),
                ))
            }))?;
        }

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_color() {
        assert_eq!(family_color("A1"), RGBColor(0xe7, 0x4c, 0x3c));
        assert_eq!(family_color("B2"), RGBColor(0x34, 0x98, 0xdb));
        assert_eq!(family_color("C1"), RGBColor(0x2e, 0xcc, 0x71));
        // Unknown families share the last colour
        assert_eq!(family_color("Z9"), RGBColor(0x2e, 0xcc, 0x71));
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["A1".to_string(), "A2".to_string()];
        assert_eq!(category_label(&labels, 0.0), "A1");
        assert_eq!(category_label(&labels, 1.0), "A2");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_axis_max() {
        assert!((axis_max(vec![10.0, 5.0]) - 11.0).abs() < 1e-9);
        assert_eq!(axis_max(Vec::new()), 1.0);
        assert_eq!(axis_max(vec![0.2]), 1.0);
    }

    #[test]
    fn test_histogram() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 4.0];
        let bins = histogram(&values, 4);

        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[3].end, 4.0);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 3]);
        assert_eq!(counts.iter().sum::<usize>(), values.len());
    }

    #[test]
    fn test_histogram_single_value_and_empty() {
        let bins = histogram(&[7.0, 7.0], 20);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(bins[0].start < 7.0 && bins[19].end > 7.0);

        assert!(histogram(&[], 20).is_empty());
    }
}
