use crate::model::{AggregateBucket, Totals};
use anyhow::{Context, Result, anyhow};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

const LEFT_PADDING: i32 = 40;
const LINE_HEIGHT: i32 = 30;
const MIN_PANEL_CHARS: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartLayout {
    /// Grouped vertical bars: one group per metric, one bar per bucket.
    #[default]
    Bar,
    HorizontalBar,
    /// One donut per bucket.
    Donut,
    /// Dot-leader text card.
    TextPanel,
}

impl ChartLayout {
    /// Image size in pixels. Fixed per layout so output dimensions never
    /// depend on the data.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ChartLayout::Bar | ChartLayout::HorizontalBar => (1200, 750),
            ChartLayout::Donut => (1500, 600),
            ChartLayout::TextPanel => (900, 480),
        }
    }
}

impl FromStr for ChartLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartLayout::Bar),
            "hbar" | "horizontal" | "horizontal-bar" => Ok(ChartLayout::HorizontalBar),
            "donut" => Ok(ChartLayout::Donut),
            "text" | "panel" | "text-panel" => Ok(ChartLayout::TextPanel),
            other => Err(format!("unknown chart layout `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme `{other}`")),
        }
    }
}

pub struct ThemeColors {
    pub bg: RGBColor,
    pub text: RGBColor,
    pub grid: RGBColor,
    pub key: RGBColor,
    pub cc: RGBColor,
    pub buckets: [RGBColor; 3],
}

impl Theme {
    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                bg: RGBColor(0x16, 0x1b, 0x22),
                text: RGBColor(0xc9, 0xd1, 0xd9),
                grid: RGBColor(0x30, 0x36, 0x3d),
                key: RGBColor(0xff, 0xa6, 0x57),
                cc: RGBColor(0x61, 0x6e, 0x7f),
                buckets: [
                    RGBColor(0x58, 0xa6, 0xff),
                    RGBColor(0xff, 0xa6, 0x57),
                    RGBColor(0x8b, 0x94, 0x9e),
                ],
            },
            Theme::Light => ThemeColors {
                bg: RGBColor(0xff, 0xff, 0xff),
                text: RGBColor(0x24, 0x29, 0x2f),
                grid: RGBColor(0xd0, 0xd7, 0xde),
                key: RGBColor(0xd7, 0x3a, 0x49),
                cc: RGBColor(0x6a, 0x73, 0x7d),
                buckets: [
                    RGBColor(0x03, 0x66, 0xd6),
                    RGBColor(0xd7, 0x3a, 0x49),
                    RGBColor(0x6a, 0x73, 0x7d),
                ],
            },
        }
    }
}

/// Added / removed / updated, in the order the metrics are drawn.
const METRIC_COLORS: [RGBColor; 3] = [
    RGBColor(0x3f, 0xb9, 0x50),
    RGBColor(0xf8, 0x51, 0x49),
    RGBColor(0x1e, 0x90, 0xff),
];

pub const METRIC_NAMES: [&str; 3] = ["Added", "Removed", "Updated"];

/// One bucket to plot, with its legend label and colour.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub bucket: AggregateBucket,
    pub color: RGBColor,
}

pub fn series_for(totals: &Totals, theme: Theme) -> Vec<Series> {
    let palette = theme.colors().buckets;
    totals
        .labelled_buckets()
        .into_iter()
        .zip(palette)
        .map(|((label, bucket), color)| Series {
            label,
            bucket,
            color,
        })
        .collect()
}

/// Axis range that always includes zero, padded by 10% on the far side(s).
pub fn value_range(values: impl IntoIterator<Item = i64>) -> (i64, i64) {
    let (min, max) = values
        .into_iter()
        .fold((0i64, 0i64), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let pad = ((max.saturating_sub(min) as f64) * 0.1).max(1.0) as i64;
    let lo = if min < 0 { min.saturating_sub(pad) } else { 0 };
    let hi = if max > 0 { max.saturating_add(pad) } else { pad };

    (lo, hi)
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    if n < 0 { format!("-{out}") } else { out }
}

/// `key: .......... value` padded to `align_width` characters.
pub fn dot_leader_row(key: &str, value: &str, align_width: usize) -> String {
    let key_part = format!("{key}: ");
    let available = align_width.saturating_sub(key_part.len() + value.len());

    let dots = match available {
        0 => String::new(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => format!("{} ", ".".repeat(n - 1)),
    };

    format!("{key_part}{dots}{value}")
}

/// Lines of the text-panel layout, header first.
pub fn panel_lines(totals: &Totals) -> Vec<String> {
    let rows: Vec<(String, String)> = totals
        .labelled_buckets()
        .into_iter()
        .flat_map(|(label, bucket)| {
            bucket
                .metrics()
                .map(|(name, v)| (format!("{label}.{name}"), format_thousands(v)))
        })
        .collect();

    let align_width = rows
        .iter()
        .map(|(k, v)| k.len() + 2 + v.len() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_PANEL_CHARS);

    let header = format!("{}@github ", totals.username);
    let mut lines = vec![format!(
        "{header}{}",
        "-".repeat(align_width.saturating_sub(header.len()))
    )];

    let mut current_label = None;
    for (key, value) in rows {
        let label = key.split('.').next().map(str::to_string);
        if current_label.is_some() && label != current_label {
            lines.push(String::new());
        }
        current_label = label;
        lines.push(dot_leader_row(&key, &value, align_width));
    }

    lines.push(String::new());
    lines.push(dot_leader_row(
        "Repos",
        &format!("{} ({} skipped)", totals.repos_seen, totals.repos_skipped),
        align_width,
    ));
    lines.push(dot_leader_row("Updated", totals.formula.label(), align_width));

    lines
}

fn title(totals: &Totals) -> String {
    format!("GitHub Code Contributions - {}", totals.username)
}

/// Render `totals` to a PNG at `path`, replacing any existing file.
pub async fn render(
    totals: Totals,
    path: PathBuf,
    layout: ChartLayout,
    theme: Theme,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let out = path.clone();
    tokio::task::spawn_blocking(move || draw(&totals, &out, layout, theme))
        .await
        .context("chart rendering task panicked")??;

    info!("Graph saved as {}", path.display());
    Ok(())
}

fn draw(totals: &Totals, path: &Path, layout: ChartLayout, theme: Theme) -> Result<()> {
    let root = BitMapBackend::new(path, layout.dimensions()).into_drawing_area();
    draw_layout(&root, totals, layout, theme)?;

    root.present()
        .map_err(|e| anyhow!("writing {}: {e}", path.display()))?;
    Ok(())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn draw_layout(root: &Area<'_>, totals: &Totals, layout: ChartLayout, theme: Theme) -> Result<()> {
    root.fill(&theme.colors().bg)?;

    match layout {
        ChartLayout::Bar => draw_bars(root, totals, theme),
        ChartLayout::HorizontalBar => draw_horizontal_bars(root, totals, theme),
        ChartLayout::Donut => draw_donuts(root, totals, theme),
        ChartLayout::TextPanel => draw_panel(root, totals, theme),
    }
}

fn draw_bars(root: &Area<'_>, totals: &Totals, theme: Theme) -> Result<()> {
    let colors = theme.colors();
    let series = series_for(totals, theme);
    let (y_min, y_max) = value_range(series.iter().flat_map(|s| s.bucket.metrics().map(|m| m.1)));

    let mut chart = ChartBuilder::on(root)
        .caption(title(totals), ("sans-serif", 32).into_font().color(&colors.text))
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(100)
        .build_cartesian_2d(0f64..METRIC_NAMES.len() as f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc("Lines of Code")
        .axis_style(ShapeStyle::from(&colors.cc).stroke_width(2))
        .light_line_style(ShapeStyle::from(&colors.grid).stroke_width(1))
        .bold_line_style(ShapeStyle::from(&colors.grid).stroke_width(1))
        .axis_desc_style(("sans-serif", 18).into_font().color(&colors.text))
        .y_label_style(("sans-serif", 16).into_font().color(&colors.text))
        .y_label_formatter(&|y| format_thousands(*y))
        .draw()?;

    let width = 0.8 / series.len() as f64;
    let value_style = ("sans-serif", 14)
        .into_font()
        .color(&colors.text)
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    for (s_idx, s) in series.iter().enumerate() {
        let color = s.color;
        let bars = s.bucket.metrics().into_iter().enumerate().map(|(m_idx, (_, v))| {
            let x0 = m_idx as f64 + 0.1 + s_idx as f64 * width;
            Rectangle::new([(x0, 0), (x0 + width * 0.9, v)], color.filled())
        });
        chart
            .draw_series(bars)?
            .label(s.label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));

        chart.draw_series(s.bucket.metrics().into_iter().enumerate().map(|(m_idx, (_, v))| {
            let x = m_idx as f64 + 0.1 + (s_idx as f64 + 0.45) * width;
            Text::new(format_thousands(v), (x, v.max(0)), value_style.clone())
        }))?;
    }

    let category_style = ("sans-serif", 20)
        .into_font()
        .color(&colors.text)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (i, name) in METRIC_NAMES.iter().enumerate() {
        let (px, py) = chart.backend_coord(&(i as f64 + 0.5, y_min));
        root.draw(&Text::new(*name, (px, py + 12), category_style.clone()))?;
    }

    chart
        .configure_series_labels()
        .background_style(&colors.bg.mix(0.85))
        .border_style(&colors.grid)
        .label_font(("sans-serif", 16).into_font().color(&colors.text))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    Ok(())
}

fn draw_horizontal_bars(root: &Area<'_>, totals: &Totals, theme: Theme) -> Result<()> {
    let colors = theme.colors();
    let series = series_for(totals, theme);
    let (x_min, x_max) = value_range(series.iter().flat_map(|s| s.bucket.metrics().map(|m| m.1)));

    let mut chart = ChartBuilder::on(root)
        .caption(title(totals), ("sans-serif", 32).into_font().color(&colors.text))
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(120)
        .build_cartesian_2d(x_min..x_max, 0f64..METRIC_NAMES.len() as f64)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_label_formatter(&|_| String::new())
        .x_desc("Lines of Code")
        .axis_style(ShapeStyle::from(&colors.cc).stroke_width(2))
        .light_line_style(ShapeStyle::from(&colors.grid).stroke_width(1))
        .bold_line_style(ShapeStyle::from(&colors.grid).stroke_width(1))
        .axis_desc_style(("sans-serif", 18).into_font().color(&colors.text))
        .x_label_style(("sans-serif", 16).into_font().color(&colors.text))
        .x_label_formatter(&|x| format_thousands(*x))
        .draw()?;

    let height = 0.8 / series.len() as f64;
    let value_style = ("sans-serif", 14)
        .into_font()
        .color(&colors.text)
        .pos(Pos::new(HPos::Left, VPos::Center));

    for (s_idx, s) in series.iter().enumerate() {
        let color = s.color;
        // Metrics run top to bottom.
        let row = |m_idx: usize| (METRIC_NAMES.len() - 1 - m_idx) as f64;
        chart
            .draw_series(s.bucket.metrics().into_iter().enumerate().map(|(m_idx, (_, v))| {
                let y0 = row(m_idx) + 0.9 - (s_idx as f64 + 1.0) * height;
                Rectangle::new([(0, y0), (v, y0 + height * 0.9)], color.filled())
            }))?
            .label(s.label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));

        chart.draw_series(s.bucket.metrics().into_iter().enumerate().map(|(m_idx, (_, v))| {
            let y = row(m_idx) + 0.9 - (s_idx as f64 + 0.55) * height;
            Text::new(format!(" {}", format_thousands(v)), (v.max(0), y), value_style.clone())
        }))?;
    }

    let category_style = ("sans-serif", 20)
        .into_font()
        .color(&colors.text)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (i, name) in METRIC_NAMES.iter().enumerate() {
        let y = (METRIC_NAMES.len() - 1 - i) as f64 + 0.5;
        let (px, py) = chart.backend_coord(&(x_min, y));
        root.draw(&Text::new(*name, (px - 12, py), category_style.clone()))?;
    }

    chart
        .configure_series_labels()
        .background_style(&colors.bg.mix(0.85))
        .border_style(&colors.grid)
        .label_font(("sans-serif", 16).into_font().color(&colors.text))
        .position(SeriesLabelPosition::LowerRight)
        .draw()?;

    Ok(())
}

fn draw_donuts(root: &Area<'_>, totals: &Totals, theme: Theme) -> Result<()> {
    let colors = theme.colors();
    let root = root.titled(&title(totals), ("sans-serif", 32).into_font().color(&colors.text))?;
    let series = series_for(totals, theme);
    let label_style = ("sans-serif", 16).into_font().color(&colors.text);

    for (area, s) in root.split_evenly((1, series.len())).iter().zip(&series) {
        let area = area.titled(&s.label, ("sans-serif", 24).into_font().color(&s.color))?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        // Pie takes absolute backend pixels, not area-relative ones.
        let (base_x, base_y) = area.get_base_pixel();
        let pie_center = (base_x + center.0, base_y + center.1);
        let radius = f64::from(w.min(h)) * 0.3;

        // A slice cannot be negative; the net formula may produce one.
        let sizes: Vec<f64> = s.bucket.metrics().iter().map(|(_, v)| (*v).max(0) as f64).collect();
        if sizes.iter().sum::<f64>() <= 0.0 {
            area.draw(&Text::new(
                "no activity",
                center,
                label_style.clone().pos(Pos::new(HPos::Center, VPos::Center)),
            ))?;
            continue;
        }

        let labels: Vec<String> = s
            .bucket
            .metrics()
            .iter()
            .map(|(name, v)| format!("{name} {}", format_thousands(*v)))
            .collect();

        let mut pie = Pie::new(&pie_center, &radius, &sizes, &METRIC_COLORS, &labels);
        pie.donut_hole(radius * 0.55);
        pie.label_style(label_style.clone());
        area.draw(&pie)?;
    }

    Ok(())
}

fn draw_panel(root: &Area<'_>, totals: &Totals, theme: Theme) -> Result<()> {
    let colors = theme.colors();
    let lines = panel_lines(totals);

    for (i, line) in lines.iter().enumerate() {
        let y = LINE_HEIGHT + i as i32 * LINE_HEIGHT;
        let color = if i == 0 { colors.key } else { colors.text };
        root.draw(&Text::new(
            line.as_str(),
            (LEFT_PADDING, y),
            ("monospace", 20).into_font().color(&color),
        ))?;
    }

    Ok(())
}
