//! Chart rendering using Plotters for the dashboard page

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use plotters::prelude::*;
use tracing::info;

use crate::dashboard::{shares, DashboardData, ScatterPoint, UNDEFINED};

/// Color palette for categories, cycled when there are more categories
const SERIES_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

const CAPTION_FONT: (&str, u32) = ("sans-serif", 28);
const AXIS_FONT: (&str, u32) = ("sans-serif", 15);

pub const CONVERSIONS_BY_CHANNEL_FILE: &str = "conversions_by_channel.png";
pub const CTR_BY_CHANNEL_FILE: &str = "ctr_by_channel.png";
pub const COST_VS_CONVERSIONS_FILE: &str = "cost_vs_conversions.png";
pub const STATUS_BY_REGION_FILE: &str = "status_by_region.png";
pub const CONVERSIONS_BY_SECTOR_FILE: &str = "conversions_by_sector.png";

fn series_color(idx: usize) -> RGBColor {
    SERIES_COLORS[idx % SERIES_COLORS.len()]
}

/// Upper bound of a value axis with some headroom; 1.0 for an all-zero axis
fn axis_upper_bound(max_value: f64) -> f64 {
    if max_value > 0.0 {
        max_value * 1.1
    } else {
        1.0
    }
}

/// Category name under a segmented x axis position
fn segment_label(value: &SegmentValue<u32>, names: &[String]) -> String {
    match value {
        SegmentValue::Exact(idx) | SegmentValue::CenterOf(idx) => {
            names.get(*idx as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

/// Marker radius in pixels, scaled by clicks relative to the busiest row
fn marker_radius(clicks: u64, max_clicks: u64) -> i32 {
    if max_clicks == 0 {
        return 3;
    }
    3 + ((clicks as f64 / max_clicks as f64) * 15.0).round() as i32
}

/// Title-only image for a chart without data
fn draw_empty_chart(output_path: &Path, title: &str) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    root.titled(title, CAPTION_FONT)?;
    root.present()?;
    Ok(())
}

/// Vertical bar chart, one bar per category
pub fn create_bar_chart(
    bars: &[(String, f64)],
    output_path: &Path,
    title: &str,
    y_desc: &str,
) -> crate::Result<()> {
    if bars.is_empty() {
        return draw_empty_chart(output_path, title);
    }

    let names: Vec<String> = bars.iter().map(|(name, _)| name.clone()).collect();
    let max_value = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0u32..bars.len() as u32).into_segmented(),
            0f64..axis_upper_bound(max_value),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|v| segment_label(v, &names))
        .y_desc(y_desc)
        .axis_desc_style(AXIS_FONT)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(series_color(0).filled())
            .margin(20)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i as u32, *v))),
    )?;

    root.present()?;
    Ok(())
}

/// Conversions per channel (chart 1)
pub fn create_conversions_by_channel_chart(
    data: &DashboardData,
    output_path: &Path,
) -> crate::Result<()> {
    let bars: Vec<(String, f64)> = data
        .conversions_by_channel
        .iter()
        .map(|(channel, total)| (channel.clone(), *total))
        .collect();
    create_bar_chart(&bars, output_path, "Conversions par canal", "conversions")
}

/// Mean CTR per channel in percent (chart 2); channels without a defined CTR are left out
pub fn create_ctr_by_channel_chart(data: &DashboardData, output_path: &Path) -> crate::Result<()> {
    let bars: Vec<(String, f64)> = data
        .ctr_by_channel
        .iter()
        .filter_map(|(channel, ctr)| ctr.map(|ctr| (channel.clone(), ctr * 100.0)))
        .collect();
    create_bar_chart(&bars, output_path, "CTR moyen par canal", "CTR (%)")
}

/// Cost against conversions, colored by channel, sized by clicks (chart 3)
pub fn create_cost_vs_conversions_chart(
    points: &[ScatterPoint],
    output_path: &Path,
) -> crate::Result<()> {
    let title = "Relation coût / conversions par canal";
    if points.is_empty() {
        return draw_empty_chart(output_path, title);
    }

    let max_cost = points.iter().map(|p| p.cost).fold(0.0, f64::max);
    let max_conversions = points.iter().map(|p| p.conversions).max().unwrap_or(0) as f64;
    let max_clicks = points.iter().map(|p| p.clicks).max().unwrap_or(0);

    let mut by_channel: BTreeMap<&str, Vec<&ScatterPoint>> = BTreeMap::new();
    for point in points {
        by_channel
            .entry(point.channel.as_deref().unwrap_or(UNDEFINED))
            .or_default()
            .push(point);
    }

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            0f64..axis_upper_bound(max_cost),
            0f64..axis_upper_bound(max_conversions),
        )?;

    chart
        .configure_mesh()
        .x_desc("cost")
        .y_desc("conversions")
        .axis_desc_style(AXIS_FONT)
        .draw()?;

    for (idx, (channel, channel_points)) in by_channel.into_iter().enumerate() {
        let color = series_color(idx);
        chart
            .draw_series(channel_points.into_iter().map(|p| {
                Circle::new(
                    (p.cost, p.conversions as f64),
                    marker_radius(p.clicks, max_clicks),
                    color.mix(0.6).filled(),
                )
            }))?
            .label(channel)
            .legend(move |(x, y)| Circle::new((x + 5, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Stacked row counts of CRM status per region (chart 4)
pub fn create_status_by_region_chart(
    counts: &BTreeMap<(String, String), u64>,
    output_path: &Path,
) -> crate::Result<()> {
    let title = "Répartition des statuts CRM par région";
    if counts.is_empty() {
        return draw_empty_chart(output_path, title);
    }

    let regions: Vec<String> = counts
        .keys()
        .map(|(region, _)| region.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let statuses: Vec<String> = counts
        .keys()
        .map(|(_, status)| status.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // cumulative[s][r]: height of the stack for region r up to and including status s
    let mut cumulative = vec![vec![0f64; regions.len()]; statuses.len()];
    for (r, region) in regions.iter().enumerate() {
        let mut running = 0.0;
        for (s, status) in statuses.iter().enumerate() {
            running += counts
                .get(&(region.clone(), status.clone()))
                .copied()
                .unwrap_or(0) as f64;
            cumulative[s][r] = running;
        }
    }
    let max_stack = cumulative
        .last()
        .map(|tops| tops.iter().copied().fold(0.0, f64::max))
        .unwrap_or(0.0);

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0u32..regions.len() as u32).into_segmented(),
            0f64..axis_upper_bound(max_stack),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(regions.len())
        .x_label_formatter(&|v| segment_label(v, &regions))
        .y_desc("count")
        .axis_desc_style(AXIS_FONT)
        .draw()?;

    // Tallest layer first so each lower status paints over the one above it
    for (s, status) in statuses.iter().enumerate().rev() {
        let color = series_color(s);
        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(color.filled())
                    .margin(20)
                    .data(
                        cumulative[s]
                            .iter()
                            .enumerate()
                            .map(|(r, top)| (r as u32, *top)),
                    ),
            )?
            .label(status.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Share of conversions per sector (chart 5)
pub fn create_conversions_by_sector_chart(
    totals: &BTreeMap<String, f64>,
    output_path: &Path,
) -> crate::Result<()> {
    let title = "Part des conversions par secteur";
    let slices: Vec<(String, f64)> = shares(totals)
        .into_iter()
        .filter(|(_, share)| *share > 0.0)
        .collect();
    if slices.is_empty() {
        return draw_empty_chart(output_path, title);
    }

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(title, CAPTION_FONT)?;

    let (width, height) = area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;

    let sizes: Vec<f64> = slices.iter().map(|(_, share)| *share).collect();
    let colors: Vec<RGBColor> = (0..slices.len()).map(series_color).collect();
    let labels: Vec<String> = slices.iter().map(|(sector, _)| sector.clone()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    pie.percentages(("sans-serif", radius * 0.08).into_font().color(&WHITE));
    area.draw(&pie)?;

    root.present()?;
    Ok(())
}

/// Render all five dashboard charts into `output_dir`
///
/// # Returns
/// * Paths of the written PNG files, in dashboard order
pub fn generate_dashboard_charts(
    data: &DashboardData,
    output_dir: &Path,
) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create chart directory {}", output_dir.display()))?;

    let path = |file: &str| output_dir.join(file);
    let written = vec![
        path(CONVERSIONS_BY_CHANNEL_FILE),
        path(CTR_BY_CHANNEL_FILE),
        path(COST_VS_CONVERSIONS_FILE),
        path(STATUS_BY_REGION_FILE),
        path(CONVERSIONS_BY_SECTOR_FILE),
    ];

    create_conversions_by_channel_chart(data, &written[0])?;
    create_ctr_by_channel_chart(data, &written[1])?;
    create_cost_vs_conversions_chart(&data.cost_vs_conversions, &written[2])?;
    create_status_by_region_chart(&data.status_by_region, &written[3])?;
    create_conversions_by_sector_chart(&data.conversions_by_sector, &written[4])?;

    for chart in &written {
        info!(path = %chart.display(), "chart saved");
    }
    Ok(written)
}
