//! Chart data for the plot menus.
//!
//! Each [`PlotKind`] maps to one builder function through the static
//! [`PLOTS`] table; the menu only ever holds the enum value.

use std::collections::BTreeMap;

use crate::data::{Category, Series};
use crate::stats::aggregate::AggregateSeries;
use crate::stats::derive::DerivedSeries;

const DAY: f64 = 86_400.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlotKind {
    Cumulative,
    Increase,
    Cfr,
    Confirmed,
    Recovered,
    Deaths,
}

impl PlotKind {
    /// Menu of a location popup.
    pub const POPUP: [PlotKind; 3] = [PlotKind::Cumulative, PlotKind::Increase, PlotKind::Cfr];
    /// Menu of the global panel.
    pub const GLOBAL: [PlotKind; 6] = [
        PlotKind::Cumulative,
        PlotKind::Increase,
        PlotKind::Cfr,
        PlotKind::Confirmed,
        PlotKind::Recovered,
        PlotKind::Deaths,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PlotKind::Cumulative => "Cumulative",
            PlotKind::Increase => "Increase",
            PlotKind::Cfr => "CFR",
            PlotKind::Confirmed => "Confirmed",
            PlotKind::Recovered => "Recovered",
            PlotKind::Deaths => "Deaths",
        }
    }

    /// Number of plot types the kind cycles through.
    pub fn plot_types(self) -> u8 {
        match self {
            PlotKind::Confirmed | PlotKind::Recovered | PlotKind::Deaths => 4,
            _ => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Linear,
    /// Points hold `log10(y)`; non-positive values are dropped.
    Log,
}

/// Meaning of the x values of a plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Days since the Unix epoch.
    Date,
    /// Days since the first non-zero sample.
    SinceFirstCase,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trend {
    pub name: String,
    pub category: Option<Category>,
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Plot {
    pub kind: PlotKind,
    pub plot_type: u8,
    pub scale: Scale,
    pub axis: Axis,
    pub trends: Vec<Trend>,
}

impl Plot {
    /// `[min, max]` of x over every trend, `None` for an empty plot.
    pub fn x_bounds(&self) -> Option<[f64; 2]> {
        bounds(self.trends.iter().flat_map(|t| t.points.iter().map(|p| p.0)))
    }

    pub fn y_bounds(&self) -> Option<[f64; 2]> {
        bounds(self.trends.iter().flat_map(|t| t.points.iter().map(|p| p.1)))
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    values.fold(None, |acc, v| match acc {
        None => Some([v, v]),
        Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
    })
}

/// What the builders read from.
pub struct PlotContext<'a> {
    pub stats: &'a DerivedSeries,
    /// Per-region totals; empty for a popup.
    pub regions: &'a BTreeMap<String, AggregateSeries>,
}

type Builder = fn(&PlotContext<'_>, u8) -> Plot;

/// Static dispatch table from plot kind to builder.
pub const PLOTS: [(PlotKind, Builder); 6] = [
    (PlotKind::Cumulative, plot_cumulative),
    (PlotKind::Increase, plot_increase),
    (PlotKind::Cfr, plot_cfr),
    (PlotKind::Confirmed, plot_confirmed),
    (PlotKind::Recovered, plot_recovered),
    (PlotKind::Deaths, plot_deaths),
];

pub fn build_plot(kind: PlotKind, ctx: &PlotContext<'_>, plot_type: u8) -> Option<Plot> {
    PLOTS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, builder)| builder(ctx, plot_type))
}

fn to_point(scale: Scale, x: f64, y: f64) -> Option<(f64, f64)> {
    match scale {
        Scale::Linear => Some((x, y)),
        Scale::Log if y > 0.0 => Some((x, y.log10())),
        Scale::Log => None,
    }
}

fn day(time: i64) -> f64 {
    (time as f64 / DAY).floor()
}

/// Types 1 and 2 of the per-location kinds: linear, log.
fn two_type_scale(plot_type: u8) -> Scale {
    if plot_type == 2 {
        Scale::Log
    } else {
        Scale::Linear
    }
}

fn dated_trend<T: Copy + Into<f64>>(
    name: &str,
    category: Option<Category>,
    time: &[i64],
    values: impl IntoIterator<Item = Option<T>>,
    scale: Scale,
) -> Trend {
    let points = time
        .iter()
        .zip(values)
        .filter_map(|(&t, v)| v.and_then(|v| to_point(scale, day(t), v.into())))
        .collect();
    Trend {
        name: name.to_string(),
        category,
        points,
    }
}

fn category_plot(kind: PlotKind, ctx: &PlotContext<'_>, plot_type: u8, increase: bool) -> Plot {
    let scale = two_type_scale(plot_type);
    let stats = ctx.stats;
    let (c, r, d) = stats.latest();
    let trends = Category::ALL
        .into_iter()
        .zip([c, r, d])
        .filter(|&(_, latest)| latest != 0)
        .map(|(category, _)| {
            let time = &stats.trimmed.time;
            if increase {
                let values = stats.increase.get(category).iter().map(|&v| Some(v as f64));
                dated_trend(category.title(), Some(category), time, values, scale)
            } else {
                let values = stats.trimmed.counts(category).iter().map(|&v| Some(v as f64));
                dated_trend(category.title(), Some(category), time, values, scale)
            }
        })
        .collect();
    Plot {
        kind,
        plot_type,
        scale,
        axis: Axis::Date,
        trends,
    }
}

fn plot_cumulative(ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    category_plot(PlotKind::Cumulative, ctx, plot_type, false)
}

fn plot_increase(ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    category_plot(PlotKind::Increase, ctx, plot_type, true)
}

fn plot_cfr(ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    let scale = two_type_scale(plot_type);
    let stats = ctx.stats;
    let time = &stats.trimmed.time;
    let mut trends = vec![dated_trend(
        &format!("T={}", stats.lag),
        None,
        time,
        stats.cfr_t.iter().copied(),
        scale,
    )];
    if let Some(cfr_ddr) = &stats.cfr_ddr {
        trends.push(dated_trend("d/(d+r)", None, time, cfr_ddr.iter().copied(), scale));
    }
    Plot {
        kind: PlotKind::Cfr,
        plot_type,
        scale,
        axis: Axis::Date,
        trends,
    }
}

/// One trend per region for a single category. Odd types plot by date, even
/// types from each region's first case; types 1 and 2 are linear.
fn region_plot(kind: PlotKind, category: Category, ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    let scale = if plot_type <= 2 { Scale::Linear } else { Scale::Log };
    let axis = if plot_type % 2 == 1 {
        Axis::Date
    } else {
        Axis::SinceFirstCase
    };
    let trends = ctx
        .regions
        .iter()
        .map(|(name, total)| region_trend(name, category, &total.series, scale, axis))
        .collect();
    Plot {
        kind,
        plot_type,
        scale,
        axis,
        trends,
    }
}

fn region_trend(name: &str, category: Category, series: &Series, scale: Scale, axis: Axis) -> Trend {
    let counts = series.counts(category);
    let points = match axis {
        Axis::Date => series
            .time
            .iter()
            .zip(counts)
            .filter_map(|(&t, &count)| to_point(scale, day(t), count as f64))
            .collect(),
        Axis::SinceFirstCase => {
            let first = counts.iter().position(|&count| count != 0).unwrap_or(counts.len());
            counts[first..]
                .iter()
                .enumerate()
                .filter_map(|(i, &count)| to_point(scale, i as f64, count as f64))
                .collect()
        }
    };
    Trend {
        name: name.to_string(),
        category: Some(category),
        points,
    }
}

fn plot_confirmed(ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    region_plot(PlotKind::Confirmed, Category::Confirmed, ctx, plot_type)
}

fn plot_recovered(ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    region_plot(PlotKind::Recovered, Category::Recovered, ctx, plot_type)
}

fn plot_deaths(ctx: &PlotContext<'_>, plot_type: u8) -> Plot {
    region_plot(PlotKind::Deaths, Category::Deaths, ctx, plot_type)
}

/// Active plot kind plus the current type of every kind in the menu.
#[derive(Clone, Debug)]
pub struct PlotMenu {
    items: Vec<(PlotKind, u8)>,
    active: usize,
}

impl PlotMenu {
    pub fn new(kinds: &[PlotKind]) -> Self {
        Self {
            items: kinds.iter().map(|&kind| (kind, 1)).collect(),
            active: 0,
        }
    }

    pub fn items(&self) -> &[(PlotKind, u8)] {
        &self.items
    }

    pub fn active(&self) -> Option<(PlotKind, u8)> {
        self.items.get(self.active).copied()
    }

    /// Activate `kind`; choosing the already active kind advances its plot
    /// type, wrapping back to 1.
    pub fn select(&mut self, kind: PlotKind) {
        let Some(index) = self.items.iter().position(|&(k, _)| k == kind) else {
            return;
        };
        if index == self.active {
            let (kind, plot_type) = &mut self.items[index];
            *plot_type = if *plot_type >= kind.plot_types() { 1 } else { *plot_type + 1 };
        } else {
            self.active = index;
        }
    }

    /// Activate the next kind in menu order.
    pub fn next_kind(&mut self) {
        if !self.items.is_empty() {
            self.active = (self.active + 1) % self.items.len();
        }
    }

    /// Advance the active kind's plot type.
    pub fn next_type(&mut self) {
        if let Some((kind, _)) = self.active() {
            self.select(kind);
        }
    }

    pub fn build(&self, ctx: &PlotContext<'_>) -> Option<Plot> {
        let (kind, plot_type) = self.active()?;
        build_plot(kind, ctx, plot_type)
    }
}
