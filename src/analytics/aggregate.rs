//! Read-time metric computation. Everything here is pure: callers fetch rows,
//! these functions turn them into numbers and display strings.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::models::TestimonialStat;

use super::events::{
    EventProperties, FunnelStage, StoredEvent, StoredFunnelEvent, StoredWidgetEvent,
    WidgetEventType,
};

pub const TOP_DOMAIN_LIMIT: usize = 10;
pub const TIMELINE_LIMIT: usize = 50;

/// `(this − last) / last × 100`, halves rounded up. Zero when there is no
/// previous month to compare against.
pub fn growth_percentage(this_month: usize, last_month: usize) -> i64 {
    if last_month == 0 {
        return 0;
    }

    let delta = this_month as f64 - last_month as f64;
    (delta / last_month as f64 * 100.0 + 0.5).floor() as i64
}

/// `numerator / denominator × 100` to one decimal, or `"0"` when the
/// denominator is zero.
pub fn conversion_rate(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        return "0".to_string();
    }

    format!("{:.1}", numerator as f64 / denominator as f64 * 100.0)
}

/// Mean rating of the approved testimonials, one decimal, `"0"` if none.
pub fn average_rating<'a>(testimonials: impl IntoIterator<Item = &'a TestimonialStat>) -> String {
    let (sum, count) = testimonials
        .into_iter()
        .filter(|t| t.approved)
        .fold((0i64, 0usize), |(sum, count), t| (sum + t.rating, count + 1));

    if count == 0 {
        return "0".to_string();
    }

    format!("{:.1}", sum as f64 / count as f64)
}

/// First instant of the current and the previous calendar month.
pub fn month_boundaries(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let today = now.date();
    let (prev_year, prev_month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };

    let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .unwrap_or(today)
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    let last_month = NaiveDate::from_ymd_opt(prev_year, prev_month, 1)
        .unwrap_or(today)
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);

    (this_month, last_month)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthlyCounts {
    pub this_month: usize,
    pub last_month: usize,
}

pub fn monthly_counts(
    timestamps: impl IntoIterator<Item = NaiveDateTime>,
    now: NaiveDateTime,
) -> MonthlyCounts {
    let (this_start, last_start) = month_boundaries(now);

    timestamps
        .into_iter()
        .fold(MonthlyCounts::default(), |mut counts, ts| {
            if ts >= this_start {
                counts.this_month += 1;
            } else if ts >= last_start {
                counts.last_month += 1;
            }
            counts
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// Counts per domain, highest first. The sort is stable, so equal counts keep
/// the order in which the domain was first seen. Blank domains are skipped.
pub fn top_domains<'a>(domains: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<DomainCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<DomainCount> = Vec::new();

    for domain in domains.into_iter().filter(|d| !d.is_empty()) {
        match index.get(domain) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(domain, counts.len());
                counts.push(DomainCount {
                    domain: domain.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Distinct non-blank domains in first-seen order.
pub fn distinct_domains<'a>(domains: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for domain in domains.into_iter().filter(|d| !d.is_empty()) {
        if !seen.iter().any(|d| d == domain) {
            seen.push(domain.to_string());
        }
    }
    seen
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelCounts {
    pub form_views: usize,
    pub form_starts: usize,
    pub form_submissions: usize,
    pub completions: usize,
}

impl FunnelCounts {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a StoredFunnelEvent>) -> Self {
        events
            .into_iter()
            .filter_map(|e| FunnelStage::from_db(&e.event_type))
            .fold(Self::default(), |mut counts, stage| {
                match stage {
                    FunnelStage::FormView => counts.form_views += 1,
                    FunnelStage::FormStart => counts.form_starts += 1,
                    FunnelStage::FormSubmit => counts.form_submissions += 1,
                    FunnelStage::FormComplete => counts.completions += 1,
                }
                counts
            })
    }

    pub fn conversion(&self) -> FunnelConversion {
        FunnelConversion {
            view_to_start: conversion_rate(self.form_starts, self.form_views),
            start_to_submit: conversion_rate(self.form_submissions, self.form_starts),
            submit_to_complete: conversion_rate(self.completions, self.form_submissions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelConversion {
    pub view_to_start: String,
    pub start_to_submit: String,
    pub submit_to_complete: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WidgetCounts {
    pub loads: usize,
    pub views: usize,
    pub clicks: usize,
}

impl WidgetCounts {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a StoredWidgetEvent>) -> Self {
        events
            .into_iter()
            .filter_map(|e| WidgetEventType::from_db(&e.event_type))
            .fold(Self::default(), |mut counts, kind| {
                match kind {
                    WidgetEventType::WidgetLoad => counts.loads += 1,
                    WidgetEventType::WidgetView => counts.views += 1,
                    WidgetEventType::TestimonialClick => counts.clicks += 1,
                }
                counts
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialTotals {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub average_rating: String,
}

impl TestimonialTotals {
    pub fn from_stats(stats: &[TestimonialStat]) -> Self {
        let approved = stats.iter().filter(|t| t.approved).count();
        Self {
            total: stats.len(),
            approved,
            pending: stats.len() - approved,
            average_rating: average_rating(stats),
        }
    }
}

pub fn count_by_event_type(events: &[StoredEvent]) -> BTreeMap<String, usize> {
    let mut grouped = BTreeMap::new();
    for event in events {
        *grouped.entry(event.event_type.clone()).or_insert(0) += 1;
    }
    grouped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    User,
    Testimonial,
    Widget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: EventSource,
    pub timestamp: NaiveDateTime,
    pub properties: Value,
}

/// Merges the three event streams, newest first, capped at `limit`.
pub fn timeline(
    user_events: &[StoredEvent],
    funnel_events: &[StoredFunnelEvent],
    widget_events: &[StoredWidgetEvent],
    limit: usize,
) -> Vec<TimelineEntry> {
    let entry = |event_type: &str, source, timestamp, raw: &str| TimelineEntry {
        event_type: event_type.to_string(),
        source,
        timestamp,
        properties: EventProperties::from_stored(raw).to_value(),
    };

    let mut entries: Vec<TimelineEntry> = user_events
        .iter()
        .map(|e| entry(&e.event_type, EventSource::User, e.created_at, &e.properties))
        .chain(funnel_events.iter().map(|e| {
            entry(&e.event_type, EventSource::Testimonial, e.created_at, &e.form_data)
        }))
        .chain(
            widget_events
                .iter()
                .map(|e| entry(&e.event_type, EventSource::Widget, e.created_at, &e.properties)),
        )
        .collect();

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
        }
    }
}

/// The numbers the insight rules look at.
#[derive(Debug, Clone)]
pub struct InsightInputs<'a> {
    pub conversion: &'a FunnelConversion,
    pub testimonials: &'a TestimonialTotals,
    pub widgets: WidgetCounts,
    pub funnel: FunnelCounts,
}

pub fn generate_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    let mut insights = Vec::new();

    let view_to_start = &inputs.conversion.view_to_start;
    let view_to_start_rate: f64 = view_to_start.parse().unwrap_or(0.0);
    if view_to_start_rate < 20.0 {
        insights.push(Insight::new(
            InsightKind::Error,
            "Low Conversion Rate",
            format!(
                "Only {}% of visitors start filling your form. Consider simplifying your form or improving your call-to-action.",
                view_to_start
            ),
        ));
    } else if view_to_start_rate > 40.0 {
        insights.push(Insight::new(
            InsightKind::Success,
            "Great Conversion Rate",
            format!(
                "{}% of visitors start your form - that's excellent! Your call-to-action is working well.",
                view_to_start
            ),
        ));
    }

    if inputs.testimonials.pending > 5 {
        insights.push(Insight::new(
            InsightKind::Warning,
            "Pending Testimonials",
            format!(
                "You have {} testimonials waiting for approval. Approving them quickly helps maintain momentum.",
                inputs.testimonials.pending
            ),
        ));
    }

    if inputs.widgets.loads > 0 && inputs.widgets.clicks == 0 {
        insights.push(Insight::new(
            InsightKind::Warning,
            "No Widget Engagement",
            "Your widgets are loading but not getting clicks. Consider making testimonials more prominent or adding call-to-action buttons.".to_string(),
        ));
    }

    let average = &inputs.testimonials.average_rating;
    let average_rating: f64 = average.parse().unwrap_or(0.0);
    if average_rating >= 4.5 {
        insights.push(Insight::new(
            InsightKind::Success,
            "Excellent Reviews",
            format!(
                "Your average rating of {} stars shows customers love your service! Make sure to highlight this.",
                average
            ),
        ));
    } else if average_rating < 3.5 && inputs.testimonials.total > 3 {
        insights.push(Insight::new(
            InsightKind::Error,
            "Rating Concerns",
            format!(
                "Your average rating of {} stars may indicate service issues. Consider reaching out to unhappy customers.",
                average
            ),
        ));
    }

    if inputs.funnel.form_views == 0 {
        insights.push(Insight::new(
            InsightKind::Warning,
            "No Collection Activity",
            "Your testimonial collection form hasn't been viewed yet. Make sure to share your collection link with customers!".to_string(),
        ));
    }

    if insights.is_empty() {
        insights.push(Insight::new(
            InsightKind::Success,
            "All Systems Normal",
            "Your testimonial collection system is performing well. Keep sharing your collection link to gather more reviews!".to_string(),
        ));
    }

    insights
}
