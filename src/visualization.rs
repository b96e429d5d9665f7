//! Chart-ready data mined out of free-text simulation output.
//!
//! The model rarely returns machine-readable numbers, so survival
//! rates, stage probabilities and milestones are extracted with an
//! ordered set of patterns and synthesized from defaults when the text
//! offers nothing. The visualization always renders something.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::{self, TimelineData};

const GROWTH_STAGES: [&str; 6] = [
    "Seed",
    "Seedling",
    "Vegetative",
    "Flowering",
    "Fruiting",
    "Mature",
];

const DEFAULT_SURVIVAL_RATE: u32 = 50;

static SURVIVAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)survival (?:rate|probability)[^\d]*(\d+)%").unwrap(),
        Regex::new(r"(?i)(\d+)% survival").unwrap(),
        Regex::new(r"(?i)(\d+)% chance of survival").unwrap(),
        Regex::new(r"(?i)(\d+)% success rate").unwrap(),
    ]
});

static STAGE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(seed|seedling|vegetative|flowering|fruiting|mature)[^\d]*(\d+)%").unwrap()
});

static TIMELINE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\d+\s*-\s*\d+\s*(?:weeks|months|days)[^\n]+").unwrap(),
        Regex::new(r"(?i)(?:within|after)\s*\d+\s*(?:weeks|months|days)[^\n]+").unwrap(),
        Regex::new(r"(?i)(?:reach|achieve)\s*\w+\s*(?:stage|phase)\s*(?:in|after)\s*\d+\s*(?:weeks|months|days)[^\n]+")
            .unwrap(),
    ]
});

static RECOMMENDATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)recommend(?:ation|ed)[^\n:-]+[-:][^\n]+").unwrap());
static RECOMMENDATION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^recommend(?:ation|ed)[^\n:-]+[-:]\s*").unwrap());

/// First matching pattern wins; 50 when the text names no rate.
pub fn survival_rate(text: &str) -> u32 {
    for pattern in SURVIVAL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Ok(rate) = caps[1].parse() {
                return rate;
            }
        }
    }
    DEFAULT_SURVIVAL_RATE
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRate {
    pub stage: &'static str,
    pub rate: u32,
}

/// Per-stage survival table. A stage mentioned with a nearby
/// percentage keeps that number; the rest get a monotonically
/// decreasing estimate floored at 10.
pub fn stage_rates(text: &str, survival: u32) -> Vec<StageRate> {
    let mentions: Vec<(String, u32)> = STAGE_MENTION
        .captures_iter(text)
        .filter_map(|caps| {
            let rate = caps[2].parse().ok()?;
            Some((caps[1].to_lowercase(), rate))
        })
        .collect();

    GROWTH_STAGES
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let explicit = mentions
                .iter()
                .find(|(name, _)| name == &stage.to_lowercase())
                .map(|(_, rate)| *rate);
            let rate = explicit
                .unwrap_or_else(|| survival.saturating_sub(15 * i as u32).max(10));
            StageRate { stage, rate }
        })
        .collect()
}

/// Up to three timeframe phrases, tried family by family; hardcoded
/// milestones when the text has none.
pub fn timeline_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for pattern in TIMELINE_PATTERNS.iter() {
        for m in pattern.find_iter(text).take(3) {
            items.push(m.as_str().trim().to_string());
        }
        if items.len() >= 3 {
            break;
        }
    }
    items.truncate(3);

    if items.is_empty() {
        items = vec![
            "Initial growth in 2-4 weeks".to_string(),
            "Vegetative stage in 6-8 weeks".to_string(),
            "Flowering phase in 10-12 weeks".to_string(),
        ];
    }
    items
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub level: &'static str,
    pub color: &'static str,
    pub recommendations: Vec<String>,
}

/// Tier by survival rate, with a canned recommendation set unless the
/// text itself offers recommendation sentences.
pub fn risk_assessment(text: &str, survival: u32) -> RiskAssessment {
    let (level, color, canned) = if survival > 70 {
        (
            "Low",
            "#4CAF50",
            [
                "Maintain current conditions",
                "Monitor for pests regularly",
                "Continue with current care routine",
            ],
        )
    } else if survival > 40 {
        (
            "Moderate",
            "#FFC107",
            [
                "Consider adjusting watering schedule",
                "Monitor sunlight exposure",
                "Check soil nutrients",
            ],
        )
    } else {
        (
            "High",
            "#F44336",
            [
                "Immediate intervention needed",
                "Review all environmental factors",
                "Consider repotting or relocation",
            ],
        )
    };

    let extracted: Vec<String> = RECOMMENDATION
        .find_iter(text)
        .take(3)
        .map(|m| {
            RECOMMENDATION_PREFIX
                .replace(m.as_str(), "")
                .trim()
                .to_string()
        })
        .collect();

    let recommendations = if extracted.is_empty() {
        canned.iter().map(|r| r.to_string()).collect()
    } else {
        extracted
    };

    RiskAssessment {
        level,
        color,
        recommendations,
    }
}

/// Color band for a survival bar.
pub fn bar_color(rate: u32) -> &'static str {
    if rate >= 80 {
        "#2e7d32"
    } else if rate >= 60 {
        "#388e3c"
    } else if rate >= 40 {
        "#81c784"
    } else if rate >= 20 {
        "#ffb74d"
    } else {
        "#e57373"
    }
}

fn marker_color(index: usize) -> &'static str {
    const COLORS: [&str; 6] = [
        "#2e7d32", "#388e3c", "#81c784", "#4CAF50", "#8BC34A", "#CDDC39",
    ];
    COLORS[index % COLORS.len()]
}

/// Full visualization fragment: stage survival bars, milestone
/// timeline, duration chart from the embedded JSON block, and the risk
/// card. Never empty.
pub fn growth_visualization(text: &str) -> String {
    let survival = survival_rate(text);
    let stages = stage_rates(text, survival);
    let milestones = timeline_items(text);
    let risk = risk_assessment(text, survival);
    let chart = extract::timeline_block(text);

    let bars: String = stages
        .iter()
        .map(|item| {
            format!(
                r#"<div class="chart-item"><div class="chart-label">{stage}</div><div class="chart-bar" style="width: {rate}%; background-color: {color};"><span class="chart-value">{rate}%</span></div></div>"#,
                stage = item.stage,
                rate = item.rate,
                color = bar_color(item.rate),
            )
        })
        .collect();

    let timeline: String = milestones
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                r#"<li class="timeline-item"><div class="timeline-marker" style="background-color: {color}">{n}</div><div class="timeline-content">{item}</div></li>"#,
                color = marker_color(i),
                n = i + 1,
            )
        })
        .collect();

    format!(
        r#"<div class="visualization-container"><h4>Growth Potential Analysis</h4><div class="survival-chart"><h5>Stage Survival Probability</h5>{bars}</div><div class="growth-timeline"><h5>Projected Growth Milestones</h5><ul class="timeline">{timeline}</ul></div>{duration_chart}{risk_card}</div>"#,
        duration_chart = duration_chart(&chart),
        risk_card = risk_card(&risk, survival),
    )
}

/// Stage-duration bars from the embedded timeline JSON (defaults when
/// the model skipped the block).
pub fn duration_chart(data: &TimelineData) -> String {
    let total: f64 = data.durations.iter().sum::<f64>().max(1.0);
    let bars: String = data
        .stages
        .iter()
        .zip(data.durations.iter())
        .enumerate()
        .map(|(i, (stage, weeks))| {
            let width = (weeks / total * 100.0).round() as u32;
            let milestone = data
                .milestones
                .get(i)
                .map(|m| m.as_str())
                .unwrap_or("");
            format!(
                r#"<div class="duration-item"><div class="duration-label">{stage}</div><div class="duration-bar" style="width: {width}%" title="{milestone}">{weeks} weeks</div></div>"#,
            )
        })
        .collect();
    format!(r#"<div class="growth-chart"><h5>Stage Durations</h5>{bars}</div>"#)
}

fn risk_card(risk: &RiskAssessment, survival: u32) -> String {
    let recs: String = risk
        .recommendations
        .iter()
        .map(|rec| format!("<li>{rec}</li>"))
        .collect();
    format!(
        r#"<div class="risk-card" style="border-left: 4px solid {color}"><h5>Overall Risk Assessment: <span style="color: {color}">{level}</span></h5><p>Based on current conditions, this plant has a <strong>{survival}%</strong> initial survival probability.</p><ul>{recs}</ul></div>"#,
        color = risk.color,
        level = risk.level,
    )
}
