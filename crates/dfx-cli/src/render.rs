use std::fmt::Write as _;

use dfx_contracts::records::{DesignBrainstorming, ObjectDescription, SpecificationSet, TopicGroup};
use dfx_contracts::report::{AnalysisReport, ReportSection};

const BULLET: &str = "•";

pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    for section in ReportSection::ALL {
        let _ = writeln!(out, "== {} ==", section.title());
        let body = match section {
            ReportSection::ObjectDescription => report
                .object_description
                .as_ref()
                .map(render_object_description),
            ReportSection::Brainstorming => report.brainstorming.as_ref().map(render_brainstorming),
            ReportSection::Specifications => {
                report.specifications.as_ref().map(render_specifications)
            }
        };
        out.push_str(&body.unwrap_or_else(|| "  (analysis did not complete)\n".to_string()));
        out.push('\n');
    }
    out
}

pub fn render_object_description(record: &ObjectDescription) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "General Description");
    let _ = writeln!(out, "  {}", record.general_description);
    bullet_block(&mut out, "Components", &record.components, 1);
    let _ = writeln!(out, "Dimensions");
    for (name, value) in &record.dimensions {
        let _ = writeln!(out, "  {BULLET} {}: {value}", title_case(name));
    }
    bullet_block(&mut out, "Materials", &record.materials, 1);
    bullet_block(&mut out, "Key Features", &record.key_features, 1);
    bullet_block(&mut out, "Intended Use", &record.intended_use, 1);
    out
}

pub fn render_brainstorming(record: &DesignBrainstorming) -> String {
    let mut out = String::new();
    group_block(&mut out, "Component Alternatives", &record.components_alternatives);
    group_block(&mut out, "Material Options", &record.material_options);
    group_block(&mut out, "Ergonomic Considerations", &record.ergonomic_considerations);

    let _ = writeln!(out, "Market Analysis");
    let market = &record.market_analysis;
    bullet_block(&mut out, "  Competitors", &market.competitors, 2);
    bullet_block(&mut out, "  Market Gaps", &market.market_gaps, 2);
    bullet_block(&mut out, "  User Needs", &market.user_needs, 2);

    group_block(&mut out, "Hazard Analysis", &record.hazard_analysis);
    bullet_block(
        &mut out,
        "Innovation Opportunities",
        &record.innovation_opportunities,
        1,
    );
    group_block(&mut out, "Design Trade-offs", &record.design_tradeoffs);
    out
}

pub fn render_specifications(set: &SpecificationSet) -> String {
    let mut out = String::new();
    if set.is_empty() {
        let _ = writeln!(out, "  (no category produced a usable specification)");
    }
    for (category, spec) in &set.specifications {
        let _ = writeln!(out, "{} Specifications", title_case(category));
        bullet_block(&mut out, "  Detailed Specifications", &spec.specifications, 2);
        bullet_block(&mut out, "  Key Requirements", &spec.requirements, 2);
        bullet_block(&mut out, "  Design Constraints", &spec.constraints, 2);
        bullet_block(&mut out, "  Recommendations", &spec.recommendations, 2);
    }
    for rejected in &set.rejected {
        let _ = writeln!(
            out,
            "{} Specifications (skipped: {})",
            title_case(&rejected.category),
            rejected.reason
        );
    }
    out
}

fn bullet_block(out: &mut String, heading: &str, items: &[String], depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{heading}");
    for item in items {
        let _ = writeln!(out, "{indent}{BULLET} {item}");
    }
}

fn group_block(out: &mut String, heading: &str, groups: &[TopicGroup]) {
    let _ = writeln!(out, "{heading}");
    for group in groups {
        let _ = writeln!(out, "  {}", group.topic);
        for item in &group.items {
            let _ = writeln!(out, "    {BULLET} {item}");
        }
    }
}

/// Upper-cases the first letter of every alphabetic run, lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(ch);
            previous_alpha = false;
        }
    }
    out
}
