use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::{ProjectionError, Projector};

/// One `{ "topic": ["item", ...] }` entry of a brainstorming list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "IndexMap<String, Vec<String>>")]
pub struct TopicGroup {
    pub topic: String,
    pub items: Vec<String>,
}

impl From<TopicGroup> for IndexMap<String, Vec<String>> {
    fn from(group: TopicGroup) -> Self {
        let mut map = IndexMap::with_capacity(1);
        map.insert(group.topic, group.items);
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketAnalysis {
    pub competitors: Vec<String>,
    pub market_gaps: Vec<String>,
    pub user_needs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesignBrainstorming {
    pub components_alternatives: Vec<TopicGroup>,
    pub material_options: Vec<TopicGroup>,
    pub ergonomic_considerations: Vec<TopicGroup>,
    pub market_analysis: MarketAnalysis,
    pub hazard_analysis: Vec<TopicGroup>,
    pub innovation_opportunities: Vec<String>,
    pub design_tradeoffs: Vec<TopicGroup>,
}

impl DesignBrainstorming {
    pub const FIELDS: [&'static str; 7] = [
        "components_alternatives",
        "material_options",
        "ergonomic_considerations",
        "market_analysis",
        "hazard_analysis",
        "innovation_opportunities",
        "design_tradeoffs",
    ];

    pub fn project(value: &Value) -> Result<Self, ProjectionError> {
        let p = Projector::new("DesignBrainstorming", value)?;
        let market = p.nested("market_analysis", "MarketAnalysis")?;
        Ok(Self {
            components_alternatives: p.topic_groups("components_alternatives")?,
            material_options: p.topic_groups("material_options")?,
            ergonomic_considerations: p.topic_groups("ergonomic_considerations")?,
            market_analysis: MarketAnalysis {
                competitors: market.text_list("competitors")?,
                market_gaps: market.text_list("market_gaps")?,
                user_needs: market.text_list("user_needs")?,
            },
            hazard_analysis: p.topic_groups("hazard_analysis")?,
            innovation_opportunities: p.text_list("innovation_opportunities")?,
            design_tradeoffs: p.topic_groups("design_tradeoffs")?,
        })
    }
}
