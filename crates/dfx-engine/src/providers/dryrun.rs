use anyhow::Result;
use serde_json::{json, Map, Value};

use super::{VisionProvider, VisionReply, VisionRequest};
use crate::AnalysisKind;

pub const DRYRUN_MODEL: &str = "dryrun-vision-1";

/// Offline provider with canned replies.
///
/// Replies come wrapped in prose and a code fence the way chatty models
/// answer, so the full sanitize/parse/project path still runs.
pub struct DryrunVisionProvider;

impl VisionProvider for DryrunVisionProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn complete(&self, request: &VisionRequest) -> Result<VisionReply> {
        let payload = match request.kind {
            AnalysisKind::Describe => describe_payload(),
            AnalysisKind::Brainstorm => brainstorm_payload(),
            AnalysisKind::Specifications => specification_payload(request),
        };
        let text = format!(
            "Here is the {} for the uploaded design.\n```json\n{}\n```\nLet me know if you need more detail.",
            request.kind.as_str().replace('_', " "),
            serde_json::to_string_pretty(&payload)?
        );
        Ok(VisionReply {
            text,
            model: DRYRUN_MODEL.to_string(),
            input_tokens: None,
            output_tokens: None,
        })
    }
}

fn describe_payload() -> Value {
    json!({
        "general_description": "Handheld cylindrical product with an attached grip and a removable top cover.",
        "components": [
            "main body shell",
            "side grip",
            "removable top cover"
        ],
        "dimensions": {
            "height": "approx. 120 mm",
            "diameter": "approx. 80 mm"
        },
        "materials": [
            "injection-molded polypropylene body",
            "thermoplastic elastomer grip overmold"
        ],
        "key_features": [
            "single-hand operation",
            "tool-free cover removal"
        ],
        "intended_use": [
            "everyday household use"
        ]
    })
}

fn brainstorm_payload() -> Value {
    json!({
        "components_alternatives": [
            {"side grip": ["molded-in grip ribs: cheaper, less comfortable", "clip-on sleeve: replaceable, adds a part"]}
        ],
        "material_options": [
            {"main body shell": ["recycled PP: lower footprint, slight color variation", "PETG: clearer finish, higher cost"]}
        ],
        "ergonomic_considerations": [
            {"grip": ["fit the 5th to 95th percentile hand width", "avoid sharp parting lines"]}
        ],
        "market_analysis": {
            "competitors": ["generic molded containers with snap lids"],
            "market_gaps": ["repairable designs with replaceable grips"],
            "user_needs": ["easy cleaning", "secure one-handed carry"]
        },
        "hazard_analysis": [
            {"mechanical": ["pinch point at cover hinge: add finger clearance"]}
        ],
        "innovation_opportunities": [
            "modular grip accessories"
        ],
        "design_tradeoffs": [
            {"wall thickness": ["thicker walls: stiffer but heavier and slower to cool in the mold"]}
        ]
    })
}

fn specification_payload(request: &VisionRequest) -> Value {
    let mut out = Map::new();
    for category in &request.categories {
        let name = category.as_str();
        out.insert(
            name.to_string(),
            json!({
                "specifications": [format!("{name}: baseline specification derived from visible geometry")],
                "requirements": [format!("{name}: meets applicable consumer product standards")],
                "constraints": [format!("{name}: limited by injection-molded construction")],
                "recommendations": [format!("{name}: validate with a physical prototype")]
            }),
        );
    }
    Value::Object(out)
}
