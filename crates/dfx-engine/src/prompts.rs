//! Instructions sent with the image for each analysis.
//!
//! Every instruction spells out the full JSON shape the matching record
//! projects from, and ends by forbidding prose outside the object.

use dfx_contracts::categories::CategorySelection;

const JSON_ONLY: &str = "Provide ONLY the JSON response, no other text.";

pub fn describe_instruction() -> String {
    format!(
        r#"Analyze this design image and provide a comprehensive object description.

Format your response EXACTLY as a JSON object like this:
{{
    "general_description": "detailed overview of the object",
    "components": [
        "component_1 with description",
        "component_2 with description",
        ...
    ],
    "dimensions": {{
        "length": "value",
        "width": "value",
        "height": "value",
        "other_relevant_dimensions": "value"
    }},
    "materials": [
        "material_1 with properties",
        "material_2 with properties",
        ...
    ],
    "key_features": [
        "feature_1 description",
        "feature_2 description",
        ...
    ],
    "intended_use": [
        "primary use case",
        "secondary use case",
        ...
    ]
}}

Be as specific and technical as possible. Include estimated measurements and material properties where visible. {JSON_ONLY}"#
    )
}

pub fn brainstorm_instruction() -> String {
    format!(
        r#"Analyze this design and provide a comprehensive brainstorming analysis for alternative design approaches.

Format your response EXACTLY as a JSON object like this:
{{
    "components_alternatives": [
        {{
            "component_name": [
                "alternative_approach_1 with pros/cons",
                "alternative_approach_2 with pros/cons",
                ...
            ]
        }}
    ],
    "material_options": [
        {{
            "component_or_area": [
                "material_option_1 with properties and justification",
                "material_option_2 with properties and justification",
                ...
            ]
        }}
    ],
    "ergonomic_considerations": [
        {{
            "interaction_point": [
                "ergonomic_consideration_1",
                "ergonomic_consideration_2",
                ...
            ]
        }}
    ],
    "market_analysis": {{
        "competitors": [
            "competitor_1 with key features",
            "competitor_2 with key features",
            ...
        ],
        "market_gaps": [
            "opportunity_1",
            "opportunity_2",
            ...
        ],
        "user_needs": [
            "unmet_need_1",
            "unmet_need_2",
            ...
        ]
    }},
    "hazard_analysis": [
        {{
            "hazard_category": [
                "potential_hazard_1 with mitigation",
                "potential_hazard_2 with mitigation",
                ...
            ]
        }}
    ],
    "innovation_opportunities": [
        "innovation_idea_1",
        "innovation_idea_2",
        ...
    ],
    "design_tradeoffs": [
        {{
            "tradeoff_category": [
                "option_1 with impact analysis",
                "option_2 with impact analysis",
                ...
            ]
        }}
    ]
}}

Each list entry under components_alternatives, material_options, ergonomic_considerations, hazard_analysis and design_tradeoffs must be an object with exactly one key.
Provide detailed analysis with specific examples, materials, technologies, and approaches. Include pros/cons where relevant. {JSON_ONLY}"#
    )
}

pub fn specification_instruction(categories: &CategorySelection) -> String {
    let names = categories.names().join(", ");
    format!(
        r#"Analyze this design image and generate comprehensive specifications for the following Design for X (DfX) categories: {names}

For each category, provide:
1. Detailed specifications (at least 5-7 specific technical requirements)
2. Key requirements (4-5 essential criteria that must be met)
3. Design constraints (3-4 limitations or boundaries)
4. Detailed recommendations (4-5 specific improvement suggestions)

Format your response EXACTLY as a JSON object like this:
{{
    "category_name": {{
        "specifications": [
            "detailed_spec_1",
            "detailed_spec_2",
            ...
        ],
        "requirements": [
            "requirement_1",
            "requirement_2",
            ...
        ],
        "constraints": [
            "constraint_1",
            "constraint_2",
            ...
        ],
        "recommendations": [
            "recommendation_1",
            "recommendation_2",
            ...
        ]
    }}
}}

Use the category names exactly as listed above as the top-level keys.
Be as specific and technical as possible in the specifications. Include numerical values, standards, and precise requirements where applicable. {JSON_ONLY}"#
    )
}
