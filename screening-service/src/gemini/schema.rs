use serde_json::{Value, json};
use std::sync::LazyLock;

/// Fields the scan-analysis response must carry, in schema order
pub const SCAN_ANALYSIS_FIELDS: [&str; 4] = ["summary", "findings", "recommendations", "disclaimer"];

/// Response schema constraining scan analysis output to `ScanAnalysisResult`.
///
/// Built once and shared by every scan-analysis request.
pub static SCAN_ANALYSIS_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "findings": { "type": "ARRAY", "items": { "type": "STRING" } },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "disclaimer": { "type": "STRING" }
        },
        "required": SCAN_ANALYSIS_FIELDS,
        "propertyOrdering": SCAN_ANALYSIS_FIELDS
    })
});
