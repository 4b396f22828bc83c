// Shared prompt fragments.
// Feature modules keep their own prompts.rs and pull cross-cutting pieces from here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt fragment that keeps plain-text answers free of chatter.
pub const PLAIN_FORMAT_SYSTEM: &str = "Follow the requested line format exactly. \
    Do NOT add greetings, notes or closing remarks. \
    Do NOT use tables.";
