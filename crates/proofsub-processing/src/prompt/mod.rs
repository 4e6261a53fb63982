//! Prompt assembly
//!
//! Fills one of the two fixed instruction templates with the locally extracted metadata,
//! the pledge parameters and the request timestamp.

use chrono::{DateTime, Utc};
use proofsub_core::{ExtractedMetadata, VerificationParameters};

const SINGLE_FILE_TEMPLATE: &str = include_str!("templates/analyze.txt");
const PLEDGE_VERIFICATION_TEMPLATE: &str = include_str!("templates/proof.txt");

const MISSING_INPUT_PROMPT: &str = "Not provided";

/// Which instruction set the prompt is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    SingleFile,
    PledgeVerification,
}

impl PromptTemplate {
    fn source(self) -> &'static str {
        match self {
            PromptTemplate::SingleFile => SINGLE_FILE_TEMPLATE,
            PromptTemplate::PledgeVerification => PLEDGE_VERIFICATION_TEMPLATE,
        }
    }
}

/// A fully rendered prompt for one request.
#[derive(Debug, Clone)]
pub struct AnalysisPrompt {
    pub template: PromptTemplate,
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisPrompt {
    /// The `CURRENT_TIME_UTC` value rendered into the text.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.generated_at)
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Prompt for the single-file analysis endpoint.
pub fn build_analysis_prompt(
    extracted: &ExtractedMetadata,
    now: DateTime<Utc>,
) -> Result<AnalysisPrompt, serde_json::Error> {
    let metadata_json = serde_json::to_string_pretty(extracted)?;
    let timestamp = format_timestamp(now);

    let text = render(
        PromptTemplate::SingleFile.source(),
        &[
            ("LOCAL_METADATA", &metadata_json),
            ("CURRENT_TIME_UTC", &timestamp),
        ],
    );

    Ok(AnalysisPrompt {
        template: PromptTemplate::SingleFile,
        text,
        generated_at: now,
    })
}

/// Prompt for pledge verification over one or more files, in submission order.
pub fn build_proof_prompt(
    extracted: &[ExtractedMetadata],
    params: &VerificationParameters,
    now: DateTime<Utc>,
) -> Result<AnalysisPrompt, serde_json::Error> {
    let metadata_json = serde_json::to_string_pretty(extracted)?;
    let timestamp = format_timestamp(now);
    let quantity = params.quantity.to_string();
    let input_prompt = params
        .input_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(MISSING_INPUT_PROMPT);

    let text = render(
        PromptTemplate::PledgeVerification.source(),
        &[
            ("INPUT_PROMPT", input_prompt),
            ("QUANTITY", &quantity),
            ("UNITS", &params.units),
            ("LOCAL_METADATA", &metadata_json),
            ("CURRENT_TIME_UTC", &timestamp),
        ],
    );

    Ok(AnalysisPrompt {
        template: PromptTemplate::PledgeVerification,
        text,
        generated_at: now,
    })
}

/// Replace `{{NAME}}` placeholders in a single left-to-right pass. Inserted values are
/// copied verbatim and never scanned again. Unknown placeholders are left as they are.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after_open[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}
