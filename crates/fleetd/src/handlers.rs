//! Report generation handler: validate, build the prompt, pick the sections.

use fleet_common::{
    build_report_prompt, parse_request, GenerateResponse, GenerationMode, ReportError, Section,
};
use tracing::{info, warn};

use crate::server::AppState;

/// Handle a generate request body
pub async fn handle_generate(state: &AppState, body: &[u8]) -> Result<GenerateResponse, ReportError> {
    let request = parse_request(body).map_err(|e| {
        warn!("Rejected request: {}", e);
        ReportError::from(e)
    })?;

    info!(
        "Generating report for '{}' ({}, {} regions, {} contacts)",
        request.company_info.name,
        request.company_info.report_period,
        request.input_data.fleet_scores.len(),
        request.input_data.contacts.len()
    );

    let prompt = build_report_prompt(&request.company_info, &request.input_data);

    let sections = match state.config.mode {
        GenerationMode::Stub => vec![Section::stub()],
        GenerationMode::Live => state.completion.generate_sections(&prompt).await?,
    };

    Ok(GenerateResponse { sections })
}
