//! Report prompt construction.
//!
//! The template is a fixed asset shared with the completion service: keep it
//! byte-for-byte stable. Placeholders are resolved in one pass by lookup, so
//! substituted values are never rescanned for further tokens.

use crate::schema::{CompanyInfo, InputData};
use tracing::{debug, info};

/// Token in the report template that is replaced by a company field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    CompanyName,
    IndustryType,
    PrimaryColor,
    SecondaryColor,
    LogoDetails,
    ReportPeriod,
}

impl Placeholder {
    pub const ALL: [Placeholder; 6] = [
        Placeholder::CompanyName,
        Placeholder::IndustryType,
        Placeholder::PrimaryColor,
        Placeholder::SecondaryColor,
        Placeholder::LogoDetails,
        Placeholder::ReportPeriod,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::CompanyName => "[COMPANY_NAME]",
            Placeholder::IndustryType => "[INDUSTRY_TYPE]",
            Placeholder::PrimaryColor => "[PRIMARY_COLOR]",
            Placeholder::SecondaryColor => "[SECONDARY_COLOR]",
            Placeholder::LogoDetails => "[LOGO_DETAILS]",
            Placeholder::ReportPeriod => "[REPORT_PERIOD]",
        }
    }

    fn resolve(self, company: &CompanyInfo) -> &str {
        match self {
            Placeholder::CompanyName => &company.name,
            Placeholder::IndustryType => &company.industry,
            Placeholder::PrimaryColor => &company.primary_color,
            Placeholder::SecondaryColor => &company.secondary_color,
            Placeholder::LogoDetails => &company.logo_desc,
            Placeholder::ReportPeriod => &company.report_period,
        }
    }

    /// Placeholder whose token starts `text`, if any
    fn at_start_of(text: &str) -> Option<Placeholder> {
        Self::ALL.into_iter().find(|p| text.starts_with(p.token()))
    }
}

/// Weekly DOT Fleet Compliance Snapshot instructions
pub const REPORT_TEMPLATE: &str = r#"You are an expert fleet compliance analyst tasked with creating weekly DOT Fleet Compliance Snapshot reports.
Generate a comprehensive report following this exact structure and format.

---
COMPANY INFORMATION REQUIRED
Company Name: [COMPANY_NAME]
Company Type/Industry: [INDUSTRY_TYPE]
Brand Colors: Primary [PRIMARY_COLOR], Secondary [SECONDARY_COLOR]
Logo Description: [LOGO_DETAILS]
Reporting Week: [REPORT_PERIOD]

INPUT DATA REQUIRED
Fleet safety scores (Corporate, Great Lakes, Ohio Valley, Southeast)
HOS violations (by type & region)
Safety events
Unassigned driving segments
Speeding events breakdown
Personal conveyance per driver
Missed DVIR data
Contacted individuals list

---
# 1 VISUAL DASHBOARD (Page 1)
## Header
* **[COMPANY_NAME]** – *DOT Fleet Compliance Snapshot*
* Date range [REPORT_PERIOD]

## Fleet Score Widget
* Show scores & Δ for each region, colour‑coded
* Target line = 90 ("Fleet Safety Score Goal: 90")

## HOS Violations Chart
* Stacked bar by region (GL, OV, SE)
* Colour key: Missing Certifications (cyan), Shift Duty Limit (orange), Shift Driving Limit (yellow), Cycle Limit (white)

## 4‑Week Trend Analysis
* Line graph per violation type, X = last 4 weeks, Y = 0‑200

## Safety Events Bar Chart
* Following Distance, Harsh Turn, Harsh Brake / Defensive Driving per region

## Unassigned Driving Segments
* Visual of segments & top contributors (vehicle ID + driver)

## Speeding Events Pie
* Light / Moderate / Heavy / Severe percentages & total

---
# 2 DETAILED ANALYSIS (Pages 2‑6)
### Overall Fleet Safety Summary
• Current fleet score vs goal
• Regional changes
• Key concerns / improvements

### HOS Violations Summary
• Total & WoW change
• Regional breakdown, top violation types
• **Insights:** paragraph

### HOS 4‑Week Trend Analysis
Describe persistent issues & improvements.

### Safety Events Analysis
Totals, dismissal rate, patterns, recommendations.

### Personal Conveyance Usage
Goal ≤ 3 h per driver. List violators, analyse compliance.

### Unassigned Driving Segments
Totals, breakdown, root causes & recommendations.

### Driver Behaviour & Speeding Analysis
High‑risk counts, severities, regional split, recommendations.

### Missed DVIRs
Pre‑trip vs post‑trip totals, offenders, compliance impact.

### Overall DOT Risk Assessment
Summarise compliance posture, key risk areas, trend, audit prep.

---
## 3 FORMATTING REQUIREMENTS
* Use brand colours & logo
* Bold key metrics, bullet lists, "Insights:" headers
* Tables with clear headers, totals, WoW arrows
* Percentages rounded 1 dp

## 4 TONE & STYLE
Professional, improvement‑focused, use DOT terms.

## 5 KEY METRICS TO CALCULATE
1. Fleet Safety Score (avg.)
2. HOS Violation Rate
3. Safety Event Dismissal Rate
4. Personal Conveyance Compliance Rate
5. DVIR Compliance Rate
6. Speeding Severity Distribution

## 6 VISUAL RECREATION INSTRUCTIONS
Colour palette & chart‑type guidance (see PDF for details)."#;

/// Build the report-generation prompt for one request.
///
/// `_data` is validated upstream but not interpolated: the template carries
/// only company placeholders.
pub fn build_report_prompt(company: &CompanyInfo, _data: &InputData) -> String {
    let prompt = render_template(REPORT_TEMPLATE, company);
    info!(target: "fleetd::prompt", "Built report prompt ({} chars) for {}", prompt.len(), company.name);
    debug!(target: "fleetd::prompt", "{}", prompt);
    prompt
}

/// Substitute every placeholder in `template` with the matching company field
pub fn render_template(template: &str, company: &CompanyInfo) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        match Placeholder::at_start_of(candidate) {
            Some(placeholder) => {
                out.push_str(placeholder.resolve(company));
                rest = &candidate[placeholder.token().len()..];
            }
            None => {
                out.push('[');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn company() -> CompanyInfo {
        CompanyInfo {
            name: "Acme Logistics".into(),
            industry: "Freight".into(),
            primary_color: "#003366".into(),
            secondary_color: "#FF9900".into(),
            logo_desc: "Blue hexagon with a truck".into(),
            report_period: "Jun 2 - Jun 8".into(),
        }
    }

    fn empty_data() -> InputData {
        InputData {
            fleet_scores: BTreeMap::new(),
            hos_violations: BTreeMap::new(),
            safety_events: BTreeMap::new(),
            unassigned_driving: BTreeMap::new(),
            speeding_events: BTreeMap::new(),
            personal_conveyance: BTreeMap::new(),
            missed_dvir: BTreeMap::new(),
            contacts: vec![],
        }
    }

    #[test]
    fn test_no_tokens_left() {
        let prompt = build_report_prompt(&company(), &empty_data());
        for p in Placeholder::ALL {
            assert!(!prompt.contains(p.token()), "{} left in prompt", p.token());
        }
        assert!(prompt.contains("Company Name: Acme Logistics\n"));
        assert!(prompt.contains("Company Type/Industry: Freight\n"));
        assert!(prompt.contains("Brand Colors: Primary\u{a0}#003366, Secondary\u{a0}#FF9900\n"));
        assert!(prompt.contains("Logo Description: Blue hexagon with a truck\n"));
        assert!(prompt.contains("* **Acme Logistics** – *DOT Fleet Compliance Snapshot*"));
        assert!(prompt.contains("* Date\u{a0}range\u{a0}Jun 2 - Jun 8\n"));
    }

    #[test]
    fn test_matches_sequential_replace_for_plain_values() {
        let c = company();
        let expected = REPORT_TEMPLATE
            .replace("[COMPANY_NAME]", &c.name)
            .replace("[INDUSTRY_TYPE]", &c.industry)
            .replace("[PRIMARY_COLOR]", &c.primary_color)
            .replace("[SECONDARY_COLOR]", &c.secondary_color)
            .replace("[LOGO_DETAILS]", &c.logo_desc)
            .replace("[REPORT_PERIOD]", &c.report_period);
        assert_eq!(render_template(REPORT_TEMPLATE, &c), expected);
    }

    #[test]
    fn test_idempotent() {
        let a = build_report_prompt(&company(), &empty_data());
        let b = build_report_prompt(&company(), &empty_data());
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_cascading_substitution() {
        let mut c = company();
        c.name = "[REPORT_PERIOD] Corp".into();
        c.report_period = "Week 1".into();

        let prompt = build_report_prompt(&c, &empty_data());
        assert_eq!(prompt.matches("[REPORT_PERIOD] Corp").count(), 2);
        assert!(prompt.contains("Company Name: [REPORT_PERIOD] Corp\n"));
        assert!(prompt.contains("Reporting Week: Week 1\n"));
        assert!(prompt.contains("* Date\u{a0}range\u{a0}Week 1\n"));
    }

    #[test]
    fn test_value_with_brackets_kept_verbatim() {
        let mut c = company();
        c.logo_desc = "[INDUSTRY_TYPE] shield [".into();
        let prompt = render_template("[LOGO_DETAILS]/[INDUSTRY_TYPE]/[UNKNOWN]", &c);
        assert_eq!(prompt, "[INDUSTRY_TYPE] shield [/Freight/[UNKNOWN]");
    }

    #[test]
    fn test_template_counts() {
        assert_eq!(REPORT_TEMPLATE.matches("[COMPANY_NAME]").count(), 2);
        assert_eq!(REPORT_TEMPLATE.matches("[REPORT_PERIOD]").count(), 2);
        assert_eq!(REPORT_TEMPLATE.matches("[LOGO_DETAILS]").count(), 1);
        assert!(REPORT_TEMPLATE.starts_with("You are an expert fleet compliance analyst"));
        assert!(REPORT_TEMPLATE.ends_with("(see PDF for details)."));
    }
}
