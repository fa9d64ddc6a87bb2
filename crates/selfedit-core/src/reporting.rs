use anyhow::{Context, Result};
use std::path::Path;

use selfedit_state::CandidateStatus;

use crate::pipeline::PipelineReport;

/// Write a pipeline report as pretty JSON.
pub fn write_pipeline_report(path: &Path, report: &PipelineReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize pipeline report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a markdown summary of a pipeline run.
pub fn render_pipeline_summary_md(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str("# Self-Edit Run\n\n");
    out.push_str(&format!("- task: {}\n", report.task));
    out.push_str(&format!(
        "- candidates: {}\n- accepted: {}\n- human review: {}\n- rejected: {}\n",
        report.outcomes.len(),
        report.count(CandidateStatus::Accepted),
        report.count(CandidateStatus::HumanReview),
        report.count(CandidateStatus::Rejected),
    ));

    if !report.outcomes.is_empty() {
        out.push_str("\n## Candidates\n");
        for o in &report.outcomes {
            let avg = o
                .avg
                .map(|a| format!("{a:.3}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!("- `{}` {} avg={}", o.candidate_id, o.status, avg));
            if let Some(err) = &o.error {
                out.push_str(&format!(" error: {err}"));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CandidateOutcome;
    use chrono::Utc;
    use selfedit_state::CandidateId;

    fn report() -> PipelineReport {
        PipelineReport {
            task: "Improve SEAL explanation quality".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes: vec![
                CandidateOutcome {
                    candidate_id: CandidateId::from("cand-a"),
                    status: CandidateStatus::Accepted,
                    avg: Some(0.6),
                    error: None,
                },
                CandidateOutcome {
                    candidate_id: CandidateId::from("cand-b"),
                    status: CandidateStatus::Rejected,
                    avg: None,
                    error: Some("training failed".into()),
                },
            ],
        }
    }

    #[test]
    fn markdown_lists_candidates() {
        let md = render_pipeline_summary_md(&report());
        assert!(md.contains("- accepted: 1"));
        assert!(md.contains("- `cand-a` accepted avg=0.600"));
        assert!(md.contains("- `cand-b` rejected avg=- error: training failed"));
    }

    #[test]
    fn json_report_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        write_pipeline_report(&path, &report()).unwrap();
        let back: PipelineReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.outcomes.len(), 2);
    }
}
