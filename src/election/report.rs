// The textual outputs of an election: the audit report and the console summary.

use std::fs;

use crate::election::*;

const SEPARATOR: &str = "---------------";

pub fn format_event(event: &ReportEvent) -> String {
    match event {
        ReportEvent::BallotAssigned {
            serial_no,
            candidate,
        } => format!("Ballot No. {} is assigned to Candidate - {}", serial_no, candidate),
        ReportEvent::WinnerDeclared { candidate } => {
            format!("Candidate - {} is a winner!", candidate)
        }
        ReportEvent::CandidateEliminated { candidate } => {
            format!("Candidate - {} has been dropped!", candidate)
        }
    }
}

/// The audit report: one block per event, in the order the events happened.
pub fn format_report(events: &[ReportEvent]) -> String {
    let mut res = String::new();
    for event in events.iter() {
        res.push_str(&format_event(event));
        res.push('\n');
        res.push_str(SEPARATOR);
        res.push('\n');
    }
    res
}

pub fn write_report(path: &str, events: &[ReportEvent]) -> VoteSysResult<()> {
    info!("write_report: writing {} events to {:?}", events.len(), path);
    fs::write(path, format_report(events)).context(WritingOutputSnafu { path })
}

pub fn render_results(result: &VotingResult) -> String {
    let mut res = String::new();
    if let Some(quota) = result.threshold {
        res.push_str(&format!("Droop Quota = {}\n", quota));
    }
    res.push_str("Winner Candidates - \n");
    for c in result.winners.iter() {
        res.push_str(&format!("{} : {}\n", c.name, c.votes));
    }
    res.push_str("Dropped Candidates - \n");
    for c in result.dropped.iter() {
        res.push_str(&format!("{} : {}\n", c.name, c.votes));
    }
    res
}
