pub mod builder;
mod config;
pub mod manual;
mod plurality;
mod stv;

use log::{debug, info};
use rand::Rng;
use snafu::prelude::*;

use std::collections::HashMap;

pub use crate::config::*;
pub use crate::plurality::PluralityCounter;
pub use crate::stv::{droop_quota, StvCounter};

/// Runs the tabulation selected by the rules on the given candidates and ballots.
///
/// Arguments:
/// * `candidates` the registered candidates for this election
/// * `ballots` the ballots, all of the kind matching `rules.method`
/// * `rules` the rules that govern this election
/// * `rng` the source of randomness for shuffling ballots and breaking plurality ties
pub fn run_election<R: Rng>(
    candidates: Vec<Candidate>,
    ballots: Vec<Ballot>,
    rules: &VoteRules,
    rng: R,
) -> Result<VotingResult, VotingErrors> {
    info!(
        "Processing {:?} ballots, {:?} candidates, rules: {:?}",
        ballots.len(),
        candidates.len(),
        rules
    );
    match rules.method {
        TabulationMethod::Plurality => {
            let mut pballots: Vec<PluralityBallot> = Vec::with_capacity(ballots.len());
            for b in ballots {
                match b {
                    Ballot::Plurality(pb) => pballots.push(pb),
                    other => {
                        return BallotKindMismatchSnafu {
                            serial_no: other.serial_no(),
                            method: rules.method,
                        }
                        .fail()
                    }
                }
            }
            PluralityCounter::load(candidates, pballots, rules, rng).run()
        }
        TabulationMethod::SingleTransferableVote => {
            let mut sballots: Vec<StvBallot> = Vec::with_capacity(ballots.len());
            for b in ballots {
                match b {
                    Ballot::Stv(sb) => sballots.push(sb),
                    other => {
                        return BallotKindMismatchSnafu {
                            serial_no: other.serial_no(),
                            method: rules.method,
                        }
                        .fail()
                    }
                }
            }
            StvCounter::load(candidates, sballots, rules, rng).run()
        }
    }
}

// **** Shared helpers for the counters ****

// Maps candidate ids to their position in the candidate list.
fn candidate_positions(
    candidates: &[Candidate],
) -> Result<HashMap<CandidateId, usize>, VotingErrors> {
    let mut res: HashMap<CandidateId, usize> = HashMap::new();
    for (pos, c) in candidates.iter().enumerate() {
        ensure!(
            res.insert(c.id, pos).is_none(),
            DuplicateCandidateSnafu { candidate: c.id }
        );
    }
    Ok(res)
}

fn check_election(
    candidates: &[Candidate],
    num_ballots: usize,
    seats: u32,
) -> Result<(), VotingErrors> {
    ensure!(
        !candidates.is_empty() && num_ballots > 0,
        EmptyElectionSnafu {}
    );
    ensure!(
        seats > 0 && seats as usize <= candidates.len(),
        InvalidSeatCountSnafu {
            seats,
            candidates: candidates.len()
        }
    );
    {
        info!("Processing {:?} ballots", num_ballots);
        for c in candidates.iter() {
            info!("Candidate: {}: {}", c.id, c.name);
        }
    }
    Ok(())
}

fn outcome(c: &Candidate) -> CandidateOutcome {
    CandidateOutcome {
        id: c.id,
        name: c.name.clone(),
        votes: c.vote_count(),
    }
}

// Collects the events for the report sink. Events are always logged, and only
// kept when the report is enabled.
#[derive(Debug, Clone)]
struct ReportLog {
    enabled: bool,
    events: Vec<ReportEvent>,
}

impl ReportLog {
    fn new(enabled: bool) -> ReportLog {
        ReportLog {
            enabled,
            events: Vec::new(),
        }
    }

    fn ballot_assigned(&mut self, serial_no: u32, candidate: &str) {
        debug!("Ballot No. {} is assigned to {}", serial_no, candidate);
        self.push(ReportEvent::BallotAssigned {
            serial_no,
            candidate: candidate.to_string(),
        });
    }

    fn winner_declared(&mut self, candidate: &str) {
        info!("Candidate {} is a winner", candidate);
        self.push(ReportEvent::WinnerDeclared {
            candidate: candidate.to_string(),
        });
    }

    fn candidate_eliminated(&mut self, candidate: &str) {
        info!("Candidate {} has been dropped", candidate);
        self.push(ReportEvent::CandidateEliminated {
            candidate: candidate.to_string(),
        });
    }

    fn push(&mut self, event: ReportEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }
}
