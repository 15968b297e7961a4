use log::{debug, info};
use rand::{seq::SliceRandom, Rng};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::*;
use crate::{candidate_positions, check_election, outcome, ReportLog};

/// The droop quota: the smallest number of votes that only `seats` candidates
/// can reach at the same time.
pub fn droop_quota(num_ballots: usize, seats: u32) -> u64 {
    (num_ballots as u64) / (seats as u64 + 1) + 1
}

/// Counts a single transferable vote election.
///
/// Each round, the ballots that are not credited to a winner go to their most
/// preferred running candidate. A candidate reaching the quota is declared a
/// winner on the spot, and the ballots it holds stay with it for the rest of
/// the count. Then the weakest candidate is eliminated and its ballots move to
/// their next preference. Rounds continue until all the candidates but
/// `number_of_winners` are eliminated.
///
/// Ties between the weakest candidates are broken with the processing order of
/// the ballots: the candidate whose first ballot came last is eliminated. A
/// candidate holding no ballot at all counts as last. Shuffling the ballots
/// before the count is what makes this order fair.
pub struct StvCounter<R> {
    candidates: Vec<Candidate>,
    ballots: Vec<StvBallot>,
    rules: VoteRules,
    rng: R,
    quota: u64,
    report: ReportLog,
    // Tabulation state. Candidates are referred to by their position.
    positions: HashMap<CandidateId, usize>,
    running: BTreeSet<usize>,
    winners: Vec<usize>,
    eliminated: Vec<usize>,
    result: Option<VotingResult>,
}

impl<R: Rng> StvCounter<R> {
    pub fn load(
        candidates: Vec<Candidate>,
        ballots: Vec<StvBallot>,
        rules: &VoteRules,
        rng: R,
    ) -> StvCounter<R> {
        let quota = droop_quota(ballots.len(), rules.number_of_winners);
        StvCounter {
            candidates,
            ballots,
            rules: rules.clone(),
            rng,
            quota,
            report: ReportLog::new(rules.report_enabled),
            positions: HashMap::new(),
            running: BTreeSet::new(),
            winners: Vec::new(),
            eliminated: Vec::new(),
            result: None,
        }
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// The ballots in processing order.
    pub fn ballots(&self) -> &[StvBallot] {
        &self.ballots
    }

    /// Tabulates the election. Running it a second time returns the same result.
    pub fn run(&mut self) -> Result<VotingResult, VotingErrors> {
        if let Some(res) = &self.result {
            return Ok(res.clone());
        }
        let seats = self.rules.number_of_winners;
        check_election(&self.candidates, self.ballots.len(), seats)?;
        self.positions = candidate_positions(&self.candidates)?;

        if self.rules.shuffle_ballots {
            self.ballots.shuffle(&mut self.rng);
        }
        for (idx, ballot) in self.ballots.iter_mut().enumerate() {
            ballot.order_no = idx as u32 + 1;
        }
        info!("run: droop quota: {}", self.quota);

        self.running = (0..self.candidates.len()).collect();
        let num_eliminations = self.candidates.len() - seats as usize;
        let mut round_stats: Vec<RoundStats> = Vec::new();
        while self.eliminated.len() < num_eliminations {
            let round = round_stats.len() as u32 + 1;
            let stats = self.run_round(round);
            debug!("run: round {} stats: {:?}", round, stats);
            let stop = stats.tally_result_eliminated.is_none();
            round_stats.push(stats);
            if stop {
                break;
            }
        }

        if self.winners.len() < seats as usize {
            let mut remaining: Vec<usize> = self.running.iter().cloned().collect();
            remaining.sort_by_key(|pos| self.candidates[*pos].id);
            for pos in remaining {
                info!(
                    "run: candidate {} wins a remaining seat",
                    self.candidates[pos].name
                );
                self.candidates[pos].selected = true;
                self.running.remove(&pos);
                self.winners.push(pos);
            }
        }

        let res = VotingResult {
            method: TabulationMethod::SingleTransferableVote,
            winners: self
                .winners
                .iter()
                .map(|pos| outcome(&self.candidates[*pos]))
                .collect(),
            dropped: self
                .eliminated
                .iter()
                .rev()
                .map(|pos| outcome(&self.candidates[*pos]))
                .collect(),
            threshold: Some(self.quota),
            round_stats,
            report: self.report.events.clone(),
        };
        self.result = Some(res.clone());
        Ok(res)
    }

    fn run_round(&mut self, round: u32) -> RoundStats {
        info!("run_round: round {}", round);
        let credited = self.ballots.iter().filter(|b| b.credited).count() as u64;
        let running: Vec<usize> = self.running.iter().cloned().collect();
        for pos in running.iter() {
            self.candidates[*pos].assigned_ballots.clear();
        }
        let num_winners = self.winners.len();

        let exhausted = self.distribute();
        let tally: Vec<(String, u64)> = running
            .iter()
            .map(|pos| {
                let c = &self.candidates[*pos];
                (c.name.clone(), c.vote_count())
            })
            .collect();

        let eliminated = self.drop_candidate();
        let elected: Vec<String> = self.winners[num_winners..]
            .iter()
            .map(|pos| self.candidates[*pos].name.clone())
            .collect();

        let total: u64 = tally.iter().map(|(_, count)| count).sum();
        assert_eq!(
            total + exhausted + credited,
            self.ballots.len() as u64,
            "votes are not conserved in round {}",
            round
        );

        RoundStats {
            round,
            tally,
            tally_results_elected: elected,
            tally_result_eliminated: eliminated,
            exhausted,
            credited,
        }
    }

    // Gives each ballot not credited yet to its first running preference.
    // Returns the number of ballots with no running preference.
    fn distribute(&mut self) -> u64 {
        let mut exhausted = 0;
        for idx in 0..self.ballots.len() {
            if self.ballots[idx].credited {
                continue;
            }
            match self.first_running_preference(idx) {
                Some(pos) => self.assign(idx, pos),
                None => {
                    debug!(
                        "distribute: ballot {} is exhausted",
                        self.ballots[idx].serial_no
                    );
                    exhausted += 1;
                }
            }
        }
        exhausted
    }

    fn first_running_preference(&self, ballot_idx: usize) -> Option<usize> {
        self.ballots[ballot_idx]
            .preferences
            .iter()
            .filter_map(|cid| self.positions.get(cid))
            .find(|pos| self.running.contains(*pos))
            .cloned()
    }

    fn assign(&mut self, ballot_idx: usize, pos: usize) {
        let candidate = &mut self.candidates[pos];
        candidate.assigned_ballots.push(ballot_idx);
        self.report
            .ballot_assigned(self.ballots[ballot_idx].serial_no, &candidate.name);
        if candidate.vote_count() == self.quota {
            self.declare_winner(pos);
        }
    }

    fn declare_winner(&mut self, pos: usize) {
        let candidate = &mut self.candidates[pos];
        self.report.winner_declared(&candidate.name);
        for idx in candidate.assigned_ballots.iter() {
            self.ballots[*idx].credited = true;
        }
        candidate.selected = true;
        self.running.remove(&pos);
        self.winners.push(pos);
    }

    // The running candidate with the fewest votes. On a tie, the one whose
    // first ballot has the largest order number, and candidates without any
    // ballot before all others (highest position first).
    fn weakest_candidate(&self) -> Option<usize> {
        let lowest = self
            .running
            .iter()
            .map(|pos| self.candidates[*pos].vote_count())
            .min()?;
        self.running
            .iter()
            .filter(|pos| self.candidates[**pos].vote_count() == lowest)
            .max_by_key(|pos| {
                let first = self.candidates[**pos]
                    .assigned_ballots
                    .first()
                    .map(|idx| self.ballots[*idx].order_no);
                (first.is_none(), first.unwrap_or(0), **pos)
            })
            .cloned()
    }

    // Eliminates the weakest candidate and moves its ballots to their next
    // running preference.
    fn drop_candidate(&mut self) -> Option<EliminationStats> {
        let loser = self.weakest_candidate()?;
        self.report.candidate_eliminated(&self.candidates[loser].name);
        self.running.remove(&loser);
        self.eliminated.push(loser);

        let mut transfers: BTreeMap<usize, u64> = BTreeMap::new();
        let mut exhausted: u64 = 0;
        let held = self.candidates[loser].assigned_ballots.clone();
        for idx in held {
            if self.ballots[idx].credited {
                continue;
            }
            match self.first_running_preference(idx) {
                Some(pos) => {
                    *transfers.entry(pos).or_insert(0) += 1;
                    self.assign(idx, pos);
                }
                None => exhausted += 1,
            }
        }
        Some(EliminationStats {
            name: self.candidates[loser].name.clone(),
            transfers: transfers
                .iter()
                .map(|(pos, count)| (self.candidates[*pos].name.clone(), *count))
                .collect(),
            exhausted,
        })
    }
}
