use log::{debug, info, warn};
use rand::{seq::SliceRandom, Rng};
use snafu::prelude::*;

use crate::config::*;
use crate::{candidate_positions, check_election, outcome, ReportLog};

/// Counts a plurality election: every valid ballot is one vote for one
/// candidate, and the candidates with the most votes fill the seats.
///
/// Ties at the top are broken at random, using the source of randomness given
/// when loading the election.
pub struct PluralityCounter<R> {
    candidates: Vec<Candidate>,
    ballots: Vec<PluralityBallot>,
    rules: VoteRules,
    rng: R,
    report: ReportLog,
    result: Option<VotingResult>,
}

impl<R: Rng> PluralityCounter<R> {
    pub fn load(
        candidates: Vec<Candidate>,
        ballots: Vec<PluralityBallot>,
        rules: &VoteRules,
        rng: R,
    ) -> PluralityCounter<R> {
        PluralityCounter {
            candidates,
            ballots,
            rules: rules.clone(),
            rng,
            report: ReportLog::new(rules.report_enabled),
            result: None,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn ballots(&self) -> &[PluralityBallot] {
        &self.ballots
    }

    /// Returns the number of votes of the candidates tied at the top, if at
    /// least two candidates share the highest count. Candidates without any
    /// vote are never tied.
    pub fn has_tie(&self) -> Option<u64> {
        let highest = self.candidates.iter().map(|c| c.vote_count()).max()?;
        if highest == 0 {
            return None;
        }
        let num_tied = self
            .candidates
            .iter()
            .filter(|c| c.vote_count() == highest)
            .count();
        if num_tied < 2 {
            None
        } else {
            Some(highest)
        }
    }

    /// Tabulates the election. Running it a second time returns the same result.
    pub fn run(&mut self) -> Result<VotingResult, VotingErrors> {
        if let Some(res) = &self.result {
            return Ok(res.clone());
        }
        let seats = self.rules.number_of_winners;
        check_election(&self.candidates, self.ballots.len(), seats)?;
        let positions = candidate_positions(&self.candidates)?;

        // Resolve every ballot first, so that a bad reference leaves nothing assigned.
        let mut resolved: Vec<Option<usize>> = Vec::with_capacity(self.ballots.len());
        for ballot in self.ballots.iter() {
            let pos = match ballot.candidate {
                Some(cid) => Some(*positions.get(&cid).context(
                    UnknownCandidateReferenceSnafu {
                        serial_no: ballot.serial_no,
                        candidate: cid,
                    },
                )?),
                None => None,
            };
            resolved.push(pos);
        }

        let mut invalid: u64 = 0;
        for (idx, pos) in resolved.iter().enumerate() {
            match pos {
                Some(pos) => {
                    let candidate = &mut self.candidates[*pos];
                    candidate.assigned_ballots.push(idx);
                    self.report
                        .ballot_assigned(self.ballots[idx].serial_no, &candidate.name);
                }
                None => {
                    warn!(
                        "run: ballot {} has no mark, it is not counted",
                        self.ballots[idx].serial_no
                    );
                    invalid += 1;
                }
            }
        }

        // Decreasing number of votes. The sort is stable: equal counts stay in candidate order.
        let mut sorted: Vec<usize> = (0..self.candidates.len()).collect();
        sorted.sort_by_key(|pos| std::cmp::Reverse(self.candidates[*pos].vote_count()));

        let num_seats = seats as usize;
        let winners: Vec<usize> = match self.has_tie() {
            None => sorted.iter().take(num_seats).cloned().collect(),
            Some(highest) => {
                info!("run: tie between candidates with {} votes", highest);
                let mut tied: Vec<usize> = sorted
                    .iter()
                    .filter(|pos| self.candidates[**pos].vote_count() == highest)
                    .cloned()
                    .collect();
                tied.shuffle(&mut self.rng);
                debug!("run: tied candidates after shuffling: {:?}", tied);
                if tied.len() >= num_seats {
                    tied.truncate(num_seats);
                    tied
                } else {
                    let mut res = tied;
                    let rest: Vec<usize> = sorted
                        .iter()
                        .filter(|pos| !res.contains(*pos))
                        .take(num_seats - res.len())
                        .cloned()
                        .collect();
                    res.extend(rest);
                    res
                }
            }
        };

        for pos in winners.iter() {
            let candidate = &mut self.candidates[*pos];
            candidate.selected = true;
            for idx in candidate.assigned_ballots.iter() {
                self.ballots[*idx].credited = true;
            }
            self.report.winner_declared(&candidate.name);
        }

        let dropped: Vec<CandidateOutcome> = sorted
            .iter()
            .filter(|pos| !winners.contains(*pos))
            .map(|pos| outcome(&self.candidates[*pos]))
            .collect();

        let stats = RoundStats {
            round: 1,
            tally: self
                .candidates
                .iter()
                .map(|c| (c.name.clone(), c.vote_count()))
                .collect(),
            tally_results_elected: winners
                .iter()
                .map(|pos| self.candidates[*pos].name.clone())
                .collect(),
            tally_result_eliminated: None,
            exhausted: invalid,
            credited: 0,
        };

        let res = VotingResult {
            method: TabulationMethod::Plurality,
            winners: winners
                .iter()
                .map(|pos| outcome(&self.candidates[*pos]))
                .collect(),
            dropped,
            threshold: None,
            round_stats: vec![stats],
            report: self.report.events.clone(),
        };
        self.result = Some(res.clone());
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rules(seats: u32) -> VoteRules {
        VoteRules {
            method: TabulationMethod::Plurality,
            number_of_winners: seats,
            report_enabled: true,
            shuffle_ballots: false,
        }
    }

    fn candidates(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .enumerate()
            .map(|(idx, n)| Candidate::new(CandidateId(idx as u32), n))
            .collect()
    }

    // One ballot per entry, in order: the column of the marked candidate.
    fn ballots(marks: &[Option<u32>]) -> Vec<PluralityBallot> {
        marks
            .iter()
            .enumerate()
            .map(|(idx, m)| PluralityBallot::new(idx as u32 + 1, m.map(CandidateId)))
            .collect()
    }

    fn counts(per_candidate: &[u32]) -> Vec<Option<u32>> {
        let mut res = Vec::new();
        for (cid, count) in per_candidate.iter().enumerate() {
            for _ in 0..*count {
                res.push(Some(cid as u32));
            }
        }
        res
    }

    fn winner_names(res: &VotingResult) -> Vec<String> {
        res.winners.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn fifty_ballots_four_candidates() {
        init();
        let marks = counts(&[10, 12, 8, 20]);
        assert_eq!(marks.len(), 50);
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B", "C", "D"]),
            ballots(&marks),
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        let res = counter.run().unwrap();
        assert_eq!(winner_names(&res), vec!["D"]);
        assert_eq!(res.winners[0].votes, 20);
        let dropped: Vec<(String, u64)> = res
            .dropped
            .iter()
            .map(|c| (c.name.clone(), c.votes))
            .collect();
        assert_eq!(
            dropped,
            vec![
                ("B".to_string(), 12),
                ("A".to_string(), 10),
                ("C".to_string(), 8)
            ]
        );
        assert_eq!(counter.has_tie(), None);
        assert!(counter.candidates()[3].selected);
        assert!(!counter.candidates()[1].selected);
    }

    #[test]
    fn winners_get_their_ballots_credited() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B"]),
            ballots(&[Some(0), Some(1), Some(1)]),
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        counter.run().unwrap();
        let credited: Vec<bool> = counter.ballots().iter().map(|b| b.credited).collect();
        assert_eq!(credited, vec![false, true, true]);
    }

    #[test]
    fn several_seats_without_tie() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B", "C", "D"]),
            ballots(&counts(&[3, 7, 5, 1])),
            &rules(2),
            StdRng::seed_from_u64(3),
        );
        let res = counter.run().unwrap();
        assert_eq!(winner_names(&res), vec!["B", "C"]);
        assert_eq!(res.dropped.len(), 2);
    }

    #[test]
    fn tie_at_the_top_is_broken_at_random() {
        init();
        for seed in 0..20 {
            let mut counter = PluralityCounter::load(
                candidates(&["A", "B", "C"]),
                ballots(&counts(&[4, 4, 2])),
                &rules(1),
                StdRng::seed_from_u64(seed),
            );
            let res = counter.run().unwrap();
            assert_eq!(counter.has_tie(), Some(4));
            assert_eq!(res.winners.len(), 1);
            assert!(["A", "B"].contains(&res.winners[0].name.as_str()));
        }
    }

    #[test]
    fn tie_breaking_is_reproducible_with_the_same_seed() {
        let run = |seed: u64| {
            let mut counter = PluralityCounter::load(
                candidates(&["A", "B", "C", "D"]),
                ballots(&counts(&[5, 5, 5, 5])),
                &rules(2),
                StdRng::seed_from_u64(seed),
            );
            winner_names(&counter.run().unwrap())
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn tied_group_smaller_than_the_seats() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B", "C", "D"]),
            ballots(&counts(&[6, 2, 6, 4])),
            &rules(3),
            StdRng::seed_from_u64(5),
        );
        let res = counter.run().unwrap();
        let mut first_two = winner_names(&res)[..2].to_vec();
        first_two.sort();
        assert_eq!(first_two, vec!["A", "C"]);
        assert_eq!(res.winners[2].name, "D");
        assert_eq!(res.dropped[0].name, "B");
    }

    #[test]
    fn tied_group_larger_than_the_seats() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B", "C", "D"]),
            ballots(&counts(&[3, 3, 3, 1])),
            &rules(2),
            StdRng::seed_from_u64(9),
        );
        let res = counter.run().unwrap();
        assert_eq!(res.winners.len(), 2);
        assert!(res.winners.iter().all(|c| c.votes == 3));
        assert_eq!(res.dropped.last().map(|c| c.name.as_str()), Some("D"));
    }

    #[test]
    fn unknown_candidate_is_fatal() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B"]),
            ballots(&[Some(0), Some(5), Some(1)]),
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        assert_eq!(
            counter.run(),
            Err(VotingErrors::UnknownCandidateReference {
                serial_no: 2,
                candidate: CandidateId(5)
            })
        );
        // Nothing was assigned.
        assert!(counter.candidates().iter().all(|c| c.vote_count() == 0));
    }

    #[test]
    fn unmarked_ballots_are_not_counted() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B"]),
            ballots(&[None, Some(1), None]),
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        let res = counter.run().unwrap();
        assert_eq!(winner_names(&res), vec!["B"]);
        assert_eq!(res.round_stats[0].exhausted, 2);
        assert_eq!(
            res.round_stats[0].tally,
            vec![("A".to_string(), 0), ("B".to_string(), 1)]
        );
    }

    #[test]
    fn no_tie_without_votes() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B", "C"]),
            ballots(&[None, None]),
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        assert_eq!(counter.has_tie(), None);
        let res = counter.run().unwrap();
        assert_eq!(counter.has_tie(), None);
        assert_eq!(winner_names(&res), vec!["A"]);
        assert_eq!(res.round_stats[0].exhausted, 2);
        assert!(res.winners.iter().all(|c| c.votes == 0));
    }

    #[test]
    fn no_ballots_is_an_empty_election() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B", "C"]),
            vec![],
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        assert!(counter.candidates().iter().all(|c| c.vote_count() == 0));
        assert_eq!(counter.run(), Err(VotingErrors::EmptyElection {}));
    }

    #[test]
    fn report_follows_the_counting_order() {
        init();
        let mut counter = PluralityCounter::load(
            candidates(&["A", "B"]),
            ballots(&[Some(1), Some(0), Some(1)]),
            &rules(1),
            StdRng::seed_from_u64(3),
        );
        let res = counter.run().unwrap();
        assert_eq!(
            res.report,
            vec![
                ReportEvent::BallotAssigned {
                    serial_no: 1,
                    candidate: "B".to_string()
                },
                ReportEvent::BallotAssigned {
                    serial_no: 2,
                    candidate: "A".to_string()
                },
                ReportEvent::BallotAssigned {
                    serial_no: 3,
                    candidate: "B".to_string()
                },
                ReportEvent::WinnerDeclared {
                    candidate: "B".to_string()
                },
            ]
        );
        // A second run does not count the ballots again.
        assert_eq!(counter.run().unwrap(), res);
    }
}
