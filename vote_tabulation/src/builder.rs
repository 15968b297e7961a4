pub use crate::config::*;

use log::warn;
use rand::Rng;
use snafu::prelude::*;
use std::collections::HashSet;

/// A builder for assembling the candidates and ballots of an election.
///
/// Candidates get their id from their position in the list. Ballots get
/// increasing serial numbers, starting at 1, in the order they are added.
///
/// ```
/// pub use vote_tabulation::builder::Builder;
/// pub use vote_tabulation::{TabulationMethod, VoteRules};
/// # use vote_tabulation::VotingErrors;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let rules = VoteRules {
///     method: TabulationMethod::SingleTransferableVote,
///     shuffle_ballots: false,
///     ..VoteRules::DEFAULT_RULES
/// };
/// let mut builder = Builder::new(&rules)?
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_ranked_vote(&[0, 1])?;
/// builder.add_ranked_vote(&[0])?;
/// builder.add_ranked_vote(&[1, 0])?;
///
/// let result = builder.run(StdRng::seed_from_u64(0))?;
/// assert_eq!(result.winners[0].name, "Anna");
///
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: VoteRules,
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &VoteRules) -> Result<Builder, VotingErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    /// Registers the candidates, in header order.
    ///
    /// Names do not need to be unique, but a repeated name is most likely a
    /// mistake in the input and it is reported.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, VotingErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for name in cands.iter() {
            if !seen.insert(name.as_str()) {
                warn!("Builder::candidates: candidate name {:?} appears more than once", name);
            }
        }
        Ok(Builder {
            _rules: self._rules,
            _candidates: cands
                .iter()
                .enumerate()
                .map(|(idx, name)| Candidate::new(CandidateId(idx as u32), name))
                .collect(),
            _ballots: Vec::new(),
        })
    }

    /// Adds a plurality ballot.
    ///
    /// choice: the column of the marked candidate, or None if the ballot has no mark.
    pub fn add_plurality_vote(&mut self, choice: Option<u32>) -> Result<(), VotingErrors> {
        let serial_no = self.next_serial_no();
        ensure!(
            self._rules.method == TabulationMethod::Plurality,
            BallotKindMismatchSnafu {
                serial_no,
                method: self._rules.method
            }
        );
        self._ballots.push(Ballot::Plurality(PluralityBallot::new(
            serial_no,
            choice.map(CandidateId),
        )));
        Ok(())
    }

    /// Adds a ranked ballot.
    ///
    /// preferences: the columns of the ranked candidates, most preferred first.
    /// The list may be empty, in which case the ballot is exhausted from the start.
    pub fn add_ranked_vote(&mut self, preferences: &[u32]) -> Result<(), VotingErrors> {
        let serial_no = self.next_serial_no();
        ensure!(
            self._rules.method == TabulationMethod::SingleTransferableVote,
            BallotKindMismatchSnafu {
                serial_no,
                method: self._rules.method
            }
        );
        let prefs: Vec<CandidateId> = preferences.iter().map(|c| CandidateId(*c)).collect();
        self._ballots.push(Ballot::Stv(StvBallot::new(serial_no, &prefs)));
        Ok(())
    }

    /// Adds a ballot that was built elsewhere. The serial number is kept as is.
    pub fn add_ballot(&mut self, ballot: Ballot) -> Result<(), VotingErrors> {
        let matches_method = matches!(
            (&ballot, self._rules.method),
            (Ballot::Plurality(_), TabulationMethod::Plurality)
                | (Ballot::Stv(_), TabulationMethod::SingleTransferableVote)
        );
        ensure!(
            matches_method,
            BallotKindMismatchSnafu {
                serial_no: ballot.serial_no(),
                method: self._rules.method
            }
        );
        self._ballots.push(ballot);
        Ok(())
    }

    pub fn build(self) -> (Vec<Candidate>, Vec<Ballot>) {
        (self._candidates, self._ballots)
    }

    /// Runs the election with the rules given to the builder.
    pub fn run<R: Rng>(self, rng: R) -> Result<VotingResult, VotingErrors> {
        let rules = self._rules.clone();
        let (candidates, ballots) = self.build();
        crate::run_election(candidates, ballots, &rules, rng)
    }

    fn next_serial_no(&self) -> u32 {
        self._ballots.len() as u32 + 1
    }
}
