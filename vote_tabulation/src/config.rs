// ********* Input data structures ***********

use snafu::Snafu;
use std::fmt::Display;

/// The identifier of a candidate: its zero-based column in the header row.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CandidateId(pub u32);

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate running in the election.
///
/// The ballots assigned to a candidate are stored as positions in the ballot
/// list owned by the counter that tabulates the election. Insertion order is
/// the order of assignment.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    /// Set when the candidate is declared a winner.
    pub selected: bool,
    pub(crate) assigned_ballots: Vec<usize>,
}

impl Candidate {
    pub fn new(id: CandidateId, name: &str) -> Candidate {
        Candidate {
            id,
            name: name.to_string(),
            selected: false,
            assigned_ballots: Vec::new(),
        }
    }

    pub fn vote_count(&self) -> u64 {
        self.assigned_ballots.len() as u64
    }

    /// Positions of the ballots currently held, in assignment order.
    pub fn assigned_ballots(&self) -> &[usize] {
        &self.assigned_ballots
    }
}

/// A ballot for a plurality election.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PluralityBallot {
    pub serial_no: u32,
    /// The marked candidate. A ballot without any mark is invalid and is not counted.
    pub candidate: Option<CandidateId>,
    pub credited: bool,
}

impl PluralityBallot {
    pub fn new(serial_no: u32, candidate: Option<CandidateId>) -> PluralityBallot {
        PluralityBallot {
            serial_no,
            candidate,
            credited: false,
        }
    }
}

/// A ballot for a single transferable vote election.
///
/// The serial number identifies the ballot and never changes. The order number
/// is the position of the ballot in processing order, after the ballots have
/// (optionally) been shuffled. It is only used to break elimination ties.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StvBallot {
    pub serial_no: u32,
    pub order_no: u32,
    /// Candidates in order of preference. Ids that are not registered are skipped.
    pub preferences: Vec<CandidateId>,
    pub credited: bool,
}

impl StvBallot {
    pub fn new(serial_no: u32, preferences: &[CandidateId]) -> StvBallot {
        StvBallot {
            serial_no,
            order_no: serial_no,
            preferences: preferences.to_vec(),
            credited: false,
        }
    }
}

/// A ballot of either kind. The kind must match the tabulation method.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Ballot {
    Plurality(PluralityBallot),
    Stv(StvBallot),
}

impl Ballot {
    pub fn serial_no(&self) -> u32 {
        match self {
            Ballot::Plurality(b) => b.serial_no,
            Ballot::Stv(b) => b.serial_no,
        }
    }

    pub fn is_credited(&self) -> bool {
        match self {
            Ballot::Plurality(b) => b.credited,
            Ballot::Stv(b) => b.credited,
        }
    }
}

// ******** Output data structures *********

/// A candidate as reported in the final results.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CandidateOutcome {
    pub id: CandidateId,
    pub name: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationStats {
    pub name: String,
    pub transfers: Vec<(String, u64)>,
    pub exhausted: u64,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    pub round: u32,
    /// Candidates running at the start of the round, with their count after the distribution pass.
    pub tally: Vec<(String, u64)>,
    pub tally_results_elected: Vec<String>,
    pub tally_result_eliminated: Option<EliminationStats>,
    /// Ballots without any running preference during the distribution pass.
    pub exhausted: u64,
    /// Ballots credited to the winners of earlier rounds.
    pub credited: u64,
}

/// The chronological trace of a tabulation, meant for the report sink.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ReportEvent {
    BallotAssigned { serial_no: u32, candidate: String },
    WinnerDeclared { candidate: String },
    CandidateEliminated { candidate: String },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VotingResult {
    pub method: TabulationMethod,
    /// Winners in the order they were declared.
    pub winners: Vec<CandidateOutcome>,
    /// Plurality: by decreasing votes. STV: most recently eliminated first.
    pub dropped: Vec<CandidateOutcome>,
    /// The droop quota (STV only).
    pub threshold: Option<u64>,
    pub round_stats: Vec<RoundStats>,
    /// Empty unless the report is enabled in the rules.
    pub report: Vec<ReportEvent>,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum VotingErrors {
    #[snafu(display("the election has no candidates or no ballots"))]
    EmptyElection {},
    #[snafu(display("ballot {serial_no} references unknown candidate {candidate}"))]
    UnknownCandidateReference { serial_no: u32, candidate: CandidateId },
    #[snafu(display("cannot fill {seats} seat(s) with {candidates} candidate(s)"))]
    InvalidSeatCount { seats: u32, candidates: usize },
    #[snafu(display("candidate id {candidate} is registered more than once"))]
    DuplicateCandidate { candidate: CandidateId },
    #[snafu(display("ballot {serial_no} does not match the tabulation method {method:?}"))]
    BallotKindMismatch {
        serial_no: u32,
        method: TabulationMethod,
    },
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TabulationMethod {
    Plurality,
    SingleTransferableVote,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRules {
    pub method: TabulationMethod,
    pub number_of_winners: u32,
    /// Keep the trace of ballot assignments, winners and eliminations.
    pub report_enabled: bool,
    /// Shuffle the STV ballots before assigning order numbers.
    pub shuffle_ballots: bool,
}

impl VoteRules {
    pub const DEFAULT_RULES: VoteRules = VoteRules {
        method: TabulationMethod::SingleTransferableVote,
        number_of_winners: 1,
        report_enabled: false,
        shuffle_ballots: true,
    };
}
