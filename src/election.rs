pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod report;

use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use vote_tabulation::builder::Builder;
use vote_tabulation::*;

use std::fs;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::election::config_reader::*;
use crate::election::io_common::*;

#[derive(Debug, Snafu)]
pub enum VoteSysError {
    #[snafu(display("Error reading ballot file {path}"))]
    SourceUnavailable { source: csv::Error, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No candidate row in {path}"))]
    EmptySource { path: String },
    #[snafu(display("The candidates in {path} ({found}) differ from the first file ({expected})"))]
    MismatchedHeaders {
        path: String,
        expected: String,
        found: String,
    },
    #[snafu(display("{path}:{lineno}: invalid rank {content:?} in column {column}"))]
    InvalidRank {
        path: String,
        lineno: usize,
        column: usize,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a non-negative integer"))]
    ParsingJsonNumber {},
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Tabulation failed: {source}"))]
    Tabulation { source: VotingErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type VoteSysResult<T> = Result<T, VoteSysError>;

/// A ballot file as read from disk, before the cells are interpreted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawSource {
    pub path: String,
    /// The candidate names, in column order.
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub lineno: usize,
    pub cells: Vec<String>,
}

fn method_name(method: TabulationMethod) -> &'static str {
    match method {
        TabulationMethod::Plurality => "plurality",
        TabulationMethod::SingleTransferableVote => "stv",
    }
}

fn parse_method(s: &str) -> VoteSysResult<TabulationMethod> {
    match s.to_lowercase().as_str() {
        "plurality" | "p" => Ok(TabulationMethod::Plurality),
        "stv" | "singletransferablevote" | "s" => Ok(TabulationMethod::SingleTransferableVote),
        _ => whatever!(
            "Unknown tabulation method {:?}, expected 'plurality' or 'stv'",
            s
        ),
    }
}

fn result_stats_to_json(rs: &VotingResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.round_stats.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, count) in round_stat.tally.iter() {
            tally.insert(name.clone(), json!(count.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        if let Some(elim_stats) = &round_stat.tally_result_eliminated {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            for (name, count) in elim_stats.transfers.iter() {
                transfers.insert(name.clone(), json!(count.to_string()));
            }
            if elim_stats.exhausted > 0 {
                transfers.insert(
                    "exhausted".to_string(),
                    json!(elim_stats.exhausted.to_string()),
                );
            }
            tally_results.push(json!({
                "eliminated": elim_stats.name,
                "transfers": transfers
            }));
        }
        for winner_name in round_stat.tally_results_elected.iter() {
            tally_results.push(json!({
                "elected": winner_name,
                "transfers": {}
            }));
        }

        let js = json!({"round": round_stat.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn outcomes_to_json(cs: &[CandidateOutcome]) -> Vec<JSValue> {
    cs.iter()
        .map(|c| json!({"name": c.name, "votes": c.votes.to_string()}))
        .collect()
}

fn build_summary_js(config: &ElectionConfig, rules: &VoteRules, rv: &VotingResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        office: config.output_settings.contest_office.clone(),
        method: method_name(rules.method).to_string(),
        seats: rules.number_of_winners.to_string(),
        threshold: rv.threshold.map(|t| t.to_string()),
    };
    json!({
        "config": c,
        "results": result_stats_to_json(rv),
        "winners": outcomes_to_json(&rv.winners),
        "dropped": outcomes_to_json(&rv.dropped),
    })
}

pub fn validate_rules(election_rules: &ElectionRules) -> VoteSysResult<VoteRules> {
    let res = VoteRules {
        method: parse_method(&election_rules.tabulation_method)?,
        number_of_winners: election_rules.seats()?,
        report_enabled: election_rules.generate_report.unwrap_or(false),
        shuffle_ballots: election_rules.shuffle_ballots.unwrap_or(true),
    };
    Ok(res)
}

fn read_election_data(root_path: &Path, cfs: &FileSource) -> VoteSysResult<RawSource> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read ballot file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" | "" => io_csv::read_csv_source(&p2),
        "xlsx" | "excel" => io_excel::read_excel_source(&p2, cfs.excel_worksheet_name.as_deref()),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

/// Turns the rows of the ballot files into candidates and ballots for the
/// selected method. All the files must list the same candidates.
pub fn build_ballots(
    rules: &VoteRules,
    sources: &[RawSource],
) -> VoteSysResult<(Vec<Candidate>, Vec<Ballot>)> {
    let first = match sources.first() {
        Some(x) => x,
        None => whatever!("No ballot file to read"),
    };
    for src in sources.iter().skip(1) {
        ensure!(
            src.header == first.header,
            MismatchedHeadersSnafu {
                path: src.path.clone(),
                expected: first.header.join(","),
                found: src.header.join(","),
            }
        );
    }

    let mut builder = Builder::new(rules)
        .context(TabulationSnafu {})?
        .candidates(&first.header)
        .context(TabulationSnafu {})?;
    for src in sources.iter() {
        let source_name = simplify_file_name(&src.path);
        for row in src.rows.iter() {
            match rules.method {
                TabulationMethod::Plurality => {
                    let choice = plurality_choice(&source_name, row.lineno, &row.cells);
                    builder
                        .add_plurality_vote(choice)
                        .context(TabulationSnafu {})?;
                }
                TabulationMethod::SingleTransferableVote => {
                    let ranks = parse_ranks(&source_name, row.lineno, &row.cells)?;
                    let prefs = assemble_preferences(&ranks);
                    if prefs.is_empty() {
                        warn!(
                            "build_ballots: {}:{}: blank ballot",
                            source_name, row.lineno
                        );
                    }
                    builder
                        .add_ranked_vote(&prefs)
                        .context(TabulationSnafu {})?;
                }
            }
        }
    }
    Ok(builder.build())
}

/// Reads the ballots of an election and tabulates them.
pub fn tabulate(
    config: &ElectionConfig,
    root_path: &Path,
    rules: &VoteRules,
    seed: Option<u64>,
) -> VoteSysResult<VotingResult> {
    if config.cvr_file_sources.is_empty() {
        whatever!("No ballot file source in the configuration");
    }
    let mut sources: Vec<RawSource> = Vec::new();
    for cfs in config.cvr_file_sources.iter() {
        sources.push(read_election_data(root_path, cfs)?);
    }
    let (candidates, ballots) = build_ballots(rules, &sources)?;
    debug!("tabulate: candidates: {:?}", candidates);

    let rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let result = run_election(candidates, ballots, rules, rng).context(TabulationSnafu {})?;
    info!("tabulate: winners: {:?}", result.winners);
    Ok(result)
}

fn config_from_args(input: &str, args: &Args) -> ElectionConfig {
    ElectionConfig {
        output_settings: OutputSettings {
            contest_name: simplify_file_name(input),
            ..OutputSettings::default()
        },
        cvr_file_sources: vec![file_source_from_args(input, args)],
        rules: ElectionRules {
            tabulation_method: "stv".to_string(),
            number_of_winners: None,
            random_seed: None,
            shuffle_ballots: None,
            generate_report: None,
        },
    }
}

fn file_source_from_args(input: &str, args: &Args) -> FileSource {
    let provider = match &args.input_type {
        Some(x) => x.clone(),
        None if input.ends_with(".xlsx") => "xlsx".to_string(),
        None => "csv".to_string(),
    };
    FileSource {
        provider,
        file_path: input.to_string(),
        excel_worksheet_name: args.excel_worksheet_name.clone(),
    }
}

/// The command line flags take precedence over the configuration file.
fn apply_args(rules: &VoteRules, args: &Args) -> VoteSysResult<VoteRules> {
    let mut res = rules.clone();
    if let Some(m) = &args.method {
        res.method = parse_method(m)?;
    }
    if let Some(s) = args.seats {
        res.number_of_winners = s;
    }
    if args.no_shuffle {
        res.shuffle_ballots = false;
    }
    if args.report.is_some() {
        res.report_enabled = true;
    }
    Ok(res)
}

// Relative output paths land in the output directory, when there is one.
fn output_path(out_dir: &Option<PathBuf>, path: &str) -> String {
    match out_dir {
        Some(d) => d.join(path).display().to_string(),
        None => path.to_string(),
    }
}

fn write_output(out: &str, content: &str) -> VoteSysResult<()> {
    if out == "stdout" {
        println!("{}", content);
        Ok(())
    } else {
        info!("write_output: writing summary to {:?}", out);
        fs::write(out, content).context(WritingOutputSnafu { path: out })
    }
}

pub fn run_election_cli(args: Args) -> VoteSysResult<()> {
    let (config, root_path): (ElectionConfig, PathBuf) = match (&args.config, &args.input) {
        (Some(config_path), input) => {
            let mut config = read_config(config_path)?;
            let root = Path::new(config_path.as_str())
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            if let Some(input) = input {
                config.cvr_file_sources = vec![file_source_from_args(input, &args)];
            }
            (config, root)
        }
        (None, Some(input)) => (config_from_args(input, &args), PathBuf::new()),
        (None, None) => whatever!("Either --config or --input must be provided"),
    };
    info!("config: {:?}", config);

    let rules = apply_args(&validate_rules(&config.rules)?, &args)?;
    let seed = match args.seed {
        Some(s) => Some(s),
        None => config.rules.seed()?,
    };
    info!("rules: {:?} seed: {:?}", rules, seed);

    let result = tabulate(&config, &root_path, &rules, seed)?;
    print!("{}", report::render_results(&result));

    let out_dir = config.output_settings.output_dir(&root_path);
    if let Some(d) = &out_dir {
        let path = d.display().to_string();
        fs::create_dir_all(d).context(WritingOutputSnafu { path })?;
    }

    if rules.report_enabled {
        let config_dir = out_dir.clone().unwrap_or_else(|| root_path.clone());
        let report_path = match (&args.report, &config.output_settings.report_file) {
            (Some(p), _) => output_path(&out_dir, p),
            (None, Some(p)) => config_dir.join(p).display().to_string(),
            (None, None) => config_dir.join("election_report.txt").display().to_string(),
        };
        report::write_report(&report_path, &result.report)?;
    }

    let result_js = build_summary_js(&config, &rules, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    if let Some(out) = &args.out {
        let out = if out == "stdout" {
            out.clone()
        } else {
            output_path(&out_dir, out)
        };
        write_output(&out, &pretty_js_stats)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> String {
        format!("{}/tests/data", env!("CARGO_MANIFEST_DIR"))
    }

    fn test_wrapper(test_name: &str) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = test_dir();
        let args = Args {
            config: Some(format!("{}/{}/{}_config.json", dir, test_name, test_name)),
            reference: Some(format!(
                "{}/{}/{}_expected_summary.json",
                dir, test_name, test_name
            )),
            ..Args::default()
        };
        let res = run_election_cli(args);
        if let Err(e) = &res {
            eprintln!("An error occured {}", e);
        }
        assert!(res.is_ok());
    }

    fn source(path: &str, header: &[&str], rows: &[&[&str]]) -> RawSource {
        RawSource {
            path: path.to_string(),
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(idx, r)| RawRow {
                    lineno: idx + 2,
                    cells: r.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn rules(method: TabulationMethod) -> VoteRules {
        VoteRules {
            method,
            number_of_winners: 1,
            report_enabled: false,
            shuffle_ballots: false,
        }
    }

    #[test]
    fn plurality_50_votes_4_candidates() {
        test_wrapper("plurality_50_votes_4_candidates");
    }

    #[test]
    fn stv_tie_transfer() {
        test_wrapper("stv_tie_transfer");
    }

    #[test]
    fn stv_from_input_flag() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("summary.json").display().to_string();
        let report = dir.path().join("report.txt").display().to_string();
        let args = Args {
            input: Some(format!(
                "{}/stv_tie_transfer/stv_tie_transfer_ballots.csv",
                test_dir()
            )),
            method: Some("stv".to_string()),
            seats: Some(1),
            no_shuffle: true,
            out: Some(out.clone()),
            report: Some(report.clone()),
            ..Args::default()
        };
        run_election_cli(args).unwrap();
        let summary = read_summary(&out).unwrap();
        assert_eq!(summary["config"]["threshold"], json!("3"));
        assert_eq!(summary["winners"][0]["name"], json!("A"));
        let content = fs::read_to_string(&report).unwrap();
        let first_event = "Ballot No. 1 is assigned to Candidate - A\n---------------\n";
        assert!(content.starts_with(first_event));
        assert!(content.ends_with("Candidate - A is a winner!\n---------------\n"));
    }

    #[test]
    fn outputs_go_to_the_output_directory() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let ballots = "A,B,C\n1,2,3\n2,1,3\n1,3,2\n3,2,1\n";
        fs::write(dir.path().join("ballots.csv"), ballots).unwrap();
        let config = json!({
            "outputSettings": {
                "contestName": "council",
                "outputDirectory": "results",
                "reportFile": "report.txt"
            },
            "cvrFileSources": [{"provider": "csv", "filePath": "ballots.csv"}],
            "rules": {
                "tabulationMethod": "stv",
                "shuffleBallots": false,
                "generateReport": true
            }
        });
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, config.to_string()).unwrap();
        let args = Args {
            config: Some(config_path.display().to_string()),
            out: Some("summary.json".to_string()),
            ..Args::default()
        };
        run_election_cli(args).unwrap();
        let results = dir.path().join("results");
        let summary = read_summary(&results.join("summary.json").display().to_string()).unwrap();
        assert_eq!(summary["winners"][0]["name"], json!("A"));
        let content = fs::read_to_string(results.join("report.txt")).unwrap();
        assert!(content.ends_with("Candidate - A is a winner!\n---------------\n"));
        assert!(!dir.path().join("report.txt").exists());
    }

    #[test]
    fn missing_input() {
        assert!(run_election_cli(Args::default()).is_err());
    }

    #[test]
    fn headers_must_match() {
        let s1 = source("a.csv", &["A", "B"], &[&["1", ""]]);
        let s2 = source("b.csv", &["A", "C"], &[&["", "1"]]);
        let res = build_ballots(&rules(TabulationMethod::Plurality), &[s1, s2]);
        assert!(matches!(res, Err(VoteSysError::MismatchedHeaders { .. })));
    }

    #[test]
    fn several_sources_are_concatenated() {
        let s1 = source("a.csv", &["A", "B"], &[&["1", ""]]);
        let s2 = source("b.csv", &["A", "B"], &[&["", "1"], &["", "1"]]);
        let (candidates, ballots) =
            build_ballots(&rules(TabulationMethod::Plurality), &[s1, s2]).unwrap();
        assert_eq!(candidates.len(), 2);
        let serials: Vec<u32> = ballots.iter().map(|b| b.serial_no()).collect();
        assert_eq!(serials, vec![1, 2, 3]);
    }

    #[test]
    fn plurality_mark_outside_the_header() {
        let s = source("a.csv", &["A", "B"], &[&["", "1"], &["", "", "1"]]);
        let (candidates, ballots) =
            build_ballots(&rules(TabulationMethod::Plurality), &[s]).unwrap();
        let res = run_election(
            candidates,
            ballots,
            &rules(TabulationMethod::Plurality),
            StdRng::seed_from_u64(0),
        );
        assert_eq!(
            res,
            Err(VotingErrors::UnknownCandidateReference {
                serial_no: 2,
                candidate: CandidateId(2)
            })
        );
    }

    #[test]
    fn ranked_rows() {
        let s = source("a.csv", &["A", "B", "C"], &[&["2", "", "1"], &["", "", ""]]);
        let (_, ballots) =
            build_ballots(&rules(TabulationMethod::SingleTransferableVote), &[s]).unwrap();
        assert_eq!(
            ballots,
            vec![
                Ballot::Stv(StvBallot::new(1, &[CandidateId(2), CandidateId(0)])),
                Ballot::Stv(StvBallot::new(2, &[])),
            ]
        );
        let bad = source("a.csv", &["A", "B"], &[&["1", "x"]]);
        assert!(matches!(
            build_ballots(&rules(TabulationMethod::SingleTransferableVote), &[bad]),
            Err(VoteSysError::InvalidRank { .. })
        ));
    }

    #[test]
    fn method_names() {
        assert_eq!(parse_method("STV").unwrap(), TabulationMethod::SingleTransferableVote);
        assert_eq!(parse_method("plurality").unwrap(), TabulationMethod::Plurality);
        assert!(parse_method("irv").is_err());
    }

    #[test]
    fn flags_override_rules() {
        let config_rules = ElectionRules {
            tabulation_method: "plurality".to_string(),
            number_of_winners: Some(json!(2)),
            random_seed: None,
            shuffle_ballots: Some(true),
            generate_report: None,
        };
        let args = Args {
            method: Some("stv".to_string()),
            no_shuffle: true,
            ..Args::default()
        };
        let r = apply_args(&validate_rules(&config_rules).unwrap(), &args).unwrap();
        assert_eq!(
            r,
            VoteRules {
                method: TabulationMethod::SingleTransferableVote,
                number_of_winners: 2,
                report_enabled: false,
                shuffle_ballots: false,
            }
        );
    }
}
