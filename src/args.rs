use clap::Parser;

/// This is an election tabulation program for plurality and single transferable vote (STV) elections.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the election: the ballot files, the rules and
    /// the output settings. See the documentation of the `manual` module for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, votesys will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The ballot file. Setting this option overrides the ballot files listed in the --config file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv, or xlsx for .xlsx files) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (plurality or stv, default stv) The tabulation method.
    #[clap(short, long, value_parser)]
    pub method: Option<String>,

    /// (default 1) The number of seats to fill.
    #[clap(short, long, value_parser)]
    pub seats: Option<u32>,

    /// If passed as an argument, the ballots are counted in the order of the input files instead of a random order.
    #[clap(long, takes_value = false)]
    pub no_shuffle: bool,

    /// (integer) Seed for the random shuffling of the ballots and for breaking plurality ties.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// (file path) If specified, the audit report of the tabulation is written to this location.
    #[clap(long, value_parser)]
    pub report: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
