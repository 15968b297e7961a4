use crate::election::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
    #[serde(rename = "reportFile")]
    pub report_file: Option<String>,
}

impl OutputSettings {
    /// Where the report and the summary go, relative to the configuration file.
    pub fn output_dir(&self, root_path: &Path) -> Option<PathBuf> {
        self.output_directory.as_ref().map(|d| root_path.join(d))
    }
}

/// The `config` section of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    pub method: String,
    pub seats: String,
    pub threshold: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// `csv` or `xlsx`
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionRules {
    /// `plurality` or `stv`
    #[serde(rename = "tabulationMethod")]
    pub tabulation_method: String,
    #[serde(rename = "numberOfWinners")]
    pub number_of_winners: Option<JSValue>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "shuffleBallots")]
    pub shuffle_ballots: Option<bool>,
    #[serde(rename = "generateReport")]
    pub generate_report: Option<bool>,
}

impl ElectionRules {
    /// One seat when not specified.
    pub fn seats(&self) -> VoteSysResult<u32> {
        if self.number_of_winners.is_some() {
            let x = read_js_int(&self.number_of_winners)?;
            u32::try_from(x).ok().context(ParsingJsonNumberSnafu {})
        } else {
            Ok(1)
        }
    }

    pub fn seed(&self) -> VoteSysResult<Option<u64>> {
        match &self.random_seed {
            None => Ok(None),
            Some(s) => match s.trim().parse::<u64>() {
                Ok(x) => Ok(Some(x)),
                Err(_) => whatever!("randomSeed must be a non-negative integer: {:?}", s),
            },
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "cvrFileSources")]
    pub cvr_file_sources: Vec<FileSource>,
    pub rules: ElectionRules,
}

pub fn read_config(path: &str) -> VoteSysResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> VoteSysResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_summary: {:?}", js);
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> VoteSysResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
