use clap::Parser;

/// This is a survey preparation program: it cleans a survey export, draws a raffle winner among
/// the respondents who answered enough questions and recodes the answers into numbers.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, default survey-config.json) The JSON file describing the export, the raffle rules and the
    /// recodings. Relative paths in this file are relative to its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the expected formatted data. If provided, surveyprep will
    /// check that the formatted output matches the reference and fail otherwise.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (directory) If specified, the output files are written to this directory. Setting this option
    /// overrides the outputDirectory of the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) If specified, the survey export to read. Setting this option overrides the filePath of
    /// the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
