use crate::config::{ConversionConfigFile, ResolvedConfig};
use crate::errors::{AppError, AppResult};
use crate::models::{ConversionSummary, MissingIdPolicy};
use crate::parser::{collect_xmls, write_records, RecordStream};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use tracing::info;

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// Parses command-line arguments and executes the conversion.
///
/// This function handles two subcommands:
/// - `convert`: Direct conversion with flag overrides (cleanup enabled unless `--keep-chunks`)
/// - `toml`: Run using a TOML configuration file (cleanup configurable)
///
/// Both subcommands execute the same workflow:
/// 1. Resolves the input (a single XML feed, or every `.xml` file under a directory)
/// 2. Streams each feed through the flattener into per-batch chunk files
/// 3. Merges the chunk files into one deduplicated Parquet table per feed
/// 4. Deletes the intermediate chunk files if cleanup is enabled
///
/// # Returns
///
/// Returns `Ok(())` if all conversions complete successfully. Returns an error if:
/// - The configuration is invalid
/// - XML parsing fails
/// - File I/O on an intermediate or final Parquet file fails
pub fn cli() -> AppResult<()> {
    let cmd = Command::new("datex-flatten")
        .version(APP_VERSION)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("convert")
                .about("Flatten an XML feed (or a directory of feeds) into Parquet")
                .after_help("Uses batch_size=10000, chunk files in the working directory by default.\nExample:\n  datex-flatten convert wegwerkzaamheden.xml -o wegwerkzaamheden.parquet")
                .arg(
                    Arg::new("input")
                        .help("XML feed file, or a directory of XML feed files")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output Parquet file (or directory when the input is a directory)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("batch_size")
                        .short('b')
                        .long("batch-size")
                        .alias("bs")
                        .help("Records buffered per intermediate chunk file")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("group_tag")
                        .short('g')
                        .long("group-tag")
                        .help("Tag establishing the identifier context (default: situation)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("record_tag")
                        .short('r')
                        .long("record-tag")
                        .help("Tag whose flattened subtree becomes one row (default: situationRecord)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("missing_id")
                        .short('m')
                        .long("missing-id")
                        .help("Policy for grouping tags without id: 'carry-forward' (cf) or 'skip-group' (sg)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("chunk_dir")
                        .long("chunk-dir")
                        .alias("cd")
                        .help("Directory for intermediate chunk files")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("keep_chunks")
                        .short('k')
                        .long("keep-chunks")
                        .alias("kc")
                        .help("Keep the intermediate chunk files after the merge")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("toml")
                .about("Run using a TOML configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML config file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        );

    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("convert", sub)) => {
            let input = sub.get_one::<PathBuf>("input").expect("input is required");
            let output = sub.get_one::<PathBuf>("output").cloned();

            let mut resolved_config = ResolvedConfig::default();
            if let Some(&batch_size) = sub.get_one::<usize>("batch_size") {
                resolved_config.batch_size = batch_size;
            }
            if let Some(tag) = sub.get_one::<String>("group_tag") {
                resolved_config.group_tag = tag.clone();
            }
            if let Some(tag) = sub.get_one::<String>("record_tag") {
                resolved_config.record_tag = tag.clone();
            }
            if let Some(policy) = sub.get_one::<String>("missing_id") {
                resolved_config.missing_group_id = policy.clone();
            }
            if let Some(dir) = sub.get_one::<PathBuf>("chunk_dir") {
                resolved_config.chunk_dir = dir.clone();
            }
            resolved_config.validate()?;

            let should_cleanup = !sub.get_flag("keep_chunks");
            run_workflow(input, output.as_deref(), should_cleanup, &resolved_config)?;
        }
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .expect("config is required");

            let file_config = ConversionConfigFile::from_toml_file(config_path)?;
            run_workflow(
                &file_config.input,
                file_config.output.as_deref(),
                file_config.cleanup,
                &file_config.resolved,
            )?;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::IoError(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(())
}

fn run_workflow(
    input: &Path,
    output: Option<&Path>,
    should_cleanup: bool,
    config: &ResolvedConfig,
) -> AppResult<()> {
    print_conversion_info(input, config);

    if input.is_dir() {
        let xml_files = collect_xmls(input);
        if xml_files.is_empty() {
            info!(input = %input.display(), "No XML files found");
            return Ok(());
        }

        // Directory mode: each feed becomes its own table in the output dir
        let output_dir = match output {
            Some(dir) => dir.to_path_buf(),
            None => input.to_path_buf(),
        };

        let mut converted = 0;
        for xml_path in &xml_files {
            let stem = xml_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let parquet_path = output_dir.join(format!("{stem}.parquet"));
            convert_file(xml_path, &parquet_path, should_cleanup, config)?;
            converted += 1;
        }

        info!(
            feeds = converted,
            "All conversions completed successfully"
        );
    } else {
        let parquet_path = match output {
            Some(path) => path.to_path_buf(),
            None => input.with_extension("parquet"),
        };
        convert_file(input, &parquet_path, should_cleanup, config)?;
    }

    Ok(())
}

fn convert_file(
    xml_path: &Path,
    parquet_path: &Path,
    should_cleanup: bool,
    config: &ResolvedConfig,
) -> AppResult<ConversionSummary> {
    info!(
        input = %xml_path.display(),
        output = %parquet_path.display(),
        "Converting feed"
    );

    let records = RecordStream::from_path(xml_path, config)?;
    write_records(records, parquet_path, config, should_cleanup)
}

fn print_conversion_info(input: &Path, config: &ResolvedConfig) {
    let policy = MissingIdPolicy::from(config.missing_group_id.as_str());
    info!(
        input = %input.display(),
        group_tag = config.group_tag.as_str(),
        record_tag = config.record_tag.as_str(),
        batch_size = config.batch_size,
        missing_id = policy.display_name(),
        "Starting conversion"
    );
}
