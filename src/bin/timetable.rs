//! Timetable Tool - Generate per-person schedules from master camp timetables
//!
//! Reads master workbooks (one sheet per day, one column per teacher) plus
//! the per-camp mapping CSVs from an input directory and writes one xlsx
//! schedule per student, teacher, or pianist.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use timetable_toolkit::pipeline::{
    generate_all, generate_pianist_timetables, generate_student_timetables,
    generate_teacher_timetables, package_outputs, GenerateConfig, PackageConfig,
};

#[derive(Parser)]
#[command(name = "timetable")]
#[command(about = "Generate per-person schedules from master camp timetables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one workbook per student
    Students {
        /// Directory with master workbooks and mapping CSVs
        #[arg(short, long, env = "TIMETABLE_INPUT_DIR", default_value = "input")]
        input: PathBuf,

        /// Directory to write generated workbooks into
        #[arg(short, long, env = "TIMETABLE_OUTPUT_DIR", default_value = "output")]
        output: PathBuf,
    },

    /// Generate one workbook per teacher
    Teachers {
        /// Directory with master workbooks and mapping CSVs
        #[arg(short, long, env = "TIMETABLE_INPUT_DIR", default_value = "input")]
        input: PathBuf,

        /// Directory to write generated workbooks into
        #[arg(short, long, env = "TIMETABLE_OUTPUT_DIR", default_value = "output")]
        output: PathBuf,
    },

    /// Generate one workbook per accompanying pianist
    Pianists {
        /// Directory with the pianist master workbook and mapping CSVs
        #[arg(short, long, env = "TIMETABLE_INPUT_DIR", default_value = "input")]
        input: PathBuf,

        /// Directory to write generated workbooks into
        #[arg(short, long, env = "TIMETABLE_OUTPUT_DIR", default_value = "output")]
        output: PathBuf,
    },

    /// Run all three generation passes
    All {
        /// Directory with master workbooks and mapping CSVs
        #[arg(short, long, env = "TIMETABLE_INPUT_DIR", default_value = "input")]
        input: PathBuf,

        /// Directory to write generated workbooks into
        #[arg(short, long, env = "TIMETABLE_OUTPUT_DIR", default_value = "output")]
        output: PathBuf,
    },

    /// Bundle generated workbooks into a zip archive
    Package {
        /// Directory holding the generated workbooks
        #[arg(short, long, env = "TIMETABLE_OUTPUT_DIR", default_value = "output")]
        output: PathBuf,

        /// Archive path (default: timestamped name inside the output dir)
        #[arg(short, long)]
        archive: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let summary = match cli.command {
        Commands::Students { input, output } => generate_student_timetables(&GenerateConfig {
            input_dir: input,
            output_dir: output,
        })?,
        Commands::Teachers { input, output } => generate_teacher_timetables(&GenerateConfig {
            input_dir: input,
            output_dir: output,
        })?,
        Commands::Pianists { input, output } => generate_pianist_timetables(&GenerateConfig {
            input_dir: input,
            output_dir: output,
        })?,
        Commands::All { input, output } => generate_all(&GenerateConfig {
            input_dir: input,
            output_dir: output,
        })?,
        Commands::Package { output, archive } => package_outputs(&PackageConfig {
            output_dir: output,
            archive,
        })?,
    };

    println!("{}", summary);
    Ok(())
}
