use anyhow::Result;
use benchrank::{Args, helpers::setup_logging, run_analysis};
use clap::Parser;
use uuid::Uuid;

fn main() -> Result<()> {
    let analysis_run_id = Uuid::now_v7();
    let args = Args::parse();
    let mut writer = std::io::stdout();
    setup_logging(&args)?;
    run_analysis(args, analysis_run_id, &mut writer)
}
