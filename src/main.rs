mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<ExitCode> {
    // 初始化日志系统
    curlcheck::logger::init_logger();

    let cli = Cli::parse();
    let passed = cli::run(cli)?;
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
