use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env, Target};

use UalScope::error_kind;

mod cli;
mod cmd_doctor;
mod cmd_dump;
mod cmd_header;
mod cmd_parse;
mod cmd_tables;
mod util;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — warn.
    // Лог только в stderr: stdout принадлежит выводу отчёта.
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .target(Target::Stderr)
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        eprintln!("{}: {:#}", error_kind(&e), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Parse {
            paths,
            identity,
            json,
            no_verify,
        } => cmd_parse::exec(paths, identity, json, no_verify),

        cli::Cmd::Tables { path, json } => cmd_tables::exec(path, json),

        cli::Cmd::Dump {
            path,
            table,
            limit,
            json,
            no_verify,
        } => cmd_dump::exec(path, table, limit, json, no_verify),

        cli::Cmd::Header { path, json } => cmd_header::exec(path, json),

        cli::Cmd::Doctor { path, json } => cmd_doctor::exec(path, json),
    }
}
