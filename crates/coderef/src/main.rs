//
// main.rs
//
// Command-line entry point for coderef
//

use std::env;

use coderef::cli;

fn print_usage() {
    println!(
        "coderef {}, a cross-reference index for code pointers.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: coderef <COMMAND> [ARGS]

Commands:

scan <root> [--json] [--sequential]    Index a workspace and list every referenced range
refs <root> <file> <line> [--json]     List pointers whose range covers <file>:<line>
watch <root>                           Index a workspace and follow filesystem changes
format <module> <path> <start> [end]   Print the canonical pointer text

Options:

--version                    Print the version
--help                       Print this help message

Logging is controlled by RUST_LOG (e.g. RUST_LOG=coderef=debug).

"#
    );
}

fn usage_error(command: &str, message: String) -> anyhow::Error {
    anyhow::anyhow!("{command}: {message}")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let Some(command) = argv.next() else {
        print_usage();
        return Ok(());
    };

    env_logger::init();

    match command.as_str() {
        "--version" => {
            println!("coderef {}", env!("CARGO_PKG_VERSION"));
        }
        "--help" | "help" => print_usage(),
        "scan" => {
            let args = cli::scan::parse_args(&mut argv).map_err(|e| usage_error("scan", e))?;
            let json = args.json;
            let report = tokio::task::spawn_blocking(move || cli::scan::run_scan(&args)).await?;
            if json {
                cli::scan::print_report_json(&report)?;
            } else {
                cli::scan::print_report(&report);
            }
        }
        "refs" => {
            let args = cli::refs::parse_args(&mut argv).map_err(|e| usage_error("refs", e))?;
            let json = args.json;
            let report = tokio::task::spawn_blocking(move || cli::refs::run_refs(&args)).await??;
            if json {
                cli::refs::print_report_json(&report)?;
            } else {
                cli::refs::print_report(&report);
            }
        }
        "watch" => {
            let args = cli::watch::parse_args(&mut argv).map_err(|e| usage_error("watch", e))?;
            cli::watch::run_watch(&args).await?;
        }
        "format" => {
            let args =
                cli::parse_format_args(&mut argv).map_err(|e| usage_error("format", e))?;
            println!("{}", cli::run_format(&args));
        }
        other => {
            return Err(anyhow::anyhow!("Unknown command: '{other}'"));
        }
    }

    Ok(())
}
