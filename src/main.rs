//! bundlekeeper entry point
//!
//! Parses arguments, runs the selected command and renders fatal errors. A
//! fatal error on an unattended host usually means a console window is about
//! to close, so the process waits for Enter before exiting unless
//! `--no-pause` is given.

use anyhow::Result;
use bundlekeeper::cli;
use bundlekeeper::core::user_friendly_error;
use clap::Parser;
use std::io::{BufRead, Write};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let pause = cli.pause_on_error();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            if pause {
                wait_for_enter();
            }
            std::process::exit(1);
        }
    }
}

fn wait_for_enter() {
    eprint!("Press Enter to exit...");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
