use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("invalid configuration") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Inspect the resolved configuration with:");
        eprintln!("  {} genix config", "$".dimmed());
    }

    if msg.contains("connection refused") || msg.contains("connection error") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check that the backend is running and the websocket URLs are correct.");
    }

    std::process::exit(1);
}
