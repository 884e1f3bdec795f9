use std::{env, env::VarError};

/// The server takes no arguments. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // FMS_IDENTITY_SECRET is deliberately left off this list
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "FMS_HOST",
        "FMS_PORT",
        "FMS_DATABASE_URL",
        "FMS_IDENTITY_CHECKS",
        "FMS_PREORDER_THRESHOLD",
        "FMS_CONFIRMATION_TIMEOUT_MINUTES",
        "FMS_WALLET_STALENESS_SECS",
        "FMS_SWEEP_INTERVAL_SECS",
        "FMS_REPAIR_INTERVAL_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
