//! CLI argument parsing tests for piobrew

use clap::Parser;
use piobrew::cli::args::{Cli, Commands};
use std::ffi::OsString;
use std::path::PathBuf;

mod test_fixtures;
use test_fixtures::TestEnvironment;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    let mut full_args = vec!["piobrew"];
    full_args.extend(args);
    Cli::try_parse_from(full_args.iter().map(|s| OsString::from(*s)))
}

#[test]
fn test_action_commands_take_a_file() {
    let cli = parse(&["build", "blink/blink.ino"]).unwrap();
    match cli.command {
        Commands::Build(target) => {
            assert_eq!(target.file, Some(PathBuf::from("blink/blink.ino")))
        }
        other => panic!("Expected Build command, got {:?}", other),
    }

    let cli = parse(&["upload"]).unwrap();
    assert!(matches!(cli.command, Commands::Upload(ref t) if t.file.is_none()));

    assert!(matches!(parse(&["init", "a.ino"]).unwrap().command, Commands::Init(_)));
    assert!(matches!(parse(&["clean", "a.ino"]).unwrap().command, Commands::Clean(_)));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["upload", "blink.ino", "--yes", "--feedback", "--pio", "/opt/pio"]).unwrap();
    assert!(cli.yes);
    assert!(cli.feedback);
    assert_eq!(cli.pio, Some(PathBuf::from("/opt/pio")));

    let config = cli.app_config();
    assert!(config.feedback);
    assert_eq!(config.pio_executable, PathBuf::from("/opt/pio"));
}

#[test]
fn test_board_and_port_commands() {
    assert!(matches!(parse(&["select-port"]).unwrap().command, Commands::SelectPort));
    assert!(matches!(
        parse(&["refresh-boards"]).unwrap().command,
        Commands::RefreshBoards
    ));

    let cli = parse(&["list-boards", "--filter", "esp32"]).unwrap();
    match cli.command {
        Commands::ListBoards { filter } => assert_eq!(filter.as_deref(), Some("esp32")),
        other => panic!("Expected ListBoards command, got {:?}", other),
    }
}

#[test]
fn test_programmer_command_arguments() {
    let cli = parse(&["programmer"]).unwrap();
    assert!(matches!(cli.command, Commands::Programmer { id: None, .. }));

    let cli = parse(&["programmer", "usbasp", "blink.ino"]).unwrap();
    match cli.command {
        Commands::Programmer { id, target } => {
            assert_eq!(id.as_deref(), Some("usbasp"));
            assert_eq!(target.file, Some(PathBuf::from("blink.ino")));
        }
        other => panic!("Expected Programmer command, got {:?}", other),
    }
}

#[test]
fn test_invalid_command_parsing() {
    assert!(parse(&["flash"]).is_err());
    assert!(parse(&[]).is_err());
    assert!(parse(&["build", "a.ino", "b.ino"]).is_err());
}

#[test]
fn test_app_config_paths_follow_cache_dir() {
    let env = TestEnvironment::new();
    assert!(env.config.board_cache_path().starts_with(&env.config.cache_dir));
    assert!(env.config.port_cache_path().ends_with("serial.json"));
    assert!(env.config.preferences_path().starts_with(env.root()));
}
