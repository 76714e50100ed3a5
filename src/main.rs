use crate::config::{Config, app_name, version};
use crate::ffmpeg::VersionInfo;
use crate::player::Player;
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::path::PathBuf;
use std::{panic, process};

pub mod assets;
pub mod audio;
pub mod config;
pub mod decoder;
pub mod ffmpeg;
pub mod playback;
pub mod player;
pub mod utils;
pub mod window;

#[cfg(test)]
mod test_media;

fn cli() -> Command {
    let file = Arg::new("file")
        .value_name("FILE")
        .help("Media file to open.")
        .required(true)
        .value_parser(value_parser!(PathBuf));

    Command::new(app_name())
        .version(version())
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand(
            Command::new("info")
                .about("Print the streams of a media file.")
                .arg(file.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the stream info as JSON.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("dump")
                .about("Copy the video and audio packets of a media file into separate files.")
                .arg(file.clone())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Directory for the dumped streams.")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("play")
                .about("Play a media file in a window.")
                .arg(file)
                .arg(
                    Arg::new("width")
                        .long("width")
                        .value_name("PIXELS")
                        .help("Initial window width.")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .value_name("PIXELS")
                        .help("Initial window height.")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("no-audio")
                        .long("no-audio")
                        .help("Do not open the audio device.")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn file_arg(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("file")
        .cloned()
        .unwrap_or_default()
}

fn execute(matches: &ArgMatches) -> Result<()> {
    let mut config = Config::new();
    let player = Player::new();

    match matches.subcommand() {
        Some(("info", sub)) => {
            let info = player.stream_info(&file_arg(sub))?;
            if sub.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", info);
            }
        }
        Some(("dump", sub)) => {
            if let Some(dir) = sub.get_one::<PathBuf>("output") {
                config.dump_dir = dir.clone();
            }
            let report = player.dump_streams(&file_arg(sub), &config.dump_dir)?;
            println!("{}", report);
        }
        Some(("play", sub)) => {
            config = config.with_window_size(
                sub.get_one::<u32>("width").copied(),
                sub.get_one::<u32>("height").copied(),
            );
            config.audio_enabled = !sub.get_flag("no-audio");
            playback::play(&config, &file_arg(sub))?;
        }
        _ => println!("{}", VersionInfo::query()),
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    let matches = cli().get_matches();

    // kill the main thread as soon as a secondary thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(105);
    }));

    ctrlc::set_handler(move || {
        process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    if let Err(e) = execute(&matches) {
        log::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_play_arguments() {
        let matches = cli()
            .try_get_matches_from(["fpd", "play", "clip.mp4", "--width", "640", "--no-audio"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "play");
        assert_eq!(file_arg(sub), PathBuf::from("clip.mp4"));
        assert_eq!(sub.get_one::<u32>("width"), Some(&640));
        assert_eq!(sub.get_one::<u32>("height"), None);
        assert!(sub.get_flag("no-audio"));
    }

    #[test]
    fn test_file_is_required() {
        assert!(cli().try_get_matches_from(["fpd", "info"]).is_err());
    }

    #[test]
    fn test_no_subcommand_is_accepted() {
        let matches = cli().try_get_matches_from(["fpd"]).unwrap();
        assert!(matches.subcommand().is_none());
    }
}
