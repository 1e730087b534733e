use std::io::BufRead;

use anyhow::Result;
use crossbeam_channel::{Receiver, select, tick};

use captionview::playback::headless::HeadlessFactory;
use captionview::{CaptionSession, SessionView, Settings};

const HELP: &str = "\
commands:
  url <url>               load a video (empty clears it)
  caption <secs> <text>   add a caption at a timestamp
  play | pause | toggle   transport
  volume <0.0-1.0>        set volume
  seek <secs>             jump to a position
  state                   print the current session view
  help                    this text
  quit                    exit";

enum Command {
    Url(String),
    Caption { time: String, text: String },
    Play,
    Pause,
    Toggle,
    Volume(String),
    Seek(String),
    State,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let cmd = match word {
        "url" => Command::Url(rest.to_string()),
        "caption" => {
            let (time, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            Command::Caption {
                time: time.to_string(),
                text: text.trim().to_string(),
            }
        }
        "play" => Command::Play,
        "pause" => Command::Pause,
        "toggle" => Command::Toggle,
        "volume" => Command::Volume(rest.to_string()),
        "seek" => Command::Seek(rest.to_string()),
        "state" => Command::State,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// Forward stdin lines to the main loop. The channel closes on EOF.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::bounded(16);
    std::thread::Builder::new()
        .name("captionview-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn print_view(view: &SessionView) {
    println!(
        "url={:?} backend={} playing={} volume={:.2} time={:.2}s",
        view.url,
        view.backend.map_or("none", |k| k.display_name()),
        view.is_playing,
        view.volume,
        view.current_time,
    );
    if let Some(caption) = &view.caption {
        println!("  caption: {caption}");
    }
    if let Some(error) = &view.error {
        println!("  error: {error}");
    }
}

/// Returns false when the console should exit.
fn run_command(session: &mut CaptionSession, cmd: Command) -> bool {
    match cmd {
        Command::Url(url) => {
            if let Err(e) = session.set_video_url(&url) {
                println!("error: {e}");
            }
        }
        Command::Caption { time, text } => match session.add_caption(&text, &time) {
            Ok(true) => println!("caption added ({} total)", session.captions().len()),
            Ok(false) => {}
            Err(e) => println!("error: {e}"),
        },
        Command::Play => session.play(),
        Command::Pause => session.pause(),
        Command::Toggle => session.toggle_play_pause(),
        Command::Volume(raw) => match raw.parse::<f32>() {
            Ok(v) => session.set_volume(v),
            Err(_) => println!("volume expects a number between 0 and 1"),
        },
        Command::Seek(raw) => match raw.parse::<f64>() {
            Ok(secs) => session.seek(secs),
            Err(_) => println!("seek expects seconds"),
        },
        Command::State => print_view(&session.view()),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();

    // --init-config: write the default settings file and exit
    if args.iter().any(|a| a == "--init-config") {
        let path = Settings::default().save()?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let initial_url = args
        .iter()
        .position(|a| a == "--url")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let settings = Settings::load();
    let factory = HeadlessFactory::new(settings.file_tick()).with_ffprobe(settings.ffprobe());
    let mut session = CaptionSession::from_settings(Box::new(factory), &settings);

    if let Some(url) = initial_url {
        if let Err(e) = session.set_video_url(&url) {
            println!("error: {e}");
        }
    }

    let input = spawn_stdin_reader()?;
    let frames = tick(settings.render_interval());
    let mut shown_caption: Option<String> = None;
    let mut shown_error: Option<String> = None;

    println!("{HELP}");
    loop {
        let keep_going = select! {
            recv(input) -> line => match line {
                Ok(line) => match parse_command(&line) {
                    Some(cmd) => run_command(&mut session, cmd),
                    None => {
                        if !line.trim().is_empty() {
                            println!("unknown command, try 'help'");
                        }
                        true
                    }
                },
                Err(_) => false,
            },
            recv(frames) -> _ => true,
        };
        if !keep_going {
            break;
        }

        session.update();

        let caption = session.overlay_text().map(str::to_string);
        if caption != shown_caption {
            match &caption {
                Some(text) => println!("[{:.2}s] {text}", session.state().current_time),
                None => println!("[{:.2}s] -", session.state().current_time),
            }
            shown_caption = caption;
        }
        let error = session.error_message().map(str::to_string);
        if error != shown_error {
            if let Some(e) = &error {
                println!("error: {e}");
            }
            shown_error = error;
        }
    }

    log::info!("Shutting down");
    Ok(())
}
