//! Application entry point — Visual Storyteller (terminal front-end).
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime.
//! 4. Build the narrator and apply the configured voice and rate.
//! 5. Build the story provider from config.
//! 6. Spawn the playback orchestrator.
//! 7. Spawn the renderer that prints line changes.
//! 8. Read transport commands from stdin until `q` or EOF.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use visual_storyteller::{
    config::{AppConfig, ImageMode},
    narration::{Narrator, SpeechNarrator, TimedBackend},
    player::{new_shared_playback, PlaybackOrchestrator, PlaybackSnapshot, PlayerHandle},
    provider::{GeminiProvider, StoryProvider},
    sound::{LogSounds, SoundEffects},
    story::{StoryStore, StoryStudio},
};

const HELP: &str = "commands: g = new story, p = pause, r = resume, s = stop, \
                    save, load, v = voices, voice <id>, preview <id>, rate <x>, q = quit";

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Poll the read model and print whenever the visible line or phase changes.
async fn render(player: PlayerHandle) {
    let mut last: Option<PlaybackSnapshot> = None;
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    loop {
        ticker.tick().await;
        let snap = player.snapshot();

        let changed = match &last {
            None => true,
            Some(prev) => {
                prev.is_playing != snap.is_playing
                    || prev.is_paused != snap.is_paused
                    || prev.is_visible != snap.is_visible
                    || prev.current_index != snap.current_index
                    || prev.current_image != snap.current_image
            }
        };
        if changed {
            print_snapshot(&snap);
        }
        last = Some(snap);
    }
}

fn print_snapshot(snap: &PlaybackSnapshot) {
    if !snap.is_playing {
        println!("[idle] {} line(s) loaded", snap.total_lines);
        return;
    }
    if snap.is_paused {
        println!("[paused at {}/{}]", snap.current_index + 1, snap.total_lines);
        return;
    }
    if snap.is_visible {
        println!(
            "[{}/{} · {:.1}s] {}",
            snap.current_index + 1,
            snap.total_lines,
            snap.current_duration_ms as f64 / 1000.0,
            snap.current_line_text
        );
        match (&snap.current_image, snap.image_pending) {
            (Some(image), _) => println!("    image: {image}"),
            (None, true) => println!("    image: painting…"),
            (None, false) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Generate,
    Pause,
    Resume,
    Stop,
    Save,
    Load,
    Voices,
    Voice(String),
    Preview(String),
    Rate(f32),
    Quit,
}

/// Parse a trimmed input line.  `None` for anything unrecognised.
fn parse_command(input: &str) -> Option<Command> {
    let command = match input {
        "g" => Command::Generate,
        "p" => Command::Pause,
        "r" => Command::Resume,
        "s" => Command::Stop,
        "save" => Command::Save,
        "load" => Command::Load,
        "v" => Command::Voices,
        "q" => Command::Quit,
        other => {
            let (name, arg) = other.split_once(' ')?;
            let arg = arg.trim();
            match name {
                "voice" if !arg.is_empty() => Command::Voice(arg.to_string()),
                "preview" if !arg.is_empty() => Command::Preview(arg.to_string()),
                "rate" => Command::Rate(arg.parse().ok().filter(|r: &f32| r.is_finite())?),
                _ => return None,
            }
        }
    };
    Some(command)
}

/// Narration settings only change between stories.  Returns `false` (and
/// tells the user) while a story is playing or paused.
fn settings_unlocked(player: &PlayerHandle, what: &str) -> bool {
    if player.snapshot().is_playing {
        println!("stop playback before {what}");
        return false;
    }
    true
}

/// Apply a new narration rate unless a story is playing.
fn change_rate(player: &PlayerHandle, narrator: &dyn Narrator, rate: f32) -> bool {
    if !settings_unlocked(player, "changing the rate") {
        return false;
    }
    narrator.set_rate(rate);
    log::info!("Narration rate set to {:.1}", narrator.rate());
    true
}

async fn run_commands(
    mut studio: StoryStudio,
    player: PlayerHandle,
    narrator: Arc<dyn Narrator>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    while let Some(input) = lines.next_line().await? {
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let Some(command) = parse_command(input) else {
            println!("{HELP}");
            continue;
        };

        match command {
            Command::Generate => {
                println!("writing a story…");
                if let Err(e) = studio.generate().await {
                    println!("{e}");
                }
            }
            Command::Pause => player.pause().await,
            Command::Resume => player.resume().await,
            Command::Stop => player.stop().await,
            Command::Save => {
                if studio.save() {
                    println!("story saved");
                } else {
                    println!("nothing saved");
                }
            }
            Command::Load => match studio.load_saved().await {
                Some(count) => println!("loaded {count} line(s)"),
                None => println!("no saved story"),
            },
            Command::Voices => {
                let selected = narrator.selected_voice().map(|v| v.id);
                for voice in narrator.voices().await {
                    let mark = if Some(&voice.id) == selected.as_ref() { "*" } else { " " };
                    println!("{mark} {} ({}, {})", voice.id, voice.name, voice.lang);
                }
            }
            Command::Voice(id) => {
                if settings_unlocked(&player, "changing the voice") {
                    narrator.set_voice(&id).await;
                }
            }
            Command::Preview(id) => {
                if settings_unlocked(&player, "previewing a voice") {
                    narrator
                        .speak_preview("Once upon a time, in a land far away.", &id)
                        .await;
                }
            }
            Command::Rate(rate) => {
                change_rate(&player, narrator.as_ref(), rate);
            }
            Command::Quit => break,
        }
    }

    player.stop().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Visual Storyteller starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(async move {
        // 4. Narrator
        let narrator: Arc<dyn Narrator> = Arc::new(SpeechNarrator::with_pitch(
            TimedBackend::new(),
            config.narration.pitch,
        ));
        narrator.set_rate(config.narration.rate);
        let voices = narrator.voices().await;
        log::debug!("{} narration voice(s) installed", voices.len());
        if let Some(voice) = &config.narration.voice {
            narrator.set_voice(voice).await;
        }
        match narrator.selected_voice() {
            Some(voice) => log::info!("Narration voice: {} ({})", voice.name, voice.lang),
            None => log::warn!("No narration voice available"),
        }

        // 5. Story provider
        let provider: Arc<dyn StoryProvider> =
            Arc::new(GeminiProvider::from_config(&config.provider));
        let sounds: Arc<dyn SoundEffects> = Arc::new(LogSounds);

        // 6. Playback orchestrator
        let mut orchestrator = PlaybackOrchestrator::new(
            new_shared_playback(),
            Arc::clone(&narrator),
            Arc::clone(&sounds),
        )
        .with_fade_out(config.playback.fade_out());
        if config.playback.image_mode == ImageMode::PerLine {
            orchestrator = orchestrator.with_image_provider(Arc::clone(&provider));
        }
        let player = orchestrator.spawn();

        let studio = StoryStudio::new(
            provider,
            player.clone(),
            StoryStore::open_default(),
            sounds,
        )
        .with_config(&config);
        if studio.has_saved() {
            println!("a saved story is available (type `load`)");
        }

        // 7. Renderer
        let renderer = tokio::spawn(render(player.clone()));

        // 8. Commands
        let result = run_commands(studio, player, narrator).await;
        renderer.abort();
        result
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use visual_storyteller::story::Line;

    fn player_over(narrator: Arc<dyn Narrator>) -> PlayerHandle {
        PlaybackOrchestrator::new(new_shared_playback(), narrator, Arc::new(LogSounds)).spawn()
    }

    #[test]
    fn parses_transport_and_story_commands() {
        assert_eq!(parse_command("g"), Some(Command::Generate));
        assert_eq!(parse_command("p"), Some(Command::Pause));
        assert_eq!(parse_command("load"), Some(Command::Load));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("dance"), None);
    }

    #[test]
    fn parses_voice_and_rate_arguments() {
        assert_eq!(
            parse_command("voice timed-en"),
            Some(Command::Voice("timed-en".into()))
        );
        assert_eq!(parse_command("preview  de "), Some(Command::Preview("de".into())));
        assert_eq!(parse_command("rate 1.5"), Some(Command::Rate(1.5)));
        assert_eq!(parse_command("rate fast"), None);
        assert_eq!(parse_command("rate NaN"), None);
        assert_eq!(parse_command("voice "), None);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_changes_only_between_stories() {
        let narrator: Arc<dyn Narrator> = Arc::new(SpeechNarrator::new(TimedBackend::new()));
        let player = player_over(Arc::clone(&narrator));

        assert!(change_rate(&player, narrator.as_ref(), 1.5));
        assert!((narrator.rate() - 1.5).abs() < f32::EPSILON);

        player.start(vec![Line::new("The owl blinked.")]).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!change_rate(&player, narrator.as_ref(), 3.0));
        assert!((narrator.rate() - 1.5).abs() < f32::EPSILON);

        player.stop().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(change_rate(&player, narrator.as_ref(), 30.0));
        assert!((narrator.rate() - 10.0).abs() < f32::EPSILON);
    }
}
