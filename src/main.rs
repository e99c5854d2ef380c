use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use onit::history::ChatRole;
use onit::voice::{
    AudioCapture, AudioPlayback, DEFAULT_OPENAI_VOICE, DesktopRecognizer, DesktopSynthesizer,
    SpeechClient, Transcriber, calculate_energy, decode_mp3,
};
use onit::{
    Assistant, CameraManager, CommandDispatcher, CommandRegistry, Config, Recognizer,
    RecognitionConfig, SpeechInput, SpeechOutput, Synthesizer, SystemNavigator,
};

/// OnIt - voice and text command assistant
#[derive(Parser)]
#[command(name = "onit", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable microphone and spoken output
    #[arg(long, env = "ONIT_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the commands the assistant understands
    Commands {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List synthesis voices and the one selected by default
    Voices,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,onit=info",
        1 => "info,onit=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_with_options(cli.disable_voice);

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Commands { json } => list_commands(&config, json),
            Command::Voices => list_voices(&config),
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    tracing::info!(
        assistant = %config.assistant_name,
        voice = config.voice.enabled,
        open_links = config.navigation.open_links,
        "starting assistant"
    );

    let speech = Arc::new(
        SpeechOutput::new(build_synthesizer(&config), config.speech.prosody)
            .with_preferred_voice(config.preferences.voice_name().map(str::to_string)),
    );
    let input = SpeechInput::with_retry_delay(
        build_recognizer(&config),
        RecognitionConfig::single_shot(config.speech.language.clone()),
        config.speech.retry_delay,
    );

    let dispatcher = CommandDispatcher::new(
        CommandRegistry::with_builtins(&config.assistant_name),
        Arc::clone(&speech),
        Arc::new(SystemNavigator::detect(config.navigation.open_links)),
        Arc::new(CameraManager::unsupported()),
    );

    let assistant = Assistant::new(&config, dispatcher, Arc::clone(&speech), input);

    let name = config.assistant_name.clone();
    let _echo = speech.on_speak(move |text| println!("{name}: {text}"));

    interactive(&assistant).await?;

    assistant.shutdown();
    Ok(())
}

fn build_synthesizer(config: &Config) -> Option<Arc<dyn Synthesizer>> {
    if !config.voice.enabled {
        return None;
    }
    let key = config.api_keys.openai.as_deref()?;
    let client = SpeechClient::new(key, &config.voice.tts_model)
        .inspect_err(|e| tracing::warn!(error = %e, "speech output disabled"))
        .ok()?;
    DesktopSynthesizer::probe(client).map(|s| Arc::new(s) as Arc<dyn Synthesizer>)
}

fn build_recognizer(config: &Config) -> Option<Arc<dyn Recognizer>> {
    if !config.voice.enabled {
        return None;
    }
    let key = config.api_keys.openai.as_deref()?;
    let transcriber = Transcriber::new(key, &config.voice.stt_model)
        .inspect_err(|e| tracing::warn!(error = %e, "speech input disabled"))
        .ok()?;
    DesktopRecognizer::probe(transcriber).map(|r| Arc::new(r) as Arc<dyn Recognizer>)
}

/// Read typed commands until EOF, `/quit`, or Ctrl-C
async fn interactive(assistant: &Assistant) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type a command, /listen to speak, /history, or /quit.");
    assistant.greet();

    loop {
        prompt()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" | "/exit" => break,
                    "/listen" => {
                        if assistant.input().is_supported() {
                            println!("Listening...");
                        }
                        assistant.listen(tx.clone());
                    }
                    "/history" => print_history(assistant),
                    text => {
                        assistant.handle_text(text);
                    }
                }
            }
            Some(heard) = rx.recv() => {
                if let onit::Heard::Transcript(text) = &heard {
                    println!("\nYou said: {text}");
                }
                assistant.handle_heard(heard);
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

fn print_history(assistant: &Assistant) {
    for entry in assistant.history() {
        let who = match entry.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
        };
        println!("[{}] {who}: {}", entry.at.format("%H:%M:%S"), entry.text);
    }
}

fn list_commands(config: &Config, json: bool) -> anyhow::Result<()> {
    let registry = CommandRegistry::with_builtins(&config.assistant_name);

    if json {
        println!("{}", registry.to_json()?);
        return Ok(());
    }

    for plugin in registry.list() {
        println!("{:<16} {}", plugin.name(), plugin.description());
        println!("{:<16} keywords: {}", "", plugin.keywords().join(", "));
    }
    Ok(())
}

fn list_voices(config: &Config) -> anyhow::Result<()> {
    let speech = SpeechOutput::new(build_synthesizer(config), config.speech.prosody);
    if !speech.is_supported() {
        anyhow::bail!("speech output is unavailable (check OPENAI_API_KEY and audio devices)");
    }

    let catalog = speech.voices();
    let default = catalog.select(config.preferences.voice_name());
    for voice in catalog.voices() {
        let marker = if default.is_some_and(|d| d.name == voice.name) { "*" } else { " " };
        println!("{marker} {:<24} {}", voice.name, voice.lang);
    }
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::open()?;
    capture.start()?;
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    Ok(())
}

async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let key = config
        .api_keys
        .openai
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let client = SpeechClient::new(key, &config.voice.tts_model)?;
    let voice = config
        .preferences
        .voice_name()
        .unwrap_or(DEFAULT_OPENAI_VOICE)
        .to_string();

    println!("Synthesizing speech...");
    let mp3 = client.synthesize(text, &voice, config.speech.prosody).await?;
    println!("Got {} bytes of audio data", mp3.len());

    println!("Playing audio...");
    let volume = config.speech.prosody.volume;
    tokio::task::spawn_blocking(move || -> onit::Result<bool> {
        let audio = decode_mp3(&mp3)?;
        AudioPlayback::open(audio.sample_rate)?.play(
            audio,
            volume,
            &Arc::new(AtomicBool::new(false)),
        )
    })
    .await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}
