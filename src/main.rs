mod config;
mod cooldown;
mod debounce;
mod error;
mod extract;
mod format;
mod history;
mod openrouter;
mod request;
mod visualization;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::cooldown::CooldownGate;
use crate::debounce::Debouncer;
use crate::error::TapeError;
use crate::history::{ChatEntry, HistoryStore, SimulationEntry};
use crate::openrouter::OpenRouterClient;
use crate::request::{RequestIntent, RequestKind, SimulationForm};

const HELP: &str = "\
Commands:
  simulate plant=<name> temp=<min-max> humidity=<n%> [variety= soil= sun= water= place= stage= city= country= notes=]
  diagnose <image-path> [plant] [symptoms...]
  varieties <plant>
  weather <city> <country>
  chat <message>
  history
  help
  quit";

struct App {
    client: Arc<OpenRouterClient>,
    gate: CooldownGate,
    store: HistoryStore,
    variety_debouncer: Debouncer,
    weather_debouncer: Debouncer,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();
    let api_key = Config::api_key()
        .context("OPENROUTER_API_KEY is not set; refusing to start without a credential")?;

    let debounce = Duration::from_millis(config.debounce_ms);
    let mut app = App {
        client: Arc::new(OpenRouterClient::new(&config, api_key)),
        gate: CooldownGate::new(),
        store: HistoryStore::open_default(),
        variety_debouncer: Debouncer::new(debounce),
        weather_debouncer: Debouncer::new(debounce),
    };

    println!("TAPE - Technology Assisted Plant Emulator");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line.as_str(), ""),
        };
        match command {
            "simulate" => app.simulate(rest).await,
            "diagnose" => app.diagnose(rest).await,
            "varieties" => app.varieties(rest),
            "weather" => app.weather(rest),
            "chat" => app.chat(rest).await,
            "history" => app.show_history(),
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            other => println!("Unknown command '{other}'. Type 'help' for commands."),
        }
    }
    Ok(())
}

impl App {
    async fn simulate(&mut self, args: &str) {
        if let Err(remaining) = self.gate.try_acquire(RequestKind::Simulation, Instant::now()) {
            render_error(&TapeError::CooldownActive {
                kind: RequestKind::Simulation,
                remaining,
            });
            return;
        }

        let form = parse_simulation_form(args);
        if let Err(e) = form.validate() {
            render_error(&e);
            return;
        }

        println!("Simulating {}'s growth patterns...", form.plant_type);
        let intent = RequestIntent::Simulation(form.clone());
        match self.client.chat(&intent).await {
            Ok(text) => {
                let viz = visualization::growth_visualization(&text);
                println!("{}", format::format_simulation_result(&text, &viz));

                let entry = SimulationEntry {
                    timestamp: history::now_timestamp(),
                    kind: "simulation".to_string(),
                    plant: format!("{} {}", form.plant_type, variety_label(&form)),
                    conditions: format!(
                        "{}\u{b0}C, {}% humidity",
                        form.temperature,
                        form.humidity.trim_end_matches('%')
                    ),
                    summary: summary_of(&text),
                };
                if let Err(e) = self.store.append_simulation(entry) {
                    eprintln!("Warning: could not save simulation history: {e}");
                }
            }
            Err(e) => render_error(&e),
        }
    }

    async fn diagnose(&mut self, args: &str) {
        if let Err(remaining) = self
            .gate
            .try_acquire(RequestKind::DiseaseAnalysis, Instant::now())
        {
            render_error(&TapeError::CooldownActive {
                kind: RequestKind::DiseaseAnalysis,
                remaining,
            });
            return;
        }

        let mut parts = args.splitn(3, ' ');
        let Some(image_path) = parts.next().filter(|p| !p.is_empty()) else {
            render_error(&TapeError::Validation {
                field: "image",
                reason: "select an image to analyze".to_string(),
            });
            return;
        };
        let plant_type = parts.next().unwrap_or("").to_string();
        let symptoms = parts.next().unwrap_or("").to_string();

        let image_data_url = match encode_image(Path::new(image_path)) {
            Ok(url) => url,
            Err(e) => {
                render_error(&TapeError::Validation {
                    field: "image",
                    reason: e.to_string(),
                });
                return;
            }
        };

        println!("Analyzing plant health...");
        let intent = RequestIntent::DiseaseAnalysis {
            image_data_url,
            plant_type: plant_type.clone(),
            symptoms,
        };
        match self.client.chat(&intent).await {
            Ok(text) => {
                println!("{}", format::format_disease_result(&text));
                let entry = SimulationEntry {
                    timestamp: history::now_timestamp(),
                    kind: "disease_analysis".to_string(),
                    plant: if plant_type.is_empty() {
                        "Unknown".to_string()
                    } else {
                        plant_type
                    },
                    conditions: String::new(),
                    summary: summary_of(&text),
                };
                if let Err(e) = self.store.append_simulation(entry) {
                    eprintln!("Warning: could not save analysis history: {e}");
                }
            }
            Err(e) => render_error(&e),
        }
    }

    /// Variety lookups are debounced instead of gated, so rapid
    /// repeats coalesce into one request for the final spelling.
    fn varieties(&mut self, args: &str) {
        let plant = args.trim().to_string();
        if plant.len() < 3 {
            println!("Varieties: [\"Standard\"]");
            return;
        }
        let client = self.client.clone();
        self.variety_debouncer.call(async move {
            let intent = RequestIntent::VarietyLookup {
                plant: plant.clone(),
            };
            let varieties = match client.chat(&intent).await {
                Ok(text) => extract::parse_varieties(&text),
                Err(_) => vec!["Standard".to_string()],
            };
            println!("Varieties for {plant}: {varieties:?}");
        });
    }

    fn weather(&mut self, args: &str) {
        let mut parts = args.splitn(2, ' ');
        let city = parts.next().unwrap_or("").trim().to_string();
        let country = parts.next().unwrap_or("").trim().to_string();
        if city.is_empty() {
            render_error(&TapeError::Validation {
                field: "city",
                reason: "usage: weather <city> <country>".to_string(),
            });
            return;
        }

        if let Err(remaining) = self
            .gate
            .try_acquire(RequestKind::WeatherLookup, Instant::now())
        {
            render_error(&TapeError::CooldownActive {
                kind: RequestKind::WeatherLookup,
                remaining,
            });
            return;
        }

        let client = self.client.clone();
        self.weather_debouncer.call(async move {
            let intent = RequestIntent::WeatherLookup {
                city: city.clone(),
                country: country.clone(),
            };
            // Lookup failures always fall back to the canned reading.
            let reading = match client.chat(&intent).await {
                Ok(text) => extract::parse_weather(&text),
                Err(_) => extract::WeatherReading::default(),
            };
            println!(
                "Weather for {city}, {country}: {}\u{b0}C, {} humidity",
                reading.temperature, reading.humidity
            );
        });
    }

    async fn chat(&mut self, message: &str) {
        if message.is_empty() {
            return;
        }
        if let Err(remaining) = self.gate.try_acquire(RequestKind::Chat, Instant::now()) {
            render_error(&TapeError::CooldownActive {
                kind: RequestKind::Chat,
                remaining,
            });
            return;
        }

        let intent = RequestIntent::Chat {
            message: message.to_string(),
        };
        match self.client.chat(&intent).await {
            Ok(text) => {
                println!("{}", format::format_chat_message(&text));
                let entry = ChatEntry {
                    timestamp: history::now_timestamp(),
                    user: message.to_string(),
                    bot: text,
                };
                if let Err(e) = self.store.append_chat(entry) {
                    eprintln!("Warning: could not save chat history: {e}");
                }
            }
            Err(e) => render_error(&e),
        }
    }

    fn show_history(&self) {
        let simulations = self.store.load_simulations();
        if simulations.is_empty() {
            println!("No simulations yet.");
        }
        for entry in &simulations {
            println!(
                "[{}] {} - {} ({})",
                entry.timestamp, entry.kind, entry.plant, entry.conditions
            );
        }
        for entry in self.store.load_chats() {
            println!("[{}] you: {}", entry.timestamp, entry.user);
        }
    }
}

fn parse_simulation_form(args: &str) -> SimulationForm {
    let mut form = SimulationForm::default();
    for pair in args.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.to_string();
        match key {
            "plant" => form.plant_type = value,
            "variety" => form.plant_variety = value,
            "place" => form.placement = value,
            "soil" => form.soil_type = value,
            "water" => form.watering = value,
            "sun" => form.sunlight = value,
            "temp" => form.temperature = value,
            "humidity" => form.humidity = value,
            "stage" => form.growth_stage = value,
            "notes" => form.notes = value,
            "city" => form.city = value,
            "country" => form.country = value,
            _ => {}
        }
    }
    form
}

fn variety_label(form: &SimulationForm) -> &str {
    if form.plant_variety.trim().is_empty() {
        "Standard"
    } else {
        form.plant_variety.trim()
    }
}

fn summary_of(text: &str) -> String {
    let mut summary: String = text.chars().take(150).collect();
    summary.push_str("...");
    summary
}

fn encode_image(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file {}", path.display()))?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn render_error(error: &TapeError) {
    println!("[!] {error}");
    match error {
        TapeError::CooldownActive { .. } => {}
        _ => println!("    You can retry the action once the issue is resolved."),
    }
}
