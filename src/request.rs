use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ModelsConfig;
use crate::error::{Result, TapeError};

/// One user action, frozen at construction. Everything the upstream
/// client needs (prompts, model, token caps, timeout budget) derives
/// from this.
#[derive(Debug, Clone)]
pub enum RequestIntent {
    Simulation(SimulationForm),
    DiseaseAnalysis {
        /// Data URL (`data:image/...;base64,...`) of the plant photo.
        image_data_url: String,
        plant_type: String,
        symptoms: String,
    },
    VarietyLookup {
        plant: String,
    },
    WeatherLookup {
        city: String,
        country: String,
    },
    Chat {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Simulation,
    DiseaseAnalysis,
    VarietyLookup,
    WeatherLookup,
    Chat,
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Simulation => "simulation",
            RequestKind::DiseaseAnalysis => "disease analysis",
            RequestKind::VarietyLookup => "variety lookup",
            RequestKind::WeatherLookup => "weather lookup",
            RequestKind::Chat => "chat",
        }
    }

    /// Completes "Please wait N seconds before ..." in the cooldown
    /// message.
    pub fn cooldown_label(&self) -> &'static str {
        match self {
            RequestKind::Simulation => "running another simulation",
            RequestKind::DiseaseAnalysis => "analyzing another image",
            RequestKind::VarietyLookup => "searching for varieties again",
            RequestKind::WeatherLookup => "fetching weather again",
            RequestKind::Chat => "sending another message",
        }
    }

    /// Request timeout budget. Lookups are cheap and impatient, the
    /// generation-heavy actions get longer.
    pub fn timeout(&self) -> Duration {
        match self {
            RequestKind::VarietyLookup | RequestKind::WeatherLookup => Duration::from_secs(5),
            _ => Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationForm {
    pub plant_type: String,
    pub plant_variety: String,
    pub placement: String,
    pub soil_type: String,
    pub watering: String,
    pub sunlight: String,
    pub temperature: String,
    pub humidity: String,
    pub growth_stage: String,
    pub notes: String,
    pub city: String,
    pub country: String,
}

static TEMPERATURE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+-\d+$").unwrap());
static HUMIDITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+%?$").unwrap());

impl SimulationForm {
    /// Fails fast before any network call is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.plant_type.trim().is_empty() {
            return Err(TapeError::Validation {
                field: "plant type",
                reason: "plant type is required".to_string(),
            });
        }
        if !TEMPERATURE_RANGE.is_match(self.temperature.trim()) {
            return Err(TapeError::Validation {
                field: "temperature",
                reason: "enter temperature as \"min-max\" (e.g., 18-24)".to_string(),
            });
        }
        let mut parts = self.temperature.trim().split('-');
        let min: i64 = parts.next().unwrap_or("").parse().unwrap_or(0);
        let max: i64 = parts.next().unwrap_or("").parse().unwrap_or(0);
        if min >= max {
            return Err(TapeError::Validation {
                field: "temperature",
                reason: "temperature must be a valid range (e.g., 18-24)".to_string(),
            });
        }
        if !HUMIDITY.is_match(self.humidity.trim()) {
            return Err(TapeError::Validation {
                field: "humidity",
                reason: "enter humidity as a number (e.g., 60 or 60%)".to_string(),
            });
        }
        Ok(())
    }

    fn variety_or_standard(&self) -> &str {
        if self.plant_variety.trim().is_empty() {
            "Standard"
        } else {
            self.plant_variety.trim()
        }
    }
}

/// User message payload: plain text, or text plus an image for the
/// vision models.
pub enum UserContent {
    Text(String),
    Vision { text: String, image_data_url: String },
}

impl RequestIntent {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestIntent::Simulation(_) => RequestKind::Simulation,
            RequestIntent::DiseaseAnalysis { .. } => RequestKind::DiseaseAnalysis,
            RequestIntent::VarietyLookup { .. } => RequestKind::VarietyLookup,
            RequestIntent::WeatherLookup { .. } => RequestKind::WeatherLookup,
            RequestIntent::Chat { .. } => RequestKind::Chat,
        }
    }

    pub fn model<'a>(&self, models: &'a ModelsConfig) -> &'a str {
        match self {
            RequestIntent::Simulation(_) => &models.simulation,
            RequestIntent::DiseaseAnalysis { .. } => &models.vision,
            RequestIntent::VarietyLookup { .. } | RequestIntent::WeatherLookup { .. } => {
                &models.lookup
            }
            RequestIntent::Chat { .. } => &models.chat,
        }
    }

    pub fn temperature(&self) -> Option<f32> {
        match self {
            RequestIntent::Simulation(_) => Some(0.7),
            RequestIntent::DiseaseAnalysis { .. } => None,
            RequestIntent::VarietyLookup { .. } | RequestIntent::WeatherLookup { .. } => Some(0.3),
            RequestIntent::Chat { .. } => Some(0.5),
        }
    }

    pub fn max_tokens(&self) -> Option<u32> {
        match self {
            RequestIntent::Simulation(_) => None,
            RequestIntent::DiseaseAnalysis { .. } => Some(2000),
            RequestIntent::VarietyLookup { .. } | RequestIntent::WeatherLookup { .. } => Some(100),
            RequestIntent::Chat { .. } => Some(300),
        }
    }

    pub fn system_prompt(&self) -> String {
        match self {
            RequestIntent::Simulation(_) => {
                "You are a plant growth simulation AI. Provide detailed, scientifically accurate \
                 predictions formatted with markdown-style headings and lists. Always include \
                 specific numbers and timelines."
                    .to_string()
            }
            RequestIntent::DiseaseAnalysis { .. } => "\
You are a plant pathologist AI. Analyze the provided plant image and:
1. First identify the plant species if not provided
2. Detect any visible diseases or health issues
3. Provide a clear diagnosis with confidence level (High/Medium/Low)
4. List specific symptoms observed in the image
5. Recommend immediate treatment steps
6. Suggest prevention measures
7. Include severity assessment (Mild/Moderate/Severe)

Format your response as follows:
**Plant Identification**: [plant name if not provided]
**Diagnosis**: [disease/issue name] (Confidence: [High/Medium/Low])
**Symptoms**:
- [symptom 1]
- [symptom 2]
**Treatment**:
- [step 1]
- [step 2]
**Prevention**:
- [measure 1]
- [measure 2]
**Severity**: [Mild/Moderate/Severe]
**Additional Notes**: [any important notes]"
                .to_string(),
            RequestIntent::VarietyLookup { .. } => {
                "You are a botanical database API. Return ONLY a JSON array of 3-5 common \
                 varieties for the requested plant. Example: [\"Variety A\", \"Variety B\"]. If \
                 the plant has no common varieties or is unknown, return [\"Standard\"]. Always \
                 return valid JSON."
                    .to_string()
            }
            RequestIntent::WeatherLookup { .. } => {
                "You are a weather data provider for the Technology Assisted Plant Emulator \
                 (TAPE). Provide current temperature range (min-max in \u{b0}C) and humidity (%) \
                 for the specified location. Return JSON in the format: {\"temperature\": \
                 \"min-max\", \"humidity\": \"number%\"}. If data is unavailable, return \
                 {\"temperature\": \"15-25\", \"humidity\": \"60%\"}."
                    .to_string()
            }
            RequestIntent::Chat { .. } => {
                "You are Fellow Farmer, a helpful plant care assistant for the Technology \
                 Assisted Plant Emulator (TAPE). Provide concise, accurate advice about plant \
                 care, troubleshooting, and gardening tips. Format responses with markdown for \
                 bold (**), lists (-), and emphasis (*). Keep responses under 200 words unless \
                 detailed explanation is needed. If asked about non-plant topics, politely \
                 redirect to plant-related topics. Include practical examples where relevant. \
                 Always respond in a friendly, encouraging tone."
                    .to_string()
            }
        }
    }

    pub fn user_content(&self) -> UserContent {
        match self {
            RequestIntent::Simulation(form) => UserContent::Text(simulation_prompt(form)),
            RequestIntent::DiseaseAnalysis {
                image_data_url,
                plant_type,
                symptoms,
            } => {
                let subject = if plant_type.trim().is_empty() {
                    "plant".to_string()
                } else {
                    format!("{} plant", plant_type.trim())
                };
                let reported = if symptoms.trim().is_empty() {
                    "No additional symptoms reported.".to_string()
                } else {
                    format!("Reported symptoms: {}", symptoms.trim())
                };
                UserContent::Vision {
                    text: format!("Analyze this {subject} image. {reported}"),
                    image_data_url: image_data_url.clone(),
                }
            }
            RequestIntent::VarietyLookup { plant } => {
                UserContent::Text(format!("List varieties for: {}", plant.trim()))
            }
            RequestIntent::WeatherLookup { city, country } => UserContent::Text(format!(
                "Get weather data for {}, {}",
                city.trim(),
                country.trim()
            )),
            RequestIntent::Chat { message } => UserContent::Text(message.clone()),
        }
    }
}

fn simulation_prompt(form: &SimulationForm) -> String {
    let location = if form.city.trim().is_empty() {
        "not specified".to_string()
    } else {
        format!("{}, {}", form.city.trim(), form.country.trim())
    };
    let notes = if form.notes.trim().is_empty() {
        "None"
    } else {
        form.notes.trim()
    };
    let growth_stage = if form.growth_stage.trim().is_empty() {
        "not specified"
    } else {
        form.growth_stage.trim()
    };
    format!(
        "You are a plant growth simulation AI for the Technology Assisted Plant Emulator (TAPE). \
         Provide a detailed, scientifically accurate prediction with these requirements:

1. **Overview**: Begin with a 2-3 sentence summary including a specific survival percentage \
         (e.g., \"This tomato plant has a 75% survival probability under current conditions\").

2. **Growth Stages**: For each major stage (seedling, vegetative, flowering, fruiting), include:
   - Timeframe (e.g., \"Reaches vegetative stage in 4-6 weeks\")
   - Survival probability (e.g., \"60% survival to flowering stage\")
   - Expected size/characteristics
   - Include a JSON object at the end of this section: {{\"stages\": [\"Stage1\", \"Stage2\"], \
         \"durations\": [weeks1, weeks2], \"milestones\": [\"Milestone1\", \"Milestone2\"]}}.

3. **Environmental Analysis**: Assess each factor (temperature, humidity, soil, sunlight, \
         watering) with specific notes.

4. **Recommendations**: Provide 3-5 actionable recommendations, prefixed with \
         \"Recommendation:\".

5. **Risks**: Highlight any critical risks with \"Warning:\" prefix.

Format with clear headings (##) and bullet points (-). Include specific numbers and metrics \
         throughout.

**Current Conditions**:
- Plant: {plant} {variety}
- Environment: {placement}, {soil} soil
- Care: {watering} watering, {sunlight} light
- Climate: {temperature}\u{b0}C, {humidity}% humidity
- Stage: {growth_stage}
- Location: {location}
- Notes: {notes}

Provide response in 250-400 words.",
        plant = form.plant_type.trim(),
        variety = form.variety_or_standard(),
        placement = form.placement.trim(),
        soil = form.soil_type.trim(),
        watering = form.watering.trim(),
        sunlight = form.sunlight.trim(),
        temperature = form.temperature.trim(),
        humidity = form.humidity.trim().trim_end_matches('%'),
    )
}
